pub mod tcp;
pub mod udp;

pub use tcp::TcpTransport;
pub use udp::UdpTransport;

use ferrous_resolver_application::ports::{DnsTransport, TransportEndpoint};
use ferrous_resolver_domain::{DomainError, TransportType};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Why [`exchange`] produced no reply.
#[derive(Debug)]
pub enum ExchangeError {
    TimedOut,
    Io(io::Error),
}

/// One request/response round-trip on a fresh endpoint.
///
/// `timeout` covers the whole exchange, opening the endpoint included. Only a
/// response (QR set) whose id matches `id` is returned; anything else is
/// dropped and waiting continues until the deadline. The endpoint is closed
/// exactly once whatever the outcome, also when this future is dropped.
pub async fn exchange(
    transport: &dyn DnsTransport,
    server: SocketAddr,
    query: &[u8],
    id: u16,
    timeout: Duration,
) -> Result<Vec<u8>, ExchangeError> {
    let deadline = Instant::now() + timeout;

    let mut endpoint = match tokio::time::timeout_at(deadline, transport.open(server)).await {
        Err(_) => return Err(ExchangeError::TimedOut),
        Ok(Err(e)) => return Err(ExchangeError::Io(e)),
        Ok(Ok(endpoint)) => OpenEndpoint(Some(endpoint)),
    };

    let outcome = tokio::time::timeout_at(deadline, async {
        endpoint.send(query).await?;
        loop {
            let reply = endpoint.recv().await?;
            if is_reply_to(&reply, id) {
                return Ok::<_, io::Error>(reply);
            }
            debug!(server = %server, expected_id = id, "Ignoring unmatched reply");
        }
    })
    .await;

    endpoint.close().await;

    match outcome {
        Err(_) => Err(ExchangeError::TimedOut),
        Ok(Err(e)) => Err(ExchangeError::Io(e)),
        Ok(Ok(reply)) => Ok(reply),
    }
}

/// An endpoint that still needs closing. Dropping it unclosed hands the
/// close to the runtime.
struct OpenEndpoint(Option<Box<dyn TransportEndpoint>>);

impl OpenEndpoint {
    fn get(&mut self) -> io::Result<&mut Box<dyn TransportEndpoint>> {
        self.0
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "endpoint closed"))
    }

    async fn send(&mut self, message: &[u8]) -> io::Result<()> {
        self.get()?.send(message).await
    }

    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        self.get()?.recv().await
    }

    async fn close(&mut self) {
        if let Some(mut endpoint) = self.0.take() {
            endpoint.close().await;
        }
    }
}

impl Drop for OpenEndpoint {
    fn drop(&mut self) {
        let Some(mut endpoint) = self.0.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { endpoint.close().await });
            }
            Err(_) => warn!("Endpoint dropped outside a runtime, close skipped"),
        }
    }
}

fn is_reply_to(message: &[u8], id: u16) -> bool {
    match message.get(0..3) {
        Some(head) => u16::from_be_bytes([head[0], head[1]]) == id && head[2] & 0x80 != 0,
        None => false,
    }
}

/// Built-in transport for `kind`. DoH has no built-in implementation and
/// must be supplied by the caller.
pub fn create_transport(kind: TransportType) -> Result<Arc<dyn DnsTransport>, DomainError> {
    match kind {
        TransportType::Udp => Ok(Arc::new(UdpTransport::new())),
        TransportType::Tcp => Ok(Arc::new(TcpTransport::new())),
        TransportType::Doh => Err(DomainError::ConfigError(
            "type = \"doh\" needs a DNS-over-HTTPS transport injected with `with_transport`"
                .into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_needs_matching_id_and_qr() {
        let mut reply = vec![0x12, 0x34, 0x81, 0x80];
        assert!(is_reply_to(&reply, 0x1234));
        assert!(!is_reply_to(&reply, 0x1235));

        reply[2] = 0x01;
        assert!(!is_reply_to(&reply, 0x1234));
        assert!(!is_reply_to(&[0x12, 0x34], 0x1234));
    }

    #[test]
    fn test_builtin_transports() {
        assert_eq!(create_transport(TransportType::Udp).unwrap().protocol_name(), "UDP");
        assert_eq!(create_transport(TransportType::Tcp).unwrap().protocol_name(), "TCP");
        assert!(matches!(
            create_transport(TransportType::Doh),
            Err(DomainError::ConfigError(_))
        ));
    }
}
