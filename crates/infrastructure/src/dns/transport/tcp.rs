//! TCP Transport for DNS queries (RFC 1035 §4.2.2)
//!
//! Every message is preceded by a two-byte big-endian length.

use async_trait::async_trait;
use ferrous_resolver_application::ports::{DnsTransport, TransportEndpoint};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn open(&self, server: SocketAddr) -> io::Result<Box<dyn TransportEndpoint>> {
        let stream = TcpStream::connect(server).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpEndpoint {
            stream: Some(stream),
            server,
        }))
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}

struct TcpEndpoint {
    stream: Option<TcpStream>,
    server: SocketAddr,
}

impl TcpEndpoint {
    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "TCP endpoint closed"))
    }
}

#[async_trait]
impl TransportEndpoint for TcpEndpoint {
    async fn send(&mut self, message: &[u8]) -> io::Result<()> {
        let server = self.server;
        send_with_length_prefix(self.stream()?, message).await?;
        debug!(server = %server, message_len = message.len(), "TCP query sent");
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        let server = self.server;
        let response = read_with_length_prefix(self.stream()?).await?;
        debug!(server = %server, response_len = response.len(), "TCP response received");
        Ok(response)
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }
}

pub(crate) async fn send_with_length_prefix<S>(stream: &mut S, message: &[u8]) -> io::Result<()>
where
    S: AsyncWriteExt + Unpin,
{
    let length = u16::try_from(message.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("DNS message of {} bytes exceeds TCP framing limit", message.len()),
        )
    })?;

    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(message).await?;
    stream.flush().await
}

pub(crate) async fn read_with_length_prefix<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let response_len = u16::from_be_bytes(len_buf) as usize;

    let mut response = vec![0u8; response_len];
    stream.read_exact(&mut response).await?;
    Ok(response)
}
