//! UDP Transport for DNS queries (RFC 1035 §4.2.1)
//!
//! Messages are sent as-is (no framing). Each endpoint owns one ephemeral
//! socket connected to the upstream, so datagrams from other sources are
//! filtered by the kernel. A reply with the TC bit set should be retried over
//! TCP by the caller.

use async_trait::async_trait;
use ferrous_resolver_application::ports::{DnsTransport, TransportEndpoint};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransport;

impl UdpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn open(&self, server: SocketAddr) -> io::Result<Box<dyn TransportEndpoint>> {
        // Bind to ephemeral port (0 = OS assigns)
        let bind_addr: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server).await?;

        Ok(Box::new(UdpEndpoint {
            socket: Some(socket),
            server,
        }))
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}

struct UdpEndpoint {
    socket: Option<UdpSocket>,
    server: SocketAddr,
}

impl UdpEndpoint {
    fn socket(&self) -> io::Result<&UdpSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "UDP endpoint closed"))
    }
}

#[async_trait]
impl TransportEndpoint for UdpEndpoint {
    async fn send(&mut self, message: &[u8]) -> io::Result<()> {
        let bytes_sent = self.socket()?.send(message).await?;
        debug!(server = %self.server, bytes_sent, "UDP query sent");
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let bytes_received = self.socket()?.recv(&mut recv_buf).await?;
        recv_buf.truncate(bytes_received);
        debug!(server = %self.server, bytes_received, "UDP response received");
        Ok(recv_buf)
    }

    async fn close(&mut self) {
        self.socket.take();
    }
}
