use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;

/// Factory for per-query endpoints.
///
/// The resolver opens exactly one endpoint per network attempt and closes it
/// exactly once, whatever the outcome.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn open(&self, server: SocketAddr) -> io::Result<Box<dyn TransportEndpoint>>;

    fn protocol_name(&self) -> &'static str;
}

/// One ephemeral conversation with an upstream server.
#[async_trait]
pub trait TransportEndpoint: Send {
    async fn send(&mut self, message: &[u8]) -> io::Result<()>;

    /// Waits for the next inbound message. Callers bound this with a timeout;
    /// messages that do not belong to the outstanding query are the caller's
    /// to discard.
    async fn recv(&mut self) -> io::Result<Vec<u8>>;

    async fn close(&mut self);
}
