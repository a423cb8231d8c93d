use async_trait::async_trait;
use ferrous_resolver_application::ports::{DnsTransport, TransportEndpoint};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Produces the reply for one query sent to `server`. `None` keeps the
/// endpoint silent.
pub type Responder = dyn Fn(SocketAddr, &[u8]) -> Option<Vec<u8>> + Send + Sync;

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    closes: AtomicUsize,
    sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
}

/// In-memory transport driven by a responder closure.
pub struct FakeTransport {
    name: &'static str,
    responder: Arc<Responder>,
    refused: HashSet<SocketAddr>,
    open_delay: Duration,
    counters: Arc<Counters>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(SocketAddr, &[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            name: "FAKE",
            responder: Arc::new(responder),
            refused: HashSet::new(),
            open_delay: Duration::ZERO,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Never answers.
    pub fn silent() -> Self {
        Self::new(|_, _| None)
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// `open` to `server` fails with `ConnectionRefused`.
    pub fn refusing(mut self, server: SocketAddr) -> Self {
        self.refused.insert(server);
        self
    }

    /// `open` takes `delay` before handing out the endpoint.
    pub fn slow_open(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Every query written so far, with the server it went to.
    pub fn sent(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.counters
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn servers_queried(&self) -> Vec<SocketAddr> {
        self.sent().into_iter().map(|(server, _)| server).collect()
    }
}

#[async_trait]
impl DnsTransport for FakeTransport {
    async fn open(&self, server: SocketAddr) -> io::Result<Box<dyn TransportEndpoint>> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        if self.refused.contains(&server) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{} refused", server),
            ));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeEndpoint {
            server,
            responder: Arc::clone(&self.responder),
            counters: Arc::clone(&self.counters),
            inbox: VecDeque::new(),
        }))
    }

    fn protocol_name(&self) -> &'static str {
        self.name
    }
}

struct FakeEndpoint {
    server: SocketAddr,
    responder: Arc<Responder>,
    counters: Arc<Counters>,
    inbox: VecDeque<Vec<u8>>,
}

#[async_trait]
impl TransportEndpoint for FakeEndpoint {
    async fn send(&mut self, message: &[u8]) -> io::Result<()> {
        self.counters
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((self.server, message.to_vec()));
        if let Some(reply) = (self.responder)(self.server, message) {
            self.inbox.push_back(reply);
        }
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        match self.inbox.pop_front() {
            Some(reply) => Ok(reply),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}
