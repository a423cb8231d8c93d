use super::resolver_chain::{self, ResolverChain};
use crate::dns::kernel::{Kernel, Plugin};
use crate::dns::transport::{exchange, ExchangeError};
use crate::dns::wire::{decode_message, encode_query};
use async_trait::async_trait;
use ferrous_resolver_application::ports::DnsTransport;
use ferrous_resolver_domain::{DomainError, RecordType};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub const PLUGIN_NAME: &str = "health-check";

/// Periodically probes servers the chain has marked failed and brings them
/// back once they answer.
pub struct HealthCheckPlugin {
    transport: Arc<dyn DnsTransport>,
    interval: Duration,
    timeout: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthCheckPlugin {
    pub fn new(transport: Arc<dyn DnsTransport>, interval: Duration, timeout: Duration) -> Self {
        Self {
            transport,
            interval,
            timeout,
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

/// Sends a root `NS` query and reports whether a well-formed, non-error reply
/// came back.
pub async fn probe(transport: &dyn DnsTransport, server: SocketAddr, timeout: Duration) -> bool {
    let id = fastrand::u16(..);
    let query = match encode_query(id, "", RecordType::NS, true) {
        Ok(q) => q,
        Err(_) => return false,
    };

    let start = Instant::now();
    match exchange(transport, server, &query, id, timeout).await {
        Ok(reply) => match decode_message(&reply) {
            Ok(msg) if !msg.rcode().is_server_error() => {
                debug!(
                    server = %server,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Health check: OK"
                );
                true
            }
            Ok(msg) => {
                debug!(server = %server, rcode = %msg.rcode(), "Health check: server error");
                false
            }
            Err(e) => {
                debug!(server = %server, error = %e, "Health check: malformed reply");
                false
            }
        },
        Err(ExchangeError::TimedOut) => {
            debug!(server = %server, "Health check: TIMEOUT");
            false
        }
        Err(ExchangeError::Io(e)) => {
            debug!(server = %server, error = %e, "Health check: FAILED");
            false
        }
    }
}

async fn check_failed(chain: &ResolverChain, transport: &dyn DnsTransport, timeout: Duration) {
    for server in chain.failed_servers() {
        if probe(transport, server, timeout).await {
            chain.mark_succeeded(server);
        }
    }
}

#[async_trait]
impl Plugin for HealthCheckPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }

    fn dependencies(&self) -> &[&'static str] {
        &[resolver_chain::PLUGIN_NAME]
    }

    async fn init(&self, kernel: &Kernel) -> Result<(), DomainError> {
        let chain = kernel.state::<ResolverChain>().ok_or_else(|| {
            DomainError::PluginError("health-check requires the resolver chain state".into())
        })?;
        let transport = Arc::clone(&self.transport);
        let period = self.interval;
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; nothing has failed yet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                check_failed(&chain, transport.as_ref(), timeout).await;
            }
        });

        info!(
            interval_ms = period.as_millis() as u64,
            "Health checker running"
        );
        if let Some(previous) = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle)
        {
            previous.abort();
        }
        Ok(())
    }

    async fn destroy(&self, _kernel: &Kernel) -> Result<(), DomainError> {
        if let Some(handle) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
            debug!("Health checker stopped");
        }
        Ok(())
    }
}
