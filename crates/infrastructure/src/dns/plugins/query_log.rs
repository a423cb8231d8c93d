use crate::dns::kernel::{EventKind, EventListener, Kernel, Plugin, ResolverEvent};
use async_trait::async_trait;
use ferrous_resolver_domain::DomainError;
use std::sync::Arc;
use tracing::debug;

pub const PLUGIN_NAME: &str = "query-log";

/// Logs every resolver event at debug level.
#[derive(Debug, Default)]
pub struct QueryLogPlugin;

impl QueryLogPlugin {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for QueryLogPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }

    fn install(&self, kernel: &Kernel) -> Result<(), DomainError> {
        let listener: Arc<dyn EventListener> = Arc::new(QueryLogListener);
        for kind in EventKind::ALL {
            kernel.on(kind, Arc::clone(&listener));
        }
        Ok(())
    }
}

struct QueryLogListener;

#[async_trait]
impl EventListener for QueryLogListener {
    async fn on_event(&self, event: &ResolverEvent) -> Result<(), DomainError> {
        match event {
            ResolverEvent::QueryStarted {
                domain,
                record_type,
            } => debug!(domain = %domain, record_type = %record_type, "Query started"),
            ResolverEvent::CacheHit {
                domain,
                record_type,
            } => debug!(domain = %domain, record_type = %record_type, "Cache hit"),
            ResolverEvent::CacheMiss {
                domain,
                record_type,
            } => debug!(domain = %domain, record_type = %record_type, "Cache miss"),
            ResolverEvent::QuerySucceeded {
                domain,
                record_type,
                server,
                answers,
                duration,
            } => debug!(
                domain = %domain,
                record_type = %record_type,
                server = %server,
                answers,
                latency_ms = duration.as_millis() as u64,
                "Query succeeded"
            ),
            ResolverEvent::QueryFailed {
                domain,
                record_type,
                error,
            } => debug!(
                domain = %domain,
                record_type = %record_type,
                code = error.code(),
                error = %error,
                "Query failed"
            ),
            ResolverEvent::RetryScheduled {
                domain,
                record_type,
                attempt,
                delay,
            } => debug!(
                domain = %domain,
                record_type = %record_type,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retry scheduled"
            ),
            ResolverEvent::ServerMarkedFailed { server } => {
                debug!(server = %server, "Server marked failed")
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_install_subscribes_to_every_event() {
        let kernel = Kernel::new();
        kernel.register(Arc::new(QueryLogPlugin::new())).unwrap();
        kernel.init().await.unwrap();

        for kind in EventKind::ALL {
            assert_eq!(kernel.listener_count(kind), 1, "{}", kind.as_str());
        }
    }
}
