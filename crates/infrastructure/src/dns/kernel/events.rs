use async_trait::async_trait;
use ferrous_resolver_domain::{DomainError, RecordType};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    QueryStarted,
    CacheHit,
    CacheMiss,
    QuerySucceeded,
    QueryFailed,
    RetryScheduled,
    ServerMarkedFailed,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::QueryStarted,
        EventKind::CacheHit,
        EventKind::CacheMiss,
        EventKind::QuerySucceeded,
        EventKind::QueryFailed,
        EventKind::RetryScheduled,
        EventKind::ServerMarkedFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::QueryStarted => "query_started",
            EventKind::CacheHit => "cache_hit",
            EventKind::CacheMiss => "cache_miss",
            EventKind::QuerySucceeded => "query_succeeded",
            EventKind::QueryFailed => "query_failed",
            EventKind::RetryScheduled => "retry_scheduled",
            EventKind::ServerMarkedFailed => "server_marked_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResolverEvent {
    QueryStarted {
        domain: String,
        record_type: RecordType,
    },
    CacheHit {
        domain: String,
        record_type: RecordType,
    },
    CacheMiss {
        domain: String,
        record_type: RecordType,
    },
    QuerySucceeded {
        domain: String,
        record_type: RecordType,
        server: SocketAddr,
        answers: usize,
        duration: Duration,
    },
    QueryFailed {
        domain: String,
        record_type: RecordType,
        error: DomainError,
    },
    RetryScheduled {
        domain: String,
        record_type: RecordType,
        attempt: u32,
        delay: Duration,
    },
    ServerMarkedFailed {
        server: SocketAddr,
    },
}

impl ResolverEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ResolverEvent::QueryStarted { .. } => EventKind::QueryStarted,
            ResolverEvent::CacheHit { .. } => EventKind::CacheHit,
            ResolverEvent::CacheMiss { .. } => EventKind::CacheMiss,
            ResolverEvent::QuerySucceeded { .. } => EventKind::QuerySucceeded,
            ResolverEvent::QueryFailed { .. } => EventKind::QueryFailed,
            ResolverEvent::RetryScheduled { .. } => EventKind::RetryScheduled,
            ResolverEvent::ServerMarkedFailed { .. } => EventKind::ServerMarkedFailed,
        }
    }
}

/// Receives events from the kernel bus.
///
/// Listeners run one at a time on the task that emitted the event, so a slow
/// listener delays the query that triggered it. Errors are logged by the
/// kernel and never reach the caller.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &ResolverEvent) -> Result<(), DomainError>;
}

#[async_trait]
impl<F> EventListener for F
where
    F: Fn(&ResolverEvent) -> Result<(), DomainError> + Send + Sync,
{
    async fn on_event(&self, event: &ResolverEvent) -> Result<(), DomainError> {
        self(event)
    }
}
