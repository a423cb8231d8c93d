use async_trait::async_trait;
use ferrous_resolver_domain::{DomainError, RecordData, RecordType};
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub records: Vec<RecordData>,
    /// Minimum answer TTL, or the remaining lifetime when served from cache.
    pub ttl: u32,
    pub cached: bool,
    pub duration: Duration,
    /// Upstream that answered, or `"cache"`.
    pub resolver: String,
    pub dnssec_valid: Option<bool>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Text form of every record, e.g. `["93.184.216.34"]` for an A lookup.
    pub fn record_strings(&self) -> Vec<String> {
        self.records.iter().map(|r| r.to_string()).collect()
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Skip the cache read; the answer is still written back.
    pub no_cache: bool,
    pub timeout_ms: Option<u64>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResolverStats {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    pub average_duration_ms: f64,
}

impl ResolverStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }
        self.successful_queries as f64 / self.total_queries as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    /// Fraction of lookups served from cache, in `[0.0, 1.0]`.
    pub hit_rate: f64,
}

#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(
        &self,
        domain: &str,
        record_type: RecordType,
        options: ResolveOptions,
    ) -> Result<Resolution, DomainError>;

    /// PTR lookup in the `in-addr.arpa` / `ip6.arpa` zone for `ip`.
    async fn reverse(&self, ip: IpAddr) -> Result<Resolution, DomainError>;

    fn stats(&self) -> ResolverStats;

    fn cache_stats(&self) -> CacheStats;

    fn clear_cache(&self, domain: Option<&str>, record_type: Option<RecordType>);
}
