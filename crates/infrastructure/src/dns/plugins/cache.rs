use crate::dns::kernel::{Kernel, Plugin};
use async_trait::async_trait;
use compact_str::{format_compact, CompactString};
use dashmap::DashMap;
use ferrous_resolver_application::ports::CacheStats;
use ferrous_resolver_domain::{CacheConfig, DomainError, DomainName, RecordData, RecordType};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const PLUGIN_NAME: &str = "cache";

/// `normalized-domain:TYPE`, e.g. `example.com:A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(CompactString);

impl CacheKey {
    pub fn new(domain: &DomainName, record_type: RecordType) -> Self {
        Self::from_parts(domain.as_str(), record_type)
    }

    fn from_parts(domain: &str, record_type: RecordType) -> Self {
        Self(format_compact!(
            "{}:{}",
            normalize(domain),
            record_type.as_str()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(domain: &str) -> String {
    let trimmed = domain.trim();
    trimmed
        .strip_suffix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    domain: CompactString,
    record_type: RecordType,
    records: Arc<Vec<RecordData>>,
    ttl: u32,
    created_at: Instant,
    expires_at: Instant,
    seq: u64,
}

/// A live entry returned by [`ResponseCache::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAnswer {
    pub records: Arc<Vec<RecordData>>,
    pub ttl: u32,
    /// Seconds until expiry, rounded up.
    pub remaining_ttl: u32,
}

/// Size-bounded TTL cache. Expired entries are dropped lazily on lookup; when
/// full, the oldest-inserted entry is evicted.
pub struct ResponseCache {
    config: CacheConfig,
    entries: DashMap<CacheKey, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    seq: AtomicU64,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::with_capacity(config.max_size.min(4096)),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            seq: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedAnswer> {
        let now = Instant::now();

        // Copy what we need and release the shard guard before removing.
        let found = self.entries.get(key).map(|e| {
            (
                e.expires_at,
                CachedAnswer {
                    records: Arc::clone(&e.records),
                    ttl: e.ttl,
                    remaining_ttl: ceil_secs(e.expires_at.saturating_duration_since(now)),
                },
            )
        });

        match found {
            Some((expires_at, answer)) if now <= expires_at => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(answer)
            }
            Some(_) => {
                self.entries.remove_if(key, |_, e| now > e.expires_at);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache entry expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `records` for `ttl` seconds (after `respect_ttl` and clamping).
    /// Returns the TTL actually applied, or `None` when nothing was stored.
    pub fn set(
        &self,
        domain: &DomainName,
        record_type: RecordType,
        records: Vec<RecordData>,
        ttl: u32,
    ) -> Option<u32> {
        if !self.config.enabled {
            return None;
        }

        let ttl = if self.config.respect_ttl {
            ttl
        } else {
            self.config.default_ttl
        };
        let ttl = self.config.clamp_ttl(ttl);
        if ttl == 0 {
            return None;
        }

        let now = Instant::now();
        let key = CacheKey::new(domain, record_type);
        let entry = CacheEntry {
            domain: CompactString::from(normalize(domain.as_str())),
            record_type,
            records: Arc::new(records),
            ttl,
            created_at: now,
            expires_at: now + Duration::from_secs(ttl as u64),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        self.entries.insert(key, entry);

        while self.entries.len() > self.config.max_size {
            if !self.evict_oldest() {
                break;
            }
        }
        Some(ttl)
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| (e.created_at, e.seq))
            .map(|e| e.key().clone());

        match oldest {
            Some(key) => {
                self.entries.remove(&key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache entry evicted");
                true
            }
            None => false,
        }
    }

    /// Removes entries matching the filters; no filters clears everything.
    pub fn clear(&self, domain: Option<&str>, record_type: Option<RecordType>) {
        match (domain, record_type) {
            (None, None) => self.entries.clear(),
            (domain, record_type) => {
                let domain = domain.map(normalize);
                self.entries.retain(|_, e| {
                    let domain_matches = domain.as_deref().map_or(true, |d| e.domain.as_str() == d);
                    let type_matches = record_type.map_or(true, |t| e.record_type == t);
                    !(domain_matches && type_matches)
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            size: self.entries.len(),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

fn ceil_secs(d: Duration) -> u32 {
    let millis = d.as_millis();
    u32::try_from(millis.div_ceil(1000)).unwrap_or(u32::MAX)
}

#[async_trait]
impl Plugin for ResponseCache {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }

    async fn destroy(&self, _kernel: &Kernel) -> Result<(), DomainError> {
        self.entries.clear();
        Ok(())
    }
}
