use super::reverse::reverse_name;
use super::stats::QueryCounters;
use crate::dns::kernel::{Kernel, ResolverEvent};
use crate::dns::plugins::{
    BuiltQuery, CacheKey, QueryBuilder, ResolverChain, ResponseCache, RetryAttempt, RetryPolicy,
};
use crate::dns::transport::{exchange, ExchangeError};
use crate::dns::wire::{decode_message, parse_rdata, Message};
use async_trait::async_trait;
use ferrous_resolver_application::ports::{
    CacheStats, DnsResolver, DnsTransport, DnssecValidator, Resolution, ResolveOptions,
    ResolverStats,
};
use ferrous_resolver_domain::{
    DnssecConfig, DomainError, DomainName, Rcode, RecordData, RecordType,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of one successful network attempt.
struct Answer {
    records: Vec<RecordData>,
    /// Minimum answer TTL, or the negative-caching TTL for an empty answer.
    /// `None` when the reply carries no usable TTL.
    ttl: Option<u32>,
    server: SocketAddr,
    dnssec_valid: Option<bool>,
}

/// The resolution engine.
///
/// Each call to [`Resolver::resolve`] runs validate, cache lookup, query
/// build, server selection and one timed round-trip per attempt, retrying
/// transport failures under the configured budget.
pub struct Resolver {
    pub(super) kernel: Arc<Kernel>,
    pub(super) query_builder: Arc<QueryBuilder>,
    pub(super) chain: Arc<ResolverChain>,
    pub(super) cache: Arc<ResponseCache>,
    pub(super) retry: Arc<RetryPolicy>,
    pub(super) transport: Arc<dyn DnsTransport>,
    pub(super) tcp_fallback: Option<Arc<dyn DnsTransport>>,
    pub(super) validator: Option<Arc<dyn DnssecValidator>>,
    pub(super) dnssec: DnssecConfig,
    pub(super) timeout: Duration,
    pub(super) counters: QueryCounters,
    pub(super) destroyed: AtomicBool,
}

impl Resolver {
    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    pub fn chain(&self) -> &Arc<ResolverChain> {
        &self.chain
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn query_builder(&self) -> &Arc<QueryBuilder> {
        &self.query_builder
    }

    pub fn protocol_name(&self) -> &'static str {
        self.transport.protocol_name()
    }

    pub async fn resolve(
        &self,
        domain: &str,
        record_type: RecordType,
        options: ResolveOptions,
    ) -> Result<Resolution, DomainError> {
        let start = Instant::now();
        let result = self.resolve_inner(domain, record_type, options, start).await;
        self.counters.record(result.is_ok(), start.elapsed());

        if let Err(e) = &result {
            debug!(domain = %domain, record_type = %record_type, error = %e, "Resolution failed");
            self.kernel
                .emit(ResolverEvent::QueryFailed {
                    domain: domain.to_string(),
                    record_type,
                    error: e.clone(),
                })
                .await;
        }
        result
    }

    /// Like [`Resolver::resolve`], with the record type given by name
    /// (`"mx"`, `"AAAA"`, ...).
    pub async fn resolve_str(
        &self,
        domain: &str,
        record_type: &str,
    ) -> Result<Resolution, DomainError> {
        let record_type = record_type
            .parse::<RecordType>()
            .map_err(DomainError::InvalidQuery)?;
        self.resolve(domain, record_type, ResolveOptions::default())
            .await
    }

    pub async fn reverse(&self, ip: IpAddr) -> Result<Resolution, DomainError> {
        self.resolve(&reverse_name(ip), RecordType::PTR, ResolveOptions::default())
            .await
    }

    pub fn stats(&self) -> ResolverStats {
        self.counters.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self, domain: Option<&str>, record_type: Option<RecordType>) {
        self.cache.clear(domain, record_type);
    }

    /// Tears down every plugin. Later calls are no-ops and later queries
    /// fail.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.kernel.destroy().await;
        info!("Resolver destroyed");
    }

    async fn resolve_inner(
        &self,
        domain: &str,
        record_type: RecordType,
        options: ResolveOptions,
        start: Instant,
    ) -> Result<Resolution, DomainError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(DomainError::PluginError("resolver has been destroyed".into()));
        }

        let name = DomainName::parse(domain)?;
        self.kernel
            .emit(ResolverEvent::QueryStarted {
                domain: name.to_string(),
                record_type,
            })
            .await;

        if self.cache.is_enabled() && !options.no_cache {
            let key = CacheKey::new(&name, record_type);
            if let Some(hit) = self.cache.get(&key) {
                self.kernel
                    .emit(ResolverEvent::CacheHit {
                        domain: name.to_string(),
                        record_type,
                    })
                    .await;
                return Ok(Resolution {
                    records: hit.records.as_ref().clone(),
                    ttl: hit.remaining_ttl,
                    cached: true,
                    duration: start.elapsed(),
                    resolver: "cache".to_string(),
                    dnssec_valid: None,
                });
            }
            self.kernel
                .emit(ResolverEvent::CacheMiss {
                    domain: name.to_string(),
                    record_type,
                })
                .await;
        }

        let timeout = options
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.timeout);

        let this = self;
        let name_ref = &name;
        let answer = self
            .retry
            .execute(
                move |_| this.attempt(name_ref, record_type, options, timeout),
                move |retry: RetryAttempt| async move {
                    this.kernel
                        .emit(ResolverEvent::RetryScheduled {
                            domain: name_ref.to_string(),
                            record_type,
                            attempt: retry.attempt,
                            delay: retry.delay,
                        })
                        .await;
                },
            )
            .await?;

        if let Some(ttl) = answer.ttl {
            self.cache
                .set(&name, record_type, answer.records.clone(), ttl);
        }

        let duration = start.elapsed();
        self.kernel
            .emit(ResolverEvent::QuerySucceeded {
                domain: name.to_string(),
                record_type,
                server: answer.server,
                answers: answer.records.len(),
                duration,
            })
            .await;

        Ok(Resolution {
            ttl: answer.ttl.unwrap_or(0),
            records: answer.records,
            cached: false,
            duration,
            resolver: answer.server.to_string(),
            dnssec_valid: answer.dnssec_valid,
        })
    }

    /// One network attempt. The pending entry is removed whatever happens,
    /// cancellation included.
    async fn attempt(
        &self,
        name: &DomainName,
        record_type: RecordType,
        options: ResolveOptions,
        timeout: Duration,
    ) -> Result<Answer, DomainError> {
        let query = self.query_builder.build(name, record_type, options)?;
        let _pending = self.query_builder.guard(query.id);
        let server = self.chain.get_next();
        self.round_trip(name, record_type, server, &query, timeout)
            .await
    }

    async fn round_trip(
        &self,
        name: &DomainName,
        record_type: RecordType,
        server: SocketAddr,
        query: &BuiltQuery,
        timeout: Duration,
    ) -> Result<Answer, DomainError> {
        let mut reply = self
            .exchange_with(self.transport.as_ref(), name, record_type, server, query, timeout)
            .await?;
        let mut message = decode_message(&reply)?;

        if message.is_truncated() {
            if let Some(tcp) = &self.tcp_fallback {
                debug!(domain = %name, server = %server, "Truncated reply, retrying over TCP");
                reply = self
                    .exchange_with(tcp.as_ref(), name, record_type, server, query, timeout)
                    .await?;
                message = decode_message(&reply)?;
            }
        }

        match message.rcode() {
            Rcode::NoError => {}
            Rcode::NxDomain => {
                self.chain.mark_succeeded(server);
                return Err(DomainError::NxDomain {
                    domain: name.to_string(),
                    record_type,
                });
            }
            rcode => {
                return Err(DomainError::ServFail {
                    domain: name.to_string(),
                    record_type,
                    server: server.to_string(),
                    rcode: rcode.as_str(),
                });
            }
        }

        let records = message
            .answers_of(record_type)
            .map(|rr| parse_rdata(&reply, rr))
            .collect::<Result<Vec<_>, _>>()?;

        let ttl = if records.is_empty() {
            negative_ttl(&reply, &message)
        } else {
            message.answers_of(record_type).map(|rr| rr.ttl).min()
        };

        self.chain.mark_succeeded(server);

        let dnssec_valid = self.check_dnssec(name, record_type, &reply).await?;

        debug!(
            domain = %name,
            record_type = %record_type,
            server = %server,
            answers = records.len(),
            "Upstream answered"
        );

        Ok(Answer {
            records,
            ttl,
            server,
            dnssec_valid,
        })
    }

    async fn exchange_with(
        &self,
        transport: &dyn DnsTransport,
        name: &DomainName,
        record_type: RecordType,
        server: SocketAddr,
        query: &BuiltQuery,
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        match exchange(transport, server, &query.bytes, query.id, timeout).await {
            Ok(reply) => Ok(reply),
            Err(ExchangeError::TimedOut) => {
                warn!(
                    domain = %name,
                    server = %server,
                    timeout_ms = timeout.as_millis() as u64,
                    "Upstream query timed out"
                );
                self.mark_failed(server).await;
                Err(DomainError::Timeout {
                    domain: name.to_string(),
                    record_type,
                    server: server.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Err(ExchangeError::Io(e)) => {
                warn!(domain = %name, server = %server, error = %e, "Upstream socket error");
                self.mark_failed(server).await;
                Err(DomainError::network(
                    name.to_string(),
                    record_type,
                    server.to_string(),
                    e,
                ))
            }
        }
    }

    async fn mark_failed(&self, server: SocketAddr) {
        if self.chain.mark_failed(server) {
            self.kernel
                .emit(ResolverEvent::ServerMarkedFailed { server })
                .await;
        }
    }

    async fn check_dnssec(
        &self,
        name: &DomainName,
        record_type: RecordType,
        reply: &[u8],
    ) -> Result<Option<bool>, DomainError> {
        if !self.dnssec.enabled {
            return Ok(None);
        }
        let Some(validator) = &self.validator else {
            return Ok(None);
        };

        let valid = validator.validate(name, record_type, reply).await?;
        if !valid && self.dnssec.require_valid {
            return Err(DomainError::DnssecInvalid {
                domain: name.to_string(),
                record_type,
            });
        }
        Ok(Some(valid))
    }
}

/// RFC 2308 §5: the lesser of the SOA record's own TTL and its MINIMUM field.
fn negative_ttl(reply: &[u8], message: &Message) -> Option<u32> {
    message
        .authorities
        .iter()
        .filter(|rr| rr.record_type() == Some(RecordType::SOA))
        .find_map(|rr| match parse_rdata(reply, rr) {
            Ok(RecordData::SOA(soa)) => Some(rr.ttl.min(soa.minttl)),
            _ => None,
        })
}

#[async_trait]
impl DnsResolver for Resolver {
    async fn resolve(
        &self,
        domain: &str,
        record_type: RecordType,
        options: ResolveOptions,
    ) -> Result<Resolution, DomainError> {
        Resolver::resolve(self, domain, record_type, options).await
    }

    async fn reverse(&self, ip: IpAddr) -> Result<Resolution, DomainError> {
        Resolver::reverse(self, ip).await
    }

    fn stats(&self) -> ResolverStats {
        Resolver::stats(self)
    }

    fn cache_stats(&self) -> CacheStats {
        Resolver::cache_stats(self)
    }

    fn clear_cache(&self, domain: Option<&str>, record_type: Option<RecordType>) {
        Resolver::clear_cache(self, domain, record_type)
    }
}
