use crate::dns::kernel::{Kernel, Plugin};
use crate::dns::wire::{append_edns, encode_query};
use async_trait::async_trait;
use dashmap::DashMap;
use ferrous_resolver_application::ports::ResolveOptions;
use ferrous_resolver_domain::{DomainError, DomainName, RecordType};
use std::sync::atomic::{AtomicU16, Ordering};
use tokio::time::Instant;
use tracing::debug;

pub const PLUGIN_NAME: &str = "query-builder";

const EDNS_UDP_PAYLOAD: u16 = 4096;

#[derive(Debug, Clone)]
pub struct PendingQuery {
    pub id: u16,
    pub domain: DomainName,
    pub record_type: RecordType,
    pub options: ResolveOptions,
    pub created_at: Instant,
}

#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub id: u16,
    pub bytes: Vec<u8>,
}

/// Allocates query ids and tracks queries that are waiting for a reply.
///
/// Ids come from a wrapping 16-bit counter owned by this instance, so two
/// resolvers never share an id space.
pub struct QueryBuilder {
    counter: AtomicU16,
    pending: DashMap<u16, PendingQuery>,
    recursion_desired: bool,
    dnssec_ok: bool,
}

impl QueryBuilder {
    pub fn new(dnssec_ok: bool) -> Self {
        Self {
            counter: AtomicU16::new(0),
            pending: DashMap::new(),
            recursion_desired: true,
            dnssec_ok,
        }
    }

    /// Next id: 1 after construction, then 2, ..., 65535, 0, 1, ...
    pub fn next_id(&self) -> u16 {
        self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    pub fn build(
        &self,
        domain: &DomainName,
        record_type: RecordType,
        options: ResolveOptions,
    ) -> Result<BuiltQuery, DomainError> {
        let mut bytes = encode_query(0, domain.as_str(), record_type, self.recursion_desired)?;
        if self.dnssec_ok {
            append_edns(&mut bytes, EDNS_UDP_PAYLOAD, true)?;
        }

        let id = self.next_id();
        bytes[0..2].copy_from_slice(&id.to_be_bytes());

        let pending = PendingQuery {
            id,
            domain: domain.clone(),
            record_type,
            options,
            created_at: Instant::now(),
        };
        if let Some(stale) = self.pending.insert(id, pending) {
            debug!(
                id,
                stale_domain = %stale.domain,
                "Query id reused while still pending; dropping stale entry"
            );
        }

        Ok(BuiltQuery { id, bytes })
    }

    /// Forgets `id`. Calling it for an unknown id is a no-op.
    pub fn remove(&self, id: u16) {
        self.pending.remove(&id);
    }

    /// Ties the pending entry for `id` to a scope: it is removed when the
    /// guard drops, including when the awaiting future is cancelled.
    pub fn guard(&self, id: u16) -> PendingGuard<'_> {
        PendingGuard { builder: self, id }
    }

    pub fn pending(&self, id: u16) -> Option<PendingQuery> {
        self.pending.get(&id).map(|p| p.clone())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

pub struct PendingGuard<'a> {
    builder: &'a QueryBuilder,
    id: u16,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.builder.remove(self.id);
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl Plugin for QueryBuilder {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }

    async fn destroy(&self, _kernel: &Kernel) -> Result<(), DomainError> {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            debug!(dropped, "Dropped pending queries on teardown");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::wire::decode_message;

    fn name(s: &str) -> DomainName {
        DomainName::parse(s).unwrap()
    }

    #[test]
    fn test_build_registers_pending_entry() {
        let builder = QueryBuilder::default();
        let query = builder
            .build(&name("example.com"), RecordType::MX, ResolveOptions::default())
            .unwrap();

        assert_eq!(query.id, 1);
        let pending = builder.pending(query.id).unwrap();
        assert_eq!(pending.domain.as_str(), "example.com");
        assert_eq!(pending.record_type, RecordType::MX);

        let msg = decode_message(&query.bytes).unwrap();
        assert_eq!(msg.id, 1);
        assert!(msg.flags.rd);
        assert_eq!(msg.questions[0].record_type(), Some(RecordType::MX));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let builder = QueryBuilder::default();
        let query = builder
            .build(&name("example.com"), RecordType::A, ResolveOptions::default())
            .unwrap();

        builder.remove(query.id);
        builder.remove(query.id);
        assert_eq!(builder.pending_count(), 0);
    }

    #[test]
    fn test_guard_removes_entry_on_drop() {
        let builder = QueryBuilder::default();
        let query = builder
            .build(&name("example.com"), RecordType::A, ResolveOptions::default())
            .unwrap();

        {
            let _pending = builder.guard(query.id);
            assert!(builder.pending(query.id).is_some());
        }
        assert!(builder.pending(query.id).is_none());
    }

    #[test]
    fn test_dnssec_adds_opt_record() {
        let builder = QueryBuilder::new(true);
        let query = builder
            .build(&name("example.com"), RecordType::A, ResolveOptions::default())
            .unwrap();

        let msg = decode_message(&query.bytes).unwrap();
        assert_eq!(msg.additionals.len(), 1);
        assert_eq!(msg.additionals[0].ttl & 0x8000, 0x8000);
    }

    #[test]
    fn test_reused_id_replaces_pending_entry() {
        let builder = QueryBuilder::default();
        let first = builder
            .build(&name("first.example"), RecordType::A, ResolveOptions::default())
            .unwrap();
        for _ in 0..u16::MAX {
            builder.next_id();
        }
        let second = builder
            .build(&name("second.example"), RecordType::A, ResolveOptions::default())
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(builder.pending_count(), 1);
        assert_eq!(
            builder.pending(second.id).unwrap().domain.as_str(),
            "second.example"
        );
    }
}
