use async_trait::async_trait;
use ferrous_resolver_domain::{DomainError, DomainName, RecordType};

/// Validates a raw upstream reply against the configured trust anchors.
#[async_trait]
pub trait DnssecValidator: Send + Sync {
    async fn validate(
        &self,
        domain: &DomainName,
        record_type: RecordType,
        response: &[u8],
    ) -> Result<bool, DomainError>;
}
