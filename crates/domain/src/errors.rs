use crate::config::ConfigError;
use crate::dns_record::RecordType;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Query timeout after {timeout_ms}ms for {domain} {record_type} via {server}")]
    Timeout {
        domain: String,
        record_type: RecordType,
        server: String,
        timeout_ms: u64,
    },

    #[error("Network error querying {domain} {record_type} via {server}: {source}")]
    NetworkError {
        domain: String,
        record_type: RecordType,
        server: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Domain not found (NXDOMAIN): {domain} {record_type}")]
    NxDomain {
        domain: String,
        record_type: RecordType,
    },

    #[error("Server failure ({rcode}) for {domain} {record_type} via {server}")]
    ServFail {
        domain: String,
        record_type: RecordType,
        server: String,
        rcode: &'static str,
    },

    #[error("Malformed DNS message: {0}")]
    MalformedMessage(String),

    #[error("DNS encoding error: {0}")]
    EncodingError(String),

    #[error("DNSSEC validation failed for {domain} {record_type}")]
    DnssecInvalid {
        domain: String,
        record_type: RecordType,
    },

    #[error("Plugin error: {0}")]
    PluginError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DomainError {
    pub fn network(
        domain: impl Into<String>,
        record_type: RecordType,
        server: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::NetworkError {
            domain: domain.into(),
            record_type,
            server: server.into(),
            source: Arc::new(source),
        }
    }

    /// Timeouts and transport failures may succeed against another server;
    /// everything else is an input, codec or server verdict and is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NetworkError { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::Timeout { .. } => "TIMEOUT",
            Self::NetworkError { .. } => "NETWORK_ERROR",
            Self::NxDomain { .. } => "NXDOMAIN",
            Self::ServFail { .. } => "SERVFAIL",
            Self::MalformedMessage(_) => "MALFORMED_MESSAGE",
            Self::EncodingError(_) => "ENCODING_ERROR",
            Self::DnssecInvalid { .. } => "DNSSEC_INVALID",
            Self::PluginError(_) => "PLUGIN_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}

impl From<ConfigError> for DomainError {
    fn from(err: ConfigError) -> Self {
        DomainError::ConfigError(err.to_string())
    }
}
