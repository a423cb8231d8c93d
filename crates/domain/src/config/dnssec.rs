use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DnssecConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Fail the query with `DnssecInvalid` instead of reporting `dnssec_valid = false`.
    #[serde(default)]
    pub require_valid: bool,

    /// DS/DNSKEY trust anchors handed to the attached validator.
    #[serde(default)]
    pub trust_anchors: Vec<String>,
}
