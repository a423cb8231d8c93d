use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// When false, answers are stored for `default_ttl` instead of their own TTL.
    #[serde(default = "default_true")]
    pub respect_ttl: bool,

    #[serde(default)]
    pub min_ttl: Option<u32>,

    #[serde(default)]
    pub max_ttl: Option<u32>,

    #[serde(default = "default_ttl")]
    pub default_ttl: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: default_max_size(),
            respect_ttl: true,
            min_ttl: None,
            max_ttl: None,
            default_ttl: default_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn clamp_ttl(&self, ttl: u32) -> u32 {
        let mut ttl = ttl;
        if let Some(min) = self.min_ttl {
            ttl = ttl.max(min);
        }
        if let Some(max) = self.max_ttl {
            ttl = ttl.min(max);
        }
        ttl
    }
}

fn default_true() -> bool {
    true
}

fn default_max_size() -> usize {
    1000
}

fn default_ttl() -> u32 {
    300
}
