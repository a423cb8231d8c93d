use ferrous_resolver_domain::{
    ConfigError, DomainError, ResolverConfig, RetryBackoff, RotationStrategy, TransportType,
};
use std::io::Write;

#[test]
fn test_config_default_values() {
    let config = ResolverConfig::default();

    assert_eq!(config.servers, vec!["8.8.8.8:53", "1.1.1.1:53"]);
    assert_eq!(config.timeout_ms, 5000);
    assert_eq!(config.retries, 2);
    assert_eq!(config.retry_delay_ms, 100);
    assert_eq!(config.retry_backoff, RetryBackoff::Exponential);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.max_size, 1000);
    assert!(config.cache.respect_ttl);
    assert!(config.cache.min_ttl.is_none());
    assert!(config.cache.max_ttl.is_none());
    assert!(!config.dnssec.enabled);
    assert_eq!(config.transport, TransportType::Udp);
    assert_eq!(config.rotation_strategy, RotationStrategy::Failover);
    assert!(!config.health_check);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
        servers = ["9.9.9.9", "[2620:fe::fe]:53"]
        timeout_ms = 1500
        retries = 4
        retry_backoff = "linear"
        rotation_strategy = "round-robin"
        type = "tcp"

        [cache]
        max_size = 50
        min_ttl = 30
        max_ttl = 600
    "#;

    let config = ResolverConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.timeout_ms, 1500);
    assert_eq!(config.retries, 4);
    assert_eq!(config.retry_backoff, RetryBackoff::Linear);
    assert_eq!(config.rotation_strategy, RotationStrategy::RoundRobin);
    assert_eq!(config.transport, TransportType::Tcp);
    assert_eq!(config.cache.max_size, 50);
    assert_eq!(config.cache.clamp_ttl(5), 30);
    assert_eq!(config.cache.clamp_ttl(3600), 600);
    assert_eq!(config.cache.clamp_ttl(120), 120);

    let addrs = config.server_addrs().unwrap();
    assert_eq!(addrs[0], "9.9.9.9:53".parse().unwrap());
    assert!(addrs[1].is_ipv6());
}

#[test]
fn test_doh_requires_server_url() {
    let result = ResolverConfig::from_toml_str(r#"type = "doh""#);
    assert!(matches!(result, Err(ConfigError::Validation(_))));

    let ok = ResolverConfig::from_toml_str(
        r#"
        type = "doh"
        server = "https://dns.example/dns-query"
        "#,
    );
    assert!(ok.is_ok());
}

#[test]
fn test_validation_failures() {
    let mut config = ResolverConfig {
        servers: vec![],
        ..ResolverConfig::default()
    };
    assert!(config.validate().is_err());

    config.servers = vec!["not-an-ip".into()];
    assert!(config.validate().is_err());

    config.servers = vec!["8.8.8.8".into()];
    config.timeout_ms = 0;
    assert!(config.validate().is_err());

    config.timeout_ms = 100;
    config.cache.min_ttl = Some(100);
    config.cache.max_ttl = Some(10);
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let result = ResolverConfig::from_toml_str("timeout_ms = \"soon\"");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_error_converts_to_domain_error() {
    let err: DomainError = ConfigError::Validation("bad".into()).into();
    assert!(matches!(err, DomainError::ConfigError(_)));
}

#[test]
fn test_from_file() {
    let path = std::env::temp_dir().join(format!(
        "ferrous-resolver-config-{}.toml",
        std::process::id()
    ));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "servers = [\"127.0.0.1:5300\"]").unwrap();
        writeln!(file, "health_check = true").unwrap();
    }

    let config = ResolverConfig::from_file(&path).unwrap();
    assert_eq!(config.servers, vec!["127.0.0.1:5300"]);
    assert!(config.health_check);

    std::fs::remove_file(&path).ok();

    let missing = ResolverConfig::from_file(&path);
    assert!(matches!(missing, Err(ConfigError::FileRead(_, _))));
}
