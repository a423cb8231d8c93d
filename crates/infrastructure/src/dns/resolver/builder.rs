use super::core::Resolver;
use super::stats::QueryCounters;
use crate::dns::kernel::{Kernel, Plugin};
use crate::dns::plugins::{
    HealthCheckPlugin, QueryBuilder, ResolverChain, ResponseCache, RetryPolicy,
};
use crate::dns::transport::{create_transport, TcpTransport};
use ferrous_resolver_application::ports::{DnsTransport, DnssecValidator};
use ferrous_resolver_domain::{DomainError, ResolverConfig, TransportType};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ResolverBuilder {
    config: ResolverConfig,
    transport: Option<Arc<dyn DnsTransport>>,
    tcp_fallback: Option<Arc<dyn DnsTransport>>,
    validator: Option<Arc<dyn DnssecValidator>>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl ResolverBuilder {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            transport: None,
            tcp_fallback: None,
            validator: None,
            plugins: Vec::new(),
        }
    }

    /// Replaces the built-in transport for the configured `type`. Required
    /// for `type = "doh"`.
    pub fn with_transport(mut self, transport: Arc<dyn DnsTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Transport used to re-issue a truncated UDP reply. Defaults to
    /// [`TcpTransport`].
    pub fn with_tcp_fallback(mut self, transport: Arc<dyn DnsTransport>) -> Self {
        self.tcp_fallback = Some(transport);
        self
    }

    pub fn with_dnssec_validator(mut self, validator: Arc<dyn DnssecValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Registers an extra plugin after the built-in ones.
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub async fn build(self) -> Result<Resolver, DomainError> {
        let config = self.config;
        config.validate()?;
        let servers = config.server_addrs()?;

        let transport = match self.transport {
            Some(t) => t,
            None => create_transport(config.transport)?,
        };
        let tcp_fallback = match config.transport {
            TransportType::Udp => Some(
                self.tcp_fallback
                    .unwrap_or_else(|| Arc::new(TcpTransport::new()) as Arc<dyn DnsTransport>),
            ),
            TransportType::Tcp | TransportType::Doh => None,
        };
        let timeout = Duration::from_millis(config.timeout_ms);

        let kernel = Arc::new(Kernel::new());
        let query_builder = Arc::new(QueryBuilder::new(config.dnssec.enabled));
        let chain = Arc::new(ResolverChain::new(servers, config.rotation_strategy)?);
        let cache = Arc::new(ResponseCache::new(config.cache.clone()));
        let retry = Arc::new(RetryPolicy::new(
            config.retries,
            Duration::from_millis(config.retry_delay_ms),
            config.retry_backoff,
        ));

        kernel.register_shared(Arc::clone(&query_builder))?;
        kernel.register_shared(Arc::clone(&chain))?;
        kernel.register_shared(Arc::clone(&cache))?;
        kernel.register_shared(Arc::clone(&retry))?;

        if config.health_check {
            kernel.register(Arc::new(HealthCheckPlugin::new(
                Arc::clone(&transport),
                Duration::from_millis(config.health_check_interval_ms),
                timeout,
            )))?;
        }

        for plugin in self.plugins {
            kernel.register(plugin)?;
        }

        kernel.init().await?;

        info!(
            servers = chain.servers().len(),
            transport = transport.protocol_name(),
            strategy = config.rotation_strategy.as_str(),
            cache = config.cache.enabled,
            dnssec = config.dnssec.enabled,
            plugins = kernel.plugin_names().len(),
            "DNS resolver built"
        );

        Ok(Resolver {
            kernel,
            query_builder,
            chain,
            cache,
            retry,
            transport,
            tcp_fallback,
            validator: self.validator,
            dnssec: config.dnssec,
            timeout,
            counters: QueryCounters::default(),
            destroyed: AtomicBool::new(false),
        })
    }
}
