//! Plugin host: registration, lifecycle hooks, typed shared state and a
//! sequential event bus.

pub mod events;
pub mod plugin;

pub use events::{EventKind, EventListener, ResolverEvent};
pub use plugin::Plugin;

use ferrous_resolver_domain::DomainError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

type StateSlot = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct Kernel {
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    listeners: RwLock<HashMap<EventKind, Vec<Arc<dyn EventListener>>>>,
    state: RwLock<HashMap<TypeId, StateSlot>>,
}

impl Kernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin`. Fails if the name is taken or a dependency has
    /// not been registered yet.
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> Result<(), DomainError> {
        let mut plugins = self.plugins.write().unwrap_or_else(|e| e.into_inner());

        if plugins.iter().any(|p| p.name() == plugin.name()) {
            return Err(DomainError::PluginError(format!(
                "plugin '{}' is already registered",
                plugin.name()
            )));
        }

        for dep in plugin.dependencies() {
            if !plugins.iter().any(|p| p.name() == *dep) {
                return Err(DomainError::PluginError(format!(
                    "plugin '{}' depends on '{}', which is not registered",
                    plugin.name(),
                    dep
                )));
            }
        }

        debug!(
            plugin = plugin.name(),
            version = plugin.version().unwrap_or("-"),
            "Plugin registered"
        );
        plugins.push(plugin);
        Ok(())
    }

    /// Registers `plugin` and publishes it as shared state so other plugins
    /// can look it up with [`Kernel::state`].
    pub fn register_shared<P>(&self, plugin: Arc<P>) -> Result<(), DomainError>
    where
        P: Plugin + 'static,
    {
        self.register(plugin.clone())?;
        self.set_state(plugin);
        Ok(())
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.snapshot_plugins()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Runs every `install` hook, then every `init` hook, in registration
    /// order. Stops at the first failure; hooks that already ran are not
    /// undone.
    pub async fn init(&self) -> Result<(), DomainError> {
        let plugins = self.snapshot_plugins();

        for plugin in &plugins {
            plugin.install(self).map_err(|e| {
                warn!(plugin = plugin.name(), error = %e, "Plugin install failed");
                e
            })?;
        }

        for plugin in &plugins {
            plugin.init(self).await.map_err(|e| {
                warn!(plugin = plugin.name(), error = %e, "Plugin init failed");
                e
            })?;
        }

        info!(plugins = plugins.len(), "Kernel initialized");
        Ok(())
    }

    /// Runs every `destroy` hook in registration order. Failures are logged
    /// and do not stop the remaining hooks.
    pub async fn destroy(&self) {
        for plugin in self.snapshot_plugins() {
            if let Err(e) = plugin.destroy(self).await {
                warn!(plugin = plugin.name(), error = %e, "Plugin destroy failed");
            }
        }
        debug!("Kernel destroyed");
    }

    pub fn on(&self, kind: EventKind, listener: Arc<dyn EventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_default()
            .push(listener);
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Delivers `event` to its listeners one after another, in the order they
    /// subscribed. A failing listener is logged and skipped.
    pub async fn emit(&self, event: ResolverEvent) {
        let kind = event.kind();
        let listeners = {
            let map = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            match map.get(&kind) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for listener in listeners {
            if let Err(e) = listener.on_event(&event).await {
                warn!(event = kind.as_str(), error = %e, "Event listener failed");
            }
        }
    }

    pub fn set_state<T>(&self, value: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(TypeId::of::<T>(), value);
    }

    pub fn state<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let slot = self
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<T>())
            .cloned()?;
        slot.downcast::<T>().ok()
    }

    fn snapshot_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferrous_resolver_domain::RecordType;
    use std::sync::Mutex;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        deps: &'static [&'static str],
        log: Log,
        fail_init: bool,
        fail_destroy: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                deps: &[],
                log: log.clone(),
                fail_init: false,
                fail_destroy: false,
            }
        }
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> &[&'static str] {
            self.deps
        }

        fn install(&self, _kernel: &Kernel) -> Result<(), DomainError> {
            self.log.lock().unwrap().push(format!("install:{}", self.name));
            Ok(())
        }

        async fn init(&self, _kernel: &Kernel) -> Result<(), DomainError> {
            self.log.lock().unwrap().push(format!("init:{}", self.name));
            if self.fail_init {
                return Err(DomainError::PluginError("boom".into()));
            }
            Ok(())
        }

        async fn destroy(&self, _kernel: &Kernel) -> Result<(), DomainError> {
            self.log.lock().unwrap().push(format!("destroy:{}", self.name));
            if self.fail_destroy {
                return Err(DomainError::PluginError("boom".into()));
            }
            Ok(())
        }
    }

    fn started() -> ResolverEvent {
        ResolverEvent::QueryStarted {
            domain: "example.com".into(),
            record_type: RecordType::A,
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let log: Log = Arc::default();
        let kernel = Kernel::new();
        kernel.register(Arc::new(Recorder::new("a", &log))).unwrap();
        kernel.register(Arc::new(Recorder::new("b", &log))).unwrap();

        kernel.init().await.unwrap();
        kernel.destroy().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "install:a",
                "install:b",
                "init:a",
                "init:b",
                "destroy:a",
                "destroy:b"
            ]
        );
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let log: Log = Arc::default();
        let kernel = Kernel::new();
        kernel.register(Arc::new(Recorder::new("a", &log))).unwrap();
        assert!(matches!(
            kernel.register(Arc::new(Recorder::new("a", &log))),
            Err(DomainError::PluginError(_))
        ));
    }

    #[test]
    fn test_missing_dependency_is_rejected() {
        let log: Log = Arc::default();
        let kernel = Kernel::new();
        let mut dependent = Recorder::new("metrics", &log);
        dependent.deps = &["cache"];

        assert!(matches!(
            kernel.register(Arc::new(dependent)),
            Err(DomainError::PluginError(_))
        ));
        assert!(kernel.plugin_names().is_empty());
    }

    #[tokio::test]
    async fn test_init_failure_stops_later_inits() {
        let log: Log = Arc::default();
        let kernel = Kernel::new();
        let mut failing = Recorder::new("a", &log);
        failing.fail_init = true;
        kernel.register(Arc::new(failing)).unwrap();
        kernel.register(Arc::new(Recorder::new("b", &log))).unwrap();

        assert!(kernel.init().await.is_err());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["install:a", "install:b", "init:a"]
        );
    }

    #[tokio::test]
    async fn test_destroy_continues_past_failures() {
        let log: Log = Arc::default();
        let kernel = Kernel::new();
        let mut failing = Recorder::new("a", &log);
        failing.fail_destroy = true;
        kernel.register(Arc::new(failing)).unwrap();
        kernel.register(Arc::new(Recorder::new("b", &log))).unwrap();

        kernel.destroy().await;
        assert_eq!(*log.lock().unwrap(), vec!["destroy:a", "destroy:b"]);
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_stop_delivery() {
        let log: Log = Arc::default();
        let kernel = Kernel::new();

        let first = log.clone();
        kernel.on(
            EventKind::QueryStarted,
            Arc::new(move |_: &ResolverEvent| -> Result<(), DomainError> {
                first.lock().unwrap().push("first".to_string());
                Err(DomainError::PluginError("listener failed".into()))
            }),
        );
        let second = log.clone();
        kernel.on(
            EventKind::QueryStarted,
            Arc::new(move |_: &ResolverEvent| -> Result<(), DomainError> {
                second.lock().unwrap().push("second".to_string());
                Ok(())
            }),
        );

        kernel.emit(started()).await;
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    struct SlowListener {
        label: &'static str,
        delay: Duration,
        log: Log,
    }

    #[async_trait]
    impl EventListener for SlowListener {
        async fn on_event(&self, _event: &ResolverEvent) -> Result<(), DomainError> {
            let at = tokio::time::Instant::now();
            self.log.lock().unwrap().push(format!("{}:start", self.label));
            tokio::time::sleep(self.delay).await;
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:end:{}", self.label, at.elapsed().as_millis()));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_awaits_each_listener_before_the_next() {
        let log: Log = Arc::default();
        let kernel = Kernel::new();
        kernel.on(
            EventKind::QueryStarted,
            Arc::new(SlowListener {
                label: "slow",
                delay: Duration::from_millis(30),
                log: log.clone(),
            }),
        );
        kernel.on(
            EventKind::QueryStarted,
            Arc::new(SlowListener {
                label: "fast",
                delay: Duration::ZERO,
                log: log.clone(),
            }),
        );

        let start = tokio::time::Instant::now();
        kernel.emit(started()).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["slow:start", "slow:end:30", "fast:start", "fast:end:0"]
        );
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_emit_only_reaches_matching_kind() {
        let log: Log = Arc::default();
        let kernel = Kernel::new();
        let seen = log.clone();
        kernel.on(
            EventKind::CacheHit,
            Arc::new(move |_: &ResolverEvent| -> Result<(), DomainError> {
                seen.lock().unwrap().push("hit".to_string());
                Ok(())
            }),
        );

        kernel.emit(started()).await;
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(kernel.listener_count(EventKind::CacheHit), 1);
    }

    #[test]
    fn test_typed_state_slots() {
        struct Counter(u32);

        let kernel = Kernel::new();
        assert!(kernel.state::<Counter>().is_none());

        kernel.set_state(Arc::new(Counter(7)));
        assert_eq!(kernel.state::<Counter>().map(|c| c.0), Some(7));
        assert!(kernel.state::<String>().is_none());
    }
}
