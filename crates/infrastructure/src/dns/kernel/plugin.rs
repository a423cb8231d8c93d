use super::Kernel;
use async_trait::async_trait;
use ferrous_resolver_domain::DomainError;

/// An extension hosted by the [`Kernel`].
///
/// Hooks run in registration order: every `install` first, then every `init`,
/// and `destroy` on teardown.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> Option<&str> {
        None
    }

    /// Plugins that must already be registered.
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    fn install(&self, _kernel: &Kernel) -> Result<(), DomainError> {
        Ok(())
    }

    async fn init(&self, _kernel: &Kernel) -> Result<(), DomainError> {
        Ok(())
    }

    async fn destroy(&self, _kernel: &Kernel) -> Result<(), DomainError> {
        Ok(())
    }
}
