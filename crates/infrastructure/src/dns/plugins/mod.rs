pub mod cache;
pub mod health_check;
pub mod query_builder;
pub mod query_log;
pub mod resolver_chain;
pub mod retry;

pub use cache::{CacheKey, CachedAnswer, ResponseCache};
pub use health_check::HealthCheckPlugin;
pub use query_builder::{BuiltQuery, PendingGuard, PendingQuery, QueryBuilder};
pub use query_log::QueryLogPlugin;
pub use resolver_chain::ResolverChain;
pub use retry::{RetryAttempt, RetryPolicy};
