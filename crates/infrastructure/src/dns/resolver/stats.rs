use ferrous_resolver_application::ports::ResolverStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lifetime query counters. Rates and averages are derived on read.
#[derive(Debug, Default)]
pub struct QueryCounters {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    total_duration_us: AtomicU64,
}

impl QueryCounters {
    pub fn record(&self, success: bool, duration: Duration) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.total_duration_us.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ResolverStats {
        let total = self.total.load(Ordering::Relaxed);
        let total_us = self.total_duration_us.load(Ordering::Relaxed);
        ResolverStats {
            total_queries: total,
            successful_queries: self.succeeded.load(Ordering::Relaxed),
            failed_queries: self.failed.load(Ordering::Relaxed),
            average_duration_ms: if total > 0 {
                total_us as f64 / total as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_duration() {
        let counters = QueryCounters::default();
        counters.record(true, Duration::from_millis(10));
        counters.record(false, Duration::from_millis(30));

        let stats = counters.snapshot();
        assert_eq!(stats.total_queries, 2);
        assert_eq!(stats.successful_queries, 1);
        assert_eq!(stats.failed_queries, 1);
        assert!((stats.average_duration_ms - 20.0).abs() < 1e-9);
    }
}
