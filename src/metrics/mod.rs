// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order list controller
// ============================================================================
//
// Covers:
// - Fetch cycles (started, superseded, stale responses, failures, latency)
// - Search debounce restarts
// - Eligibility rejections
// - Batch action outcomes
//
// Scraped via /metrics when the metrics server is enabled.
// ============================================================================

pub struct ConsoleMetrics {
    registry: Registry,

    // Fetch Orchestration
    pub fetch_cycles_started: IntCounter,
    pub fetch_cycles_superseded: IntCounter,
    pub stale_responses_discarded: IntCounterVec,
    pub query_failures: IntCounterVec,
    pub query_duration: HistogramVec,

    // Search
    pub debounce_restarts: IntCounter,

    // Selection
    pub eligibility_rejections: IntCounterVec,

    // Batch Actions
    pub batch_outcomes: IntCounterVec,
}

impl ConsoleMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let fetch_cycles_started = IntCounter::new(
            "order_list_fetch_cycles_total",
            "Fetch cycles issued by the order list controller",
        )?;
        registry.register(Box::new(fetch_cycles_started.clone()))?;

        let fetch_cycles_superseded = IntCounter::new(
            "order_list_fetch_cycles_superseded_total",
            "Fetch cycles cancelled by a newer cycle",
        )?;
        registry.register(Box::new(fetch_cycles_superseded.clone()))?;

        let stale_responses_discarded = IntCounterVec::new(
            Opts::new("order_list_stale_responses_total", "Late responses of superseded cycles"),
            &["query"],
        )?;
        registry.register(Box::new(stale_responses_discarded.clone()))?;

        let query_failures = IntCounterVec::new(
            Opts::new("order_list_query_failures_total", "Failed list or aggregate queries"),
            &["query"],
        )?;
        registry.register(Box::new(query_failures.clone()))?;

        let query_duration = HistogramVec::new(
            HistogramOpts::new("order_list_query_duration_seconds", "Order service query latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["query"],
        )?;
        registry.register(Box::new(query_duration.clone()))?;

        let debounce_restarts = IntCounter::new(
            "order_list_search_debounce_restarts_total",
            "Search keystrokes that restarted a pending debounce timer",
        )?;
        registry.register(Box::new(debounce_restarts.clone()))?;

        let eligibility_rejections = IntCounterVec::new(
            Opts::new("order_list_selection_rejections_total", "Rows refused by the eligibility rule"),
            &["status"],
        )?;
        registry.register(Box::new(eligibility_rejections.clone()))?;

        let batch_outcomes = IntCounterVec::new(
            Opts::new("order_list_batch_outcomes_total", "Batch action results"),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(batch_outcomes.clone()))?;

        Ok(Self {
            registry,
            fetch_cycles_started,
            fetch_cycles_superseded,
            stale_responses_discarded,
            query_failures,
            query_duration,
            debounce_restarts,
            eligibility_rejections,
            batch_outcomes,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_fetch_started(&self, superseded_previous: bool) {
        self.fetch_cycles_started.inc();
        if superseded_previous {
            self.fetch_cycles_superseded.inc();
        }
    }

    pub fn record_query(&self, query: &str, duration_secs: f64, success: bool) {
        self.query_duration.with_label_values(&[query]).observe(duration_secs);
        if !success {
            self.query_failures.with_label_values(&[query]).inc();
        }
    }

    pub fn record_stale_response(&self, query: &str) {
        self.stale_responses_discarded.with_label_values(&[query]).inc();
    }

    pub fn record_debounce_restart(&self) {
        self.debounce_restarts.inc();
    }

    pub fn record_rejection(&self, status: &str) {
        self.eligibility_rejections.with_label_values(&[status]).inc();
    }

    pub fn record_batch_outcome(&self, action: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.batch_outcomes.with_label_values(&[action, outcome]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(metrics: &ConsoleMetrics, name: &str) -> Vec<f64> {
        metrics
            .registry()
            .gather()
            .iter()
            .find(|m| m.name() == name)
            .map(|family| family.metric.iter().map(|m| m.counter.value.unwrap_or_default()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = ConsoleMetrics::new().unwrap();
        metrics.record_fetch_started(false);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_fetch_cycle_counters() {
        let metrics = ConsoleMetrics::new().unwrap();
        metrics.record_fetch_started(false);
        metrics.record_fetch_started(true);
        metrics.record_stale_response("rows");

        assert_eq!(counter(&metrics, "order_list_fetch_cycles_total"), vec![2.0]);
        assert_eq!(counter(&metrics, "order_list_fetch_cycles_superseded_total"), vec![1.0]);
        assert_eq!(counter(&metrics, "order_list_stale_responses_total"), vec![1.0]);
    }

    #[test]
    fn test_query_failures_by_kind() {
        let metrics = ConsoleMetrics::new().unwrap();
        metrics.record_query("rows", 0.02, true);
        metrics.record_query("rows", 0.5, false);
        metrics.record_query("negative_profit", 0.1, false);

        assert_eq!(counter(&metrics, "order_list_query_failures_total").len(), 2);
    }

    #[test]
    fn test_batch_outcomes() {
        let metrics = ConsoleMetrics::new().unwrap();
        metrics.record_batch_outcome("resend", true);
        metrics.record_batch_outcome("resend", false);
        metrics.record_batch_outcome("resend", true);

        let mut values = counter(&metrics, "order_list_batch_outcomes_total");
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values, vec![1.0, 2.0]);
    }
}
