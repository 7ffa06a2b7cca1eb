use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Pipeline counters. Clones share the same counters.
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    records_processed: AtomicU64,
    training_runs: AtomicU64,
    scenarios_scored: AtomicU64,
    predictions_served: AtomicU64,
    rejected_inputs: AtomicU64,
}

impl PipelineMetrics {
    pub fn inc_records_processed(&self, delta: u64) {
        self.inner.records_processed.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_training_runs(&self, delta: u64) {
        self.inner.training_runs.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_scenarios_scored(&self, delta: u64) {
        self.inner.scenarios_scored.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_predictions_served(&self, delta: u64) {
        self.inner.predictions_served.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_rejected_inputs(&self, delta: u64) {
        self.inner.rejected_inputs.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_processed: self.inner.records_processed.load(Ordering::Relaxed),
            training_runs: self.inner.training_runs.load(Ordering::Relaxed),
            scenarios_scored: self.inner.scenarios_scored.load(Ordering::Relaxed),
            predictions_served: self.inner.predictions_served.load(Ordering::Relaxed),
            rejected_inputs: self.inner.rejected_inputs.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PipelineMetrics").field(&self.snapshot()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_processed: u64,
    pub training_runs: u64,
    pub scenarios_scored: u64,
    pub predictions_served: u64,
    pub rejected_inputs: u64,
}

impl MetricsSnapshot {
    pub fn to_json_line(&self, label: &str, elapsed: Option<Duration>) -> String {
        #[derive(Serialize)]
        struct Line<'a> {
            label: &'a str,
            #[serde(flatten)]
            counters: &'a MetricsSnapshot,
            elapsed_ms: Option<u128>,
        }

        let payload = Line { label, counters: self, elapsed_ms: elapsed.map(|d| d.as_millis()) };
        serde_json::to_string(&payload).unwrap_or_else(|_| String::from("{}"))
    }
}

pub struct StageTimer {
    stage: &'static str,
    start: Instant,
}

impl StageTimer {
    pub fn start(stage: &'static str) -> Self {
        Self { stage, start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Logs the elapsed time at debug level and returns it.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!(
            stage = self.stage,
            elapsed_ms = elapsed.as_millis() as u64,
            "stage finished"
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = PipelineMetrics::default();
        let handle = metrics.clone();
        handle.inc_records_processed(12);
        metrics.inc_predictions_served(1);
        handle.inc_predictions_served(2);

        let snap = metrics.snapshot();
        assert_eq!(snap.records_processed, 12);
        assert_eq!(snap.predictions_served, 3);
        assert_eq!(snap.training_runs, 0);
    }

    #[test]
    fn json_line_flattens_counters() {
        let metrics = PipelineMetrics::default();
        metrics.inc_training_runs(1);
        let line = metrics.snapshot().to_json_line("run", Some(Duration::from_millis(1500)));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["label"], "run");
        assert_eq!(value["training_runs"], 1);
        assert_eq!(value["elapsed_ms"], 1500);
    }
}
