//! Prometheus metrics for the experiment lifecycle. Registered lazily on
//! first access; `chaos-api` exposes the process registry at `GET /metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};

/// Total experiments by chaos type and terminal status.
pub static EXPERIMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "experiments_total",
        "Total number of chaos experiments run",
        &["chaos_type", "status"]
    )
    .expect("failed to register experiments_total")
});

/// Experiment wall-clock duration, start to terminus.
pub static EXPERIMENT_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "experiment_duration_seconds",
        "Chaos experiment duration in seconds",
        &["chaos_type"],
        vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("failed to register experiment_duration_seconds")
});

/// Probe outcomes by probe type and pass/fail.
pub static PROBE_RESULTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "probe_results_total",
        "Total probe executions",
        &["probe_type", "passed"]
    )
    .expect("failed to register probe_results_total")
});

/// Rollback outcomes by status.
pub static ROLLBACK_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rollback_total",
        "Total rollback actions executed",
        &["status"]
    )
    .expect("failed to register rollback_total")
});

/// Experiments currently in a running phase.
pub static ACTIVE_EXPERIMENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "active_experiments",
        "Number of experiments currently running"
    )
    .expect("failed to register active_experiments")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_initialize_and_record_without_panicking() {
        EXPERIMENTS_TOTAL
            .with_label_values(&["pod_delete", "completed"])
            .inc();
        EXPERIMENT_DURATION_SECONDS
            .with_label_values(&["pod_delete"])
            .observe(2.5);
        PROBE_RESULTS_TOTAL.with_label_values(&["http", "true"]).inc();
        ROLLBACK_TOTAL.with_label_values(&["success"]).inc();
        ACTIVE_EXPERIMENTS.set(1);

        let families = prometheus::gather();
        assert!(families.iter().any(|f| f.get_name() == "experiments_total"));
    }
}
