//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (submissions, outcomes, durations)
//! - Concurrency gate (admission waits, active slots, cancellations)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs submitted total by kind.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("baggins_jobs_submitted_total", "Total jobs submitted"),
        &["kind"],
    )
    .unwrap()
});

/// Jobs finished total by kind and outcome.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "baggins_jobs_finished_total",
            "Total jobs that reached a terminal state",
        ),
        &["kind", "outcome"], // outcome: "completed" or a failure kind
    )
    .unwrap()
});

/// Job run duration in seconds (Running -> terminal).
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("baggins_job_duration_seconds", "Duration of job execution")
            .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 3600.0]),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Gate Metrics
// =============================================================================

/// Time spent waiting for a gate slot.
pub static ADMISSION_WAIT: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "baggins_admission_wait_seconds",
            "Time spent waiting for a worker slot",
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0]),
        &["result"], // "admitted", "deadline_exceeded", "cancelled"
    )
    .unwrap()
});

/// Slots currently held.
pub static GATE_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("baggins_gate_active_slots", "Worker slots currently held").unwrap()
});

/// Explicit cancellations that hit an admitted job.
pub static JOBS_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "baggins_jobs_cancelled_total",
        "Total cancellations of running jobs",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOB_DURATION.clone()),
        // Gate
        Box::new(ADMISSION_WAIT.clone()),
        Box::new(GATE_ACTIVE.clone()),
        Box::new(JOBS_CANCELLED.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
