//! Prometheus metrics for the miner node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`], so several nodes (or
//! orchestrators under test) can coexist in one process without clashing
//! on metric names.

use prometheus::core::Collector;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, HistogramOpts,
    HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

use crate::slot::TaskKind;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Challenge ticks that ran.
    pub challenge_ticks: IntCounter,
    /// Jobs launched, by task kind.
    pub jobs_dispatched: IntCounterVec,
    /// Jobs that returned an error or panicked, by task kind.
    pub jobs_failed: IntCounterVec,
    /// Dispatch attempts refused because the slot was taken, by task kind.
    pub jobs_skipped: IntCounterVec,
    /// Chain queries that failed with a hard error, by query name.
    pub chain_errors: IntCounterVec,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Peers currently in the peer registry.
    pub known_peers: IntGauge,
    /// Verifying workers currently in the verifier registry.
    pub known_verifiers: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall-clock job duration in seconds, by task kind.
    pub job_duration_secs: HistogramVec,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let challenge_ticks = register_int_counter_with_registry!(
            Opts::new("strata_challenge_ticks_total", "Challenge ticks run"),
            registry
        )
        .expect("failed to register challenge_ticks counter");

        let jobs_dispatched = register_int_counter_vec_with_registry!(
            Opts::new("strata_jobs_dispatched_total", "Jobs launched by kind"),
            &["kind"],
            registry
        )
        .expect("failed to register jobs_dispatched counter");

        let jobs_failed = register_int_counter_vec_with_registry!(
            Opts::new("strata_jobs_failed_total", "Jobs that failed or panicked by kind"),
            &["kind"],
            registry
        )
        .expect("failed to register jobs_failed counter");

        let jobs_skipped = register_int_counter_vec_with_registry!(
            Opts::new(
                "strata_jobs_skipped_total",
                "Dispatch attempts refused because the slot was busy"
            ),
            &["kind"],
            registry
        )
        .expect("failed to register jobs_skipped counter");

        let chain_errors = register_int_counter_vec_with_registry!(
            Opts::new("strata_chain_errors_total", "Failed chain queries by query"),
            &["query"],
            registry
        )
        .expect("failed to register chain_errors counter");

        let known_peers = register_int_gauge_with_registry!(
            Opts::new("strata_known_peers", "Peers in the peer registry"),
            registry
        )
        .expect("failed to register known_peers gauge");

        let known_verifiers = register_int_gauge_with_registry!(
            Opts::new("strata_known_verifiers", "Verifying workers in the verifier registry"),
            registry
        )
        .expect("failed to register known_verifiers gauge");

        // Proof jobs run for minutes; cover 10 ms → ~80 min.
        let job_duration_secs = register_histogram_vec_with_registry!(
            HistogramOpts::new("strata_job_duration_seconds", "Job duration in seconds")
                .buckets(prometheus::exponential_buckets(0.01, 2.0, 20).unwrap()),
            &["kind"],
            registry
        )
        .expect("failed to register job_duration_secs histogram");

        Self {
            registry,
            challenge_ticks,
            jobs_dispatched,
            jobs_failed,
            jobs_skipped,
            chain_errors,
            known_peers,
            known_verifiers,
            job_duration_secs,
        }
    }

    pub fn dispatched(&self, kind: TaskKind) -> u64 {
        self.jobs_dispatched.with_label_values(&[kind.as_str()]).get()
    }

    pub fn failed(&self, kind: TaskKind) -> u64 {
        self.jobs_failed.with_label_values(&[kind.as_str()]).get()
    }

    pub fn skipped(&self, kind: TaskKind) -> u64 {
        self.jobs_skipped.with_label_values(&[kind.as_str()]).get()
    }

    pub fn chain_error_count(&self, query: &str) -> u64 {
        self.chain_errors.with_label_values(&[query]).get()
    }

    /// Total failed chain queries across all query names.
    pub fn total_chain_errors(&self) -> u64 {
        self.chain_errors
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .map(|m| m.get_counter().get_value() as u64)
            .sum()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_registries_do_not_clash() {
        let a = NodeMetrics::new();
        let b = NodeMetrics::new();
        a.jobs_dispatched
            .with_label_values(&[TaskKind::CalcTag.as_str()])
            .inc();
        assert_eq!(a.dispatched(TaskKind::CalcTag), 1);
        assert_eq!(b.dispatched(TaskKind::CalcTag), 0);
    }

    #[test]
    fn total_chain_errors_sums_labels() {
        let m = NodeMetrics::new();
        m.chain_errors.with_label_values(&["block_height"]).inc();
        m.chain_errors.with_label_values(&["challenge_window"]).inc_by(2);
        assert_eq!(m.total_chain_errors(), 3);
        assert_eq!(m.chain_error_count("challenge_window"), 2);
    }
}
