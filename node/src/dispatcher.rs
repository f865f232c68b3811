//! Slot-gated job launcher.
//!
//! Every launch goes through [`SlotSet::try_acquire`]. A refused acquisition
//! is a silent no-op for the caller (logged at debug, counted as skipped).
//! A granted one moves the [`SlotGuard`](crate::slot::SlotGuard) into the
//! spawned task, so the slot frees itself whenever that task ends.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::jobs::{Job, JobError, TaskRunner};
use crate::logging::challenge_job_error;
use crate::metrics::NodeMetrics;
use crate::slot::{SlotSet, TaskKind};
use crate::tracing_spans::{deadline_job_span, job_span};

pub struct Dispatcher {
    slots: Arc<SlotSet>,
    runner: Arc<dyn TaskRunner>,
    metrics: Arc<NodeMetrics>,
}

impl Dispatcher {
    pub fn new(slots: Arc<SlotSet>, runner: Arc<dyn TaskRunner>, metrics: Arc<NodeMetrics>) -> Self {
        Self {
            slots,
            runner,
            metrics,
        }
    }

    pub fn slots(&self) -> &Arc<SlotSet> {
        &self.slots
    }

    pub fn runner(&self) -> &Arc<dyn TaskRunner> {
        &self.runner
    }

    pub fn is_free(&self, kind: TaskKind) -> bool {
        self.slots.is_free(kind)
    }

    /// Launch `job` now if its slot is free.
    pub fn dispatch(&self, job: Job) -> Option<JoinHandle<()>> {
        self.dispatch_after(job, Duration::ZERO)
    }

    /// Launch `job` if its slot is free, letting it start after `delay`.
    ///
    /// The slot is taken immediately and held through the delay.
    pub fn dispatch_after(&self, job: Job, delay: Duration) -> Option<JoinHandle<()>> {
        let kind = job.slot();
        let name = job.name();
        let span = match job.deadline() {
            Some((height, deadline)) => deadline_job_span(kind, height, deadline),
            None => job_span(kind),
        };
        let runner = Arc::clone(&self.runner);
        self.launch(kind, name, span, delay, async move { job.run(runner.as_ref()).await })
    }

    /// Launch a core-owned job under the slot of `kind`.
    pub fn spawn_with<F>(&self, kind: TaskKind, delay: Duration, fut: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.launch(kind, kind.as_str(), job_span(kind), delay, fut)
    }

    fn launch<F>(
        &self,
        kind: TaskKind,
        name: &'static str,
        span: Span,
        delay: Duration,
        fut: F,
    ) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let Some(guard) = self.slots.try_acquire(kind) else {
            debug!(job = name, slot = %kind, "slot busy, not dispatching");
            self.metrics.jobs_skipped.with_label_values(&[kind.as_str()]).inc();
            return None;
        };
        self.metrics.jobs_dispatched.with_label_values(&[kind.as_str()]).inc();
        let metrics = Arc::clone(&self.metrics);

        let task = async move {
            let _guard = guard;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!(job = name, "job started");
            let timer = metrics
                .job_duration_secs
                .with_label_values(&[kind.as_str()])
                .start_timer();
            let result = AssertUnwindSafe(fut).catch_unwind().await;
            timer.observe_duration();
            match result {
                Ok(Ok(())) => info!(job = name, "job finished"),
                Ok(Err(e)) => {
                    metrics.jobs_failed.with_label_values(&[kind.as_str()]).inc();
                    match kind.proof_kind() {
                        Some(proof) => challenge_job_error(proof, name, &e),
                        None => warn!(job = name, error = %e, "job failed"),
                    }
                }
                Err(panic) => {
                    metrics.jobs_failed.with_label_values(&[kind.as_str()]).inc();
                    error!(job = name, "job panicked");
                    // Re-raised so the JoinHandle still reports the panic.
                    std::panic::resume_unwind(panic);
                }
            }
        };
        Some(tokio::spawn(task.instrument(span)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    use crate::jobs::{ChallengeJob, VerifyResultJob};

    /// Runner whose report-files job blocks until released.
    #[derive(Default)]
    struct GateRunner {
        gate: Notify,
        report_runs: AtomicUsize,
        fail_calc_tag: bool,
    }

    #[async_trait]
    impl TaskRunner for GateRunner {
        async fn idle_proof(&self, _job: ChallengeJob) -> Result<(), JobError> {
            Ok(())
        }
        async fn service_proof(&self, _job: ChallengeJob) -> Result<(), JobError> {
            Ok(())
        }
        async fn idle_verify_result(&self, _job: VerifyResultJob) -> Result<(), JobError> {
            Ok(())
        }
        async fn service_verify_result(&self, _job: VerifyResultJob) -> Result<(), JobError> {
            Ok(())
        }
        async fn report_files(&self) -> Result<(), JobError> {
            self.report_runs.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(())
        }
        async fn calc_tag(&self) -> Result<(), JobError> {
            if self.fail_calc_tag {
                Err(JobError::Failed("tag store offline".into()))
            } else {
                Ok(())
            }
        }
        async fn replace_idle(&self) -> Result<(), JobError> {
            Ok(())
        }
        async fn resize_space(&self) -> Result<(), JobError> {
            panic!("resize exploded");
        }
        async fn space_management(&self) -> Result<(), JobError> {
            Ok(())
        }
        async fn connect_bootstrap(&self, _peers: &[String]) -> Result<(), JobError> {
            Ok(())
        }
    }

    fn dispatcher(runner: Arc<GateRunner>) -> (Dispatcher, Arc<NodeMetrics>) {
        let metrics = Arc::new(NodeMetrics::new());
        let d = Dispatcher::new(Arc::new(SlotSet::new()), runner, Arc::clone(&metrics));
        (d, metrics)
    }

    #[tokio::test]
    async fn second_dispatch_while_running_is_a_noop() {
        let runner = Arc::new(GateRunner::default());
        let (d, metrics) = dispatcher(Arc::clone(&runner));

        let first = d.dispatch(Job::ReportFiles).expect("slot free");
        tokio::task::yield_now().await;
        assert!(d.dispatch(Job::ReportFiles).is_none());
        assert_eq!(metrics.skipped(TaskKind::ReportFiles), 1);
        assert!(!d.is_free(TaskKind::ReportFiles));

        runner.gate.notify_one();
        first.await.unwrap();
        assert!(d.is_free(TaskKind::ReportFiles));
        assert_eq!(runner.report_runs.load(Ordering::SeqCst), 1);
        assert_eq!(d.slots().released(TaskKind::ReportFiles), 1);
    }

    #[tokio::test]
    async fn failure_releases_and_is_counted() {
        let runner = Arc::new(GateRunner {
            fail_calc_tag: true,
            ..Default::default()
        });
        let (d, metrics) = dispatcher(runner);
        d.dispatch(Job::CalcTag).unwrap().await.unwrap();
        assert!(d.is_free(TaskKind::CalcTag));
        assert_eq!(metrics.failed(TaskKind::CalcTag), 1);
        assert_eq!(metrics.dispatched(TaskKind::CalcTag), 1);
    }

    #[tokio::test]
    async fn panic_releases_exactly_once_and_is_counted() {
        let runner = Arc::new(GateRunner::default());
        let (d, metrics) = dispatcher(runner);
        let err = d.dispatch(Job::ResizeSpace).unwrap().await.unwrap_err();
        assert!(err.is_panic());
        assert_eq!(metrics.failed(TaskKind::ResizeSpace), 1);
        assert!(d.is_free(TaskKind::ResizeSpace));
        assert_eq!(d.slots().acquired(TaskKind::ResizeSpace), 1);
        assert_eq!(d.slots().released(TaskKind::ResizeSpace), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_launch_holds_the_slot() {
        let runner = Arc::new(GateRunner::default());
        let (d, _) = dispatcher(runner);
        let handle = d
            .spawn_with(TaskKind::Discovery, Duration::from_secs(6), async { Ok(()) })
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!d.is_free(TaskKind::Discovery));
        handle.await.unwrap();
        assert!(d.is_free(TaskKind::Discovery));
    }
}
