//! Nullable task runner: records every job and acts out a chosen behavior.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use strata_node::jobs::{ChallengeJob, Job, JobError, TaskRunner, VerifyResultJob};

/// What a job does once started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    /// Return `Ok` immediately.
    Succeed,
    /// Return a `JobError` immediately.
    Fail,
    /// Panic inside the job.
    Panic,
    /// Block until [`NullTaskRunner::release_held`] is called.
    Hold,
}

struct RunnerState {
    behaviors: HashMap<&'static str, Behavior>,
    started: Vec<Job>,
    finished: Vec<&'static str>,
    bootstrap_connects: Vec<Vec<String>>,
}

/// A test runner that never does real work.
///
/// Every job succeeds immediately by default, except space management,
/// which holds like the long-running filler it stands in for.
pub struct NullTaskRunner {
    state: Mutex<RunnerState>,
    gate: watch::Sender<bool>,
}

impl NullTaskRunner {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        let mut behaviors = HashMap::new();
        behaviors.insert(Job::SpaceManagement.name(), Behavior::Hold);
        Self {
            state: Mutex::new(RunnerState {
                behaviors,
                started: Vec::new(),
                finished: Vec::new(),
                bootstrap_connects: Vec::new(),
            }),
            gate,
        }
    }

    fn state(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the behavior of every job named `job` (see [`Job::name`]).
    pub fn set_behavior(&self, job: &'static str, behavior: Behavior) {
        self.state().behaviors.insert(job, behavior);
    }

    /// Let every held job (current and future) finish.
    pub fn release_held(&self) {
        self.gate.send_replace(true);
    }

    /// Every job started so far, in start order.
    pub fn started(&self) -> Vec<Job> {
        self.state().started.clone()
    }

    pub fn started_count(&self, job: &str) -> usize {
        self.state().started.iter().filter(|j| j.name() == job).count()
    }

    /// Names of jobs that returned (successfully or not), in order.
    pub fn finished(&self) -> Vec<&'static str> {
        self.state().finished.clone()
    }

    pub fn bootstrap_connects(&self) -> Vec<Vec<String>> {
        self.state().bootstrap_connects.clone()
    }

    async fn act(&self, job: Job) -> Result<(), JobError> {
        let name = job.name();
        let behavior = {
            let mut state = self.state();
            state.started.push(job);
            state
                .behaviors
                .get(name)
                .copied()
                .unwrap_or(Behavior::Succeed)
        };
        let result = match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(JobError::Failed(format!("{name} scripted to fail"))),
            Behavior::Panic => panic!("{name} scripted to panic"),
            Behavior::Hold => {
                let mut gate = self.gate.subscribe();
                // Sender lives as long as self; an error cannot happen here.
                let _ = gate.wait_for(|open| *open).await;
                Ok(())
            }
        };
        self.state().finished.push(name);
        result
    }
}

impl Default for NullTaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRunner for NullTaskRunner {
    async fn idle_proof(&self, job: ChallengeJob) -> Result<(), JobError> {
        self.act(Job::IdleProof(job)).await
    }

    async fn service_proof(&self, job: ChallengeJob) -> Result<(), JobError> {
        self.act(Job::ServiceProof(job)).await
    }

    async fn idle_verify_result(&self, job: VerifyResultJob) -> Result<(), JobError> {
        self.act(Job::IdleVerifyResult(job)).await
    }

    async fn service_verify_result(&self, job: VerifyResultJob) -> Result<(), JobError> {
        self.act(Job::ServiceVerifyResult(job)).await
    }

    async fn report_files(&self) -> Result<(), JobError> {
        self.act(Job::ReportFiles).await
    }

    async fn calc_tag(&self) -> Result<(), JobError> {
        self.act(Job::CalcTag).await
    }

    async fn replace_idle(&self) -> Result<(), JobError> {
        self.act(Job::ReplaceIdle).await
    }

    async fn resize_space(&self) -> Result<(), JobError> {
        self.act(Job::ResizeSpace).await
    }

    async fn space_management(&self) -> Result<(), JobError> {
        self.act(Job::SpaceManagement).await
    }

    async fn connect_bootstrap(&self, peers: &[String]) -> Result<(), JobError> {
        self.state().bootstrap_connects.push(peers.to_vec());
        Ok(())
    }
}
