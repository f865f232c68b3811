//! Job descriptions and the collaborator seams that execute them.
//!
//! The proof cryptography, file reporting and space filling all live outside
//! the core. The core decides *when* a job runs and hands it a [`Job`];
//! a [`TaskRunner`] decides *how*. Runners never see slots.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use strata_types::{AccountId, BlockHeight, ChallengeInfo, MinerSnapshot, PeerRecord, ProofKind};

use crate::chain::ChainError;
use crate::key::VerificationKey;
use crate::slot::TaskKind;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("deadline {deadline} passed at {current}")]
    DeadlinePassed {
        deadline: BlockHeight,
        current: BlockHeight,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Parameters of an idle or service proof job.
#[derive(Clone, Debug)]
pub struct ChallengeJob {
    /// Chain height observed when the job was dispatched.
    pub block_height: BlockHeight,
    /// Height by which the proof must be on chain.
    pub expiration: BlockHeight,
    pub window: ChallengeInfo,
    /// This node's entry in the challenge window.
    pub snapshot: MinerSnapshot,
    pub key: Arc<VerificationKey>,
}

/// Parameters of an idle or service verify-result job.
#[derive(Clone, Debug)]
pub struct VerifyResultJob {
    pub block_height: BlockHeight,
    /// Height by which the submitted proof must be verified.
    pub verify_expiration: BlockHeight,
    /// The worker holding this node's proof in its queue.
    pub verifier: AccountId,
    pub window: ChallengeInfo,
    pub snapshot: MinerSnapshot,
    pub key: Arc<VerificationKey>,
}

/// One unit of work the dispatcher can launch.
#[derive(Clone, Debug)]
pub enum Job {
    IdleProof(ChallengeJob),
    ServiceProof(ChallengeJob),
    IdleVerifyResult(VerifyResultJob),
    ServiceVerifyResult(VerifyResultJob),
    ReportFiles,
    CalcTag,
    ReplaceIdle,
    ResizeSpace,
    SpaceManagement,
}

impl Job {
    pub fn proof(kind: ProofKind, job: ChallengeJob) -> Self {
        match kind {
            ProofKind::Idle => Self::IdleProof(job),
            ProofKind::Service => Self::ServiceProof(job),
        }
    }

    pub fn verify_result(kind: ProofKind, job: VerifyResultJob) -> Self {
        match kind {
            ProofKind::Idle => Self::IdleVerifyResult(job),
            ProofKind::Service => Self::ServiceVerifyResult(job),
        }
    }

    /// The slot this job occupies while it runs.
    pub fn slot(&self) -> TaskKind {
        match self {
            Self::IdleProof(_) | Self::IdleVerifyResult(_) => TaskKind::IdleChallenge,
            Self::ServiceProof(_) | Self::ServiceVerifyResult(_) => TaskKind::ServiceChallenge,
            Self::ReportFiles => TaskKind::ReportFiles,
            Self::CalcTag => TaskKind::CalcTag,
            Self::ReplaceIdle => TaskKind::ReplaceIdle,
            Self::ResizeSpace => TaskKind::ResizeSpace,
            Self::SpaceManagement => TaskKind::SpaceManagement,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::IdleProof(_) => "idle_proof",
            Self::ServiceProof(_) => "service_proof",
            Self::IdleVerifyResult(_) => "idle_verify_result",
            Self::ServiceVerifyResult(_) => "service_verify_result",
            Self::ReportFiles => "report_files",
            Self::CalcTag => "calc_tag",
            Self::ReplaceIdle => "replace_idle",
            Self::ResizeSpace => "resize_space",
            Self::SpaceManagement => "space_management",
        }
    }

    /// `(dispatch height, deadline)` for jobs bound to a chain deadline.
    pub fn deadline(&self) -> Option<(BlockHeight, BlockHeight)> {
        match self {
            Self::IdleProof(j) | Self::ServiceProof(j) => Some((j.block_height, j.expiration)),
            Self::IdleVerifyResult(j) | Self::ServiceVerifyResult(j) => {
                Some((j.block_height, j.verify_expiration))
            }
            _ => None,
        }
    }

    /// Hand the job to the matching runner method.
    pub async fn run(self, runner: &dyn TaskRunner) -> Result<(), JobError> {
        match self {
            Self::IdleProof(j) => runner.idle_proof(j).await,
            Self::ServiceProof(j) => runner.service_proof(j).await,
            Self::IdleVerifyResult(j) => runner.idle_verify_result(j).await,
            Self::ServiceVerifyResult(j) => runner.service_verify_result(j).await,
            Self::ReportFiles => runner.report_files().await,
            Self::CalcTag => runner.calc_tag().await,
            Self::ReplaceIdle => runner.replace_idle().await,
            Self::ResizeSpace => runner.resize_space().await,
            Self::SpaceManagement => runner.space_management().await,
        }
    }
}

/// Executes the work behind each job kind.
///
/// Implementations must finish proof jobs before the deadline they are
/// given; the core does not cancel them.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn idle_proof(&self, job: ChallengeJob) -> Result<(), JobError>;

    async fn service_proof(&self, job: ChallengeJob) -> Result<(), JobError>;

    async fn idle_verify_result(&self, job: VerifyResultJob) -> Result<(), JobError>;

    async fn service_verify_result(&self, job: VerifyResultJob) -> Result<(), JobError>;

    /// Report newly stored customer files to the chain.
    async fn report_files(&self) -> Result<(), JobError>;

    /// Compute tags for stored service fragments.
    async fn calc_tag(&self) -> Result<(), JobError>;

    /// Replace idle space that service data has claimed.
    async fn replace_idle(&self) -> Result<(), JobError>;

    async fn resize_space(&self) -> Result<(), JobError>;

    /// Long-running idle space filler. Returning ends one run.
    async fn space_management(&self) -> Result<(), JobError>;

    /// Dial the configured bootstrap peers.
    async fn connect_bootstrap(&self, peers: &[String]) -> Result<(), JobError>;
}

/// Source of peers found on the network.
#[async_trait]
pub trait PeerDiscovery: Send + Sync {
    /// The next discovered peer; `None` once the source has closed.
    async fn next_peer(&self) -> Option<PeerRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::tests::SAMPLE_PKCS1;

    fn challenge_job() -> ChallengeJob {
        ChallengeJob {
            block_height: BlockHeight::new(10),
            expiration: BlockHeight::new(50),
            window: ChallengeInfo::default(),
            snapshot: MinerSnapshot {
                miner: AccountId::new([1; 32]),
                idle_space: 0,
                service_space: 0,
                idle_submitted: false,
                service_submitted: false,
            },
            key: Arc::new(VerificationKey::from_der(SAMPLE_PKCS1.to_vec()).unwrap()),
        }
    }

    #[test]
    fn verify_results_share_the_proof_slot() {
        let job = challenge_job();
        let verify = VerifyResultJob {
            block_height: job.block_height,
            verify_expiration: BlockHeight::new(80),
            verifier: AccountId::new([2; 32]),
            window: job.window.clone(),
            snapshot: job.snapshot.clone(),
            key: job.key.clone(),
        };
        for kind in [ProofKind::Idle, ProofKind::Service] {
            assert_eq!(
                Job::proof(kind, job.clone()).slot(),
                Job::verify_result(kind, verify.clone()).slot()
            );
            assert_eq!(Job::proof(kind, job.clone()).slot(), TaskKind::for_proof(kind));
        }
    }

    #[test]
    fn deadlines_only_for_challenge_work() {
        let job = Job::IdleProof(challenge_job());
        assert_eq!(
            job.deadline(),
            Some((BlockHeight::new(10), BlockHeight::new(50)))
        );
        assert_eq!(Job::CalcTag.deadline(), None);
        assert_eq!(Job::SpaceManagement.name(), "space_management");
    }
}
