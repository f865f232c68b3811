//! The fast challenge tick.
//!
//! One tick reads the active challenge window, launches this node's
//! outstanding proof jobs, then scans the verifying workers for proofs of
//! this node still awaiting verification and launches the matching
//! verify-result jobs. Every launch is slot-gated through the
//! [`Dispatcher`]; a busy slot simply means the work is already running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};

use strata_types::{AccountId, BlockHeight, ChallengeWindow, MinerSnapshot, ProofKind};

use crate::chain::{unverified_proofs, ChainClient, ChainError};
use crate::dispatcher::Dispatcher;
use crate::jobs::{ChallengeJob, Job, VerifyResultJob};
use crate::key::VerificationKey;
use crate::logging::challenge_error;
use crate::metrics::NodeMetrics;
use crate::slot::TaskKind;
use crate::tracing_spans::challenge_tick_span;
use crate::verifier_registry::VerifierRegistry;

/// How a tick ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// All steps ran.
    Completed,
    /// The chain connection could not be (re)established.
    Disconnected,
    /// No challenge is active; nothing to do.
    NoChallenge,
    /// The challenge window query failed.
    WindowUnavailable,
    /// Pending verifications were found but their deadline could not be read.
    VerifyDeadlineUnavailable,
}

/// What one tick saw and did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    /// This node appears in the challenge window.
    pub own_entry: bool,
    /// The proof deadline query failed, so no proof job was launched.
    pub proof_deadline_failed: bool,
    /// Worker holding this node's unverified idle proof, if any.
    pub pending_idle: Option<AccountId>,
    /// Worker holding this node's unverified service proof, if any.
    pub pending_service: Option<AccountId>,
    /// Names of the jobs launched this tick.
    pub dispatched: Vec<&'static str>,
}

impl TickReport {
    fn new() -> Self {
        Self {
            outcome: TickOutcome::Completed,
            own_entry: false,
            proof_deadline_failed: false,
            pending_idle: None,
            pending_service: None,
            dispatched: Vec::new(),
        }
    }

    fn ended(mut self, outcome: TickOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// A proof of this node found in some worker's unverified queue.
struct PendingVerification {
    verifier: AccountId,
    snapshot: MinerSnapshot,
}

pub struct ChallengePoller {
    account: AccountId,
    chain: Arc<dyn ChainClient>,
    verifiers: Arc<VerifierRegistry>,
    key: Arc<VerificationKey>,
    metrics: Arc<NodeMetrics>,
    ticks: AtomicU64,
}

impl ChallengePoller {
    pub fn new(
        account: AccountId,
        chain: Arc<dyn ChainClient>,
        verifiers: Arc<VerifierRegistry>,
        key: Arc<VerificationKey>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            account,
            chain,
            verifiers,
            key,
            metrics,
            ticks: AtomicU64::new(0),
        }
    }

    /// Run one challenge tick, launching jobs through `dispatcher`.
    pub async fn tick(&self, dispatcher: &Dispatcher) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics.challenge_ticks.inc();
        self.run_tick(dispatcher)
            .instrument(challenge_tick_span(tick))
            .await
    }

    async fn run_tick(&self, dispatcher: &Dispatcher) -> TickReport {
        let mut report = TickReport::new();

        if let Err(e) = self.chain.ensure_connected().await {
            self.count_error("ensure_connected");
            warn!(error = %e, "chain connection unavailable, skipping tick");
            return report.ended(TickOutcome::Disconnected);
        }

        let window = match self.chain.challenge_window().await {
            Ok(window) => window,
            Err(ChainError::NotFound) => {
                debug!("no active challenge");
                return report.ended(TickOutcome::NoChallenge);
            }
            Err(e) => {
                self.both_failed("challenge_window", &e);
                return report.ended(TickOutcome::WindowUnavailable);
            }
        };

        self.launch_proofs(dispatcher, &window, &mut report).await;

        let (pending_idle, pending_service) = self.scan_verifiers().await;
        report.pending_idle = pending_idle.as_ref().map(|p| p.verifier);
        report.pending_service = pending_service.as_ref().map(|p| p.verifier);
        if pending_idle.is_none() && pending_service.is_none() {
            return report;
        }

        let (block_height, verify_expiration) = match self.verify_deadline().await {
            Ok(pair) => pair,
            Err((query, e)) => {
                self.both_failed(query, &e);
                return report.ended(TickOutcome::VerifyDeadlineUnavailable);
            }
        };
        for (kind, pending) in [
            (ProofKind::Idle, pending_idle),
            (ProofKind::Service, pending_service),
        ] {
            let Some(pending) = pending else { continue };
            let job = Job::verify_result(
                kind,
                VerifyResultJob {
                    block_height,
                    verify_expiration,
                    verifier: pending.verifier,
                    window: window.info.clone(),
                    snapshot: pending.snapshot,
                    key: Arc::clone(&self.key),
                },
            );
            self.launch(dispatcher, job, &mut report);
        }
        report
    }

    /// Steps for this node's own entry: launch each unsubmitted proof.
    async fn launch_proofs(
        &self,
        dispatcher: &Dispatcher,
        window: &ChallengeWindow,
        report: &mut TickReport,
    ) {
        let Some(own) = window.snapshot_for(&self.account) else {
            return;
        };
        report.own_entry = true;
        let wanted: Vec<ProofKind> = [ProofKind::Idle, ProofKind::Service]
            .into_iter()
            .filter(|&kind| !own.submitted(kind))
            .filter(|&kind| dispatcher.is_free(TaskKind::for_proof(kind)))
            .collect();
        if wanted.is_empty() {
            return;
        }
        info!(kinds = wanted.len(), "found unsubmitted proofs");

        let block_height = match self.chain.block_height().await {
            Ok(h) => h,
            Err(e) => {
                self.both_failed("block_height", &e);
                report.proof_deadline_failed = true;
                return;
            }
        };
        let expiration = match self.chain.challenge_expiration().await {
            Ok(h) => h,
            Err(e) => {
                self.both_failed("challenge_expiration", &e);
                report.proof_deadline_failed = true;
                return;
            }
        };
        for kind in wanted {
            let job = Job::proof(
                kind,
                ChallengeJob {
                    block_height,
                    expiration,
                    window: window.info.clone(),
                    snapshot: own.clone(),
                    key: Arc::clone(&self.key),
                },
            );
            self.launch(dispatcher, job, report);
        }
    }

    /// Scan the verifying workers for this node's unverified proofs.
    ///
    /// The first worker found holding each kind wins; the scan ends as soon
    /// as both kinds are found. Unparseable accounts and failed queries skip
    /// only that worker and kind.
    async fn scan_verifiers(&self) -> (Option<PendingVerification>, Option<PendingVerification>) {
        let mut idle = None;
        let mut service = None;
        for account in self.verifiers.list_accounts() {
            if idle.is_some() && service.is_some() {
                break;
            }
            let Ok(verifier) = account.parse::<AccountId>() else {
                continue;
            };
            if idle.is_none() {
                idle = self.pending_at(ProofKind::Idle, verifier).await;
            }
            if service.is_none() {
                service = self.pending_at(ProofKind::Service, verifier).await;
            }
        }
        (idle, service)
    }

    async fn pending_at(&self, kind: ProofKind, verifier: AccountId) -> Option<PendingVerification> {
        let proofs = match unverified_proofs(self.chain.as_ref(), kind, &verifier).await {
            Ok(proofs) => proofs,
            Err(ChainError::NotFound) => return None,
            Err(e) => {
                self.count_error(query_name(kind));
                debug!(verifier = %verifier, kind = %kind, error = %e, "unverified proof query failed");
                return None;
            }
        };
        let found = proofs.into_iter().find(|p| p.snapshot.miner == self.account)?;
        info!(verifier = %verifier, kind = %kind, "found unverified proof");
        Some(PendingVerification {
            verifier,
            snapshot: found.snapshot,
        })
    }

    async fn verify_deadline(&self) -> Result<(BlockHeight, BlockHeight), (&'static str, ChainError)> {
        let height = self
            .chain
            .block_height()
            .await
            .map_err(|e| ("block_height", e))?;
        let deadline = self
            .chain
            .challenge_verify_expiration()
            .await
            .map_err(|e| ("challenge_verify_expiration", e))?;
        Ok((height, deadline))
    }

    fn launch(&self, dispatcher: &Dispatcher, job: Job, report: &mut TickReport) {
        let name = job.name();
        if dispatcher.dispatch(job).is_some() {
            info!(job = name, "launched");
            report.dispatched.push(name);
        }
    }

    fn both_failed(&self, query: &'static str, error: &ChainError) {
        self.count_error(query);
        challenge_error(ProofKind::Idle, query, error);
        challenge_error(ProofKind::Service, query, error);
    }

    fn count_error(&self, query: &str) {
        self.metrics.chain_errors.with_label_values(&[query]).inc();
    }
}

fn query_name(kind: ProofKind) -> &'static str {
    match kind {
        ProofKind::Idle => "unverified_idle_proofs",
        ProofKind::Service => "unverified_service_proofs",
    }
}
