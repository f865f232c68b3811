//! The top-level scheduler.
//!
//! Two phases. **Bootstrapping** fetches the network's verification key,
//! retrying every block interval for as long as it takes. **Steady** is a
//! single `select!` over three timers (challenge, status, maintenance), the
//! completion of the two continuous jobs, and shutdown. No task-level error
//! ends the loop; only shutdown does.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument};

use strata_types::{AccountId, MinerInfo};

use crate::chain::ChainClient;
use crate::config::Schedule;
use crate::discovery::DiscoveryService;
use crate::dispatcher::Dispatcher;
use crate::error::NodeError;
use crate::jobs::{Job, PeerDiscovery, TaskRunner};
use crate::key::VerificationKey;
use crate::metrics::NodeMetrics;
use crate::peer_registry::PeerRegistry;
use crate::poller::{ChallengePoller, TickOutcome};
use crate::shutdown::ShutdownController;
use crate::slot::{SlotSet, TaskKind};
use crate::tracing_spans::bootstrap_span;
use crate::verifier_registry::VerifierRegistry;

/// Lifecycle phase of the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Bootstrapping,
    Steady,
    Stopped,
}

/// Published on every phase change and status sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeStatus {
    pub phase: Phase,
    /// Failed key fetches so far.
    pub bootstrap_failures: u32,
    /// Last successfully synced on-chain record of this miner.
    pub miner: Option<MinerInfo>,
}

/// The external collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainClient>,
    pub runner: Arc<dyn TaskRunner>,
    pub discovery: Arc<dyn PeerDiscovery>,
}

/// Shared state the orchestrator's jobs read and write.
#[derive(Clone)]
pub struct Registries {
    pub peers: Arc<PeerRegistry>,
    pub verifiers: Arc<VerifierRegistry>,
}

pub struct Orchestrator {
    account: AccountId,
    schedule: Schedule,
    bootstrap_peers: Vec<String>,
    chain: Arc<dyn ChainClient>,
    registries: Registries,
    discovery: Arc<DiscoveryService>,
    dispatcher: Dispatcher,
    metrics: Arc<NodeMetrics>,
    status: watch::Sender<NodeStatus>,
}

impl Orchestrator {
    pub fn new(
        account: AccountId,
        schedule: Schedule,
        bootstrap_peers: Vec<String>,
        collaborators: Collaborators,
        registries: Registries,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        let discovery = DiscoveryService::new(
            collaborators.discovery,
            Arc::clone(&collaborators.chain),
            Arc::clone(&registries.peers),
            Arc::clone(&registries.verifiers),
            Arc::clone(&metrics),
        )
        .with_intervals(schedule.discovery_refresh, schedule.peer_persist);
        let dispatcher = Dispatcher::new(
            Arc::new(SlotSet::new()),
            collaborators.runner,
            Arc::clone(&metrics),
        );
        let (status, _) = watch::channel(NodeStatus {
            phase: Phase::Bootstrapping,
            bootstrap_failures: 0,
            miner: None,
        });
        Self {
            account,
            schedule,
            bootstrap_peers,
            chain: collaborators.chain,
            registries,
            discovery: Arc::new(discovery),
            dispatcher,
            metrics,
            status,
        }
    }

    /// Watch phase changes and status syncs.
    pub fn status(&self) -> watch::Receiver<NodeStatus> {
        self.status.subscribe()
    }

    pub fn slots(&self) -> Arc<SlotSet> {
        Arc::clone(self.dispatcher.slots())
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, shutdown: Arc<ShutdownController>) {
        let mut stop = shutdown.subscribe();
        if shutdown.is_triggered() {
            self.set_phase(Phase::Stopped);
            return;
        }
        let key = match self.bootstrap(&mut stop).instrument(bootstrap_span()).await {
            Some(key) => key,
            None => {
                info!("shutdown during bootstrap");
                self.set_phase(Phase::Stopped);
                return;
            }
        };
        self.steady(key, &shutdown, &mut stop).await;
        self.set_phase(Phase::Stopped);
        info!("orchestrator stopped");
    }

    /// Fetch and install the verification key, retrying until it succeeds.
    ///
    /// Returns `None` only if shutdown fires first.
    async fn bootstrap(&self, stop: &mut broadcast::Receiver<()>) -> Option<Arc<VerificationKey>> {
        loop {
            match self.fetch_key().await {
                Ok(key) => {
                    info!(bits = key.bits(), "verification key installed");
                    return Some(Arc::new(key));
                }
                Err(e) => {
                    self.status.send_modify(|s| s.bootstrap_failures += 1);
                    warn!(
                        error = %e,
                        retry_in = ?self.schedule.block_interval,
                        "verification key unavailable"
                    );
                }
            }
            tokio::select! {
                _ = stop.recv() => return None,
                _ = tokio::time::sleep(self.schedule.block_interval) => {}
            }
        }
    }

    async fn fetch_key(&self) -> Result<VerificationKey, NodeError> {
        let der = self.chain.verification_public_key().await?;
        Ok(VerificationKey::from_der(der)?)
    }

    async fn steady(
        &self,
        key: Arc<VerificationKey>,
        shutdown: &ShutdownController,
        stop: &mut broadcast::Receiver<()>,
    ) {
        let poller = ChallengePoller::new(
            self.account,
            Arc::clone(&self.chain),
            Arc::clone(&self.registries.verifiers),
            key,
            Arc::clone(&self.metrics),
        );
        let s = self.schedule;
        let mut challenge = ticker(s.challenge_tick);
        let mut status = ticker(s.status_tick);
        let mut maintenance = ticker(s.maintenance_tick);

        let mut space = self.launch_space_management(false);
        let mut discovery = self.launch_discovery(shutdown, false);
        self.sync_status().await;
        self.set_phase(Phase::Steady);
        info!(account = %self.account, "node running");

        loop {
            tokio::select! {
                _ = stop.recv() => break,
                _ = challenge.tick() => {
                    let report = poller.tick(&self.dispatcher).await;
                    match report.outcome {
                        TickOutcome::Completed | TickOutcome::NoChallenge => {
                            debug!(outcome = ?report.outcome, dispatched = ?report.dispatched, "challenge tick done")
                        }
                        outcome => debug!(?outcome, "challenge tick cut short"),
                    }
                }
                _ = status.tick() => {
                    self.sync_status().await;
                    for job in [Job::ReportFiles, Job::CalcTag, Job::ReplaceIdle] {
                        self.dispatcher.dispatch(job);
                    }
                    if space.is_none() {
                        space = self.launch_space_management(true);
                    }
                    if discovery.is_none() {
                        discovery = self.launch_discovery(shutdown, true);
                    }
                }
                _ = maintenance.tick() => {
                    if let Err(e) = self
                        .dispatcher
                        .runner()
                        .connect_bootstrap(&self.bootstrap_peers)
                        .await
                    {
                        warn!(error = %e, "bootstrap reconnect failed");
                    }
                    self.dispatcher.dispatch(Job::ResizeSpace);
                }
                res = join_continuous(&mut space) => {
                    report_exit(TaskKind::SpaceManagement, res);
                    space = self.launch_space_management(true);
                }
                res = join_continuous(&mut discovery) => {
                    report_exit(TaskKind::Discovery, res);
                    discovery = self.launch_discovery(shutdown, true);
                }
            }
        }

        let running: Vec<_> = [space, discovery].into_iter().flatten().collect();
        for handle in &running {
            handle.abort();
        }
        // An aborted task finishes whatever synchronous step it is in first.
        for handle in running {
            let _ = handle.await;
        }
    }

    fn launch_space_management(&self, relaunch: bool) -> Option<JoinHandle<()>> {
        let delay = if relaunch {
            self.schedule.restart_delay
        } else {
            std::time::Duration::ZERO
        };
        let handle = self.dispatcher.dispatch_after(Job::SpaceManagement, delay);
        if handle.is_none() {
            warn!("space management slot still held, retrying on next status tick");
        }
        handle
    }

    fn launch_discovery(&self, shutdown: &ShutdownController, relaunch: bool) -> Option<JoinHandle<()>> {
        let delay = if relaunch {
            self.schedule.restart_delay
        } else {
            std::time::Duration::ZERO
        };
        let run = Arc::clone(&self.discovery).run(shutdown.subscribe());
        let handle = self.dispatcher.spawn_with(TaskKind::Discovery, delay, run);
        if handle.is_none() {
            warn!("discovery slot still held, retrying on next status tick");
        }
        handle
    }

    /// Refresh the chain-derived miner status.
    async fn sync_status(&self) {
        self.metrics.known_peers.set(self.registries.peers.len() as i64);
        match self.chain.miner_info(&self.account).await {
            Ok(info) => {
                debug!(state = info.state.as_str(), "miner status synced");
                self.status.send_modify(|s| s.miner = Some(info));
            }
            Err(e) => {
                self.metrics.chain_errors.with_label_values(&["miner_info"]).inc();
                warn!(error = %e, "miner status sync failed");
            }
        }
    }

    fn set_phase(&self, phase: Phase) {
        self.status.send_modify(|s| s.phase = phase);
    }
}

/// A ticker whose first tick fires one period from now.
fn ticker(period: std::time::Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Resolve when the continuous job behind `handle` ends, clearing it.
/// Never resolves while no job is running.
async fn join_continuous(handle: &mut Option<JoinHandle<()>>) -> Result<(), JoinError> {
    let res = match handle {
        Some(h) => h.await,
        None => std::future::pending().await,
    };
    *handle = None;
    res
}

fn report_exit(kind: TaskKind, res: Result<(), JoinError>) {
    match res {
        Ok(()) => info!(job = %kind, "continuous job returned, relaunching"),
        Err(e) if e.is_panic() => error!(job = %kind, "continuous job panicked, relaunching"),
        Err(e) => warn!(job = %kind, error = %e, "continuous job ended, relaunching"),
    }
}
