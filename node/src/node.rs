//! The storage node facade: wires registries, metrics and the orchestrator
//! together and owns their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use strata_types::AccountId;
use strata_utils::format_block_span;

use crate::chain::StakingClient;
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::orchestrator::{Collaborators, NodeStatus, Orchestrator, Registries};
use crate::peer_registry::PeerRegistry;
use crate::shutdown::ShutdownController;
use crate::slot::SlotSet;
use crate::verifier_registry::VerifierRegistry;
use crate::withdraw::{self, WithdrawError};

pub struct StorageNode {
    config: NodeConfig,
    account: AccountId,
    collaborators: Collaborators,
    registries: Registries,
    metrics: Arc<NodeMetrics>,
    shutdown: Arc<ShutdownController>,
    status: Option<watch::Receiver<NodeStatus>>,
    slots: Option<Arc<SlotSet>>,
    task: Option<JoinHandle<()>>,
    started: bool,
}

impl StorageNode {
    /// Build a node; nothing runs until [`start`](Self::start).
    pub fn new(config: NodeConfig, collaborators: Collaborators) -> Result<Self, NodeError> {
        config.validate()?;
        let account = config.account_id()?;
        let registries = Registries {
            peers: Arc::new(PeerRegistry::new(config.peers_path())),
            verifiers: Arc::new(VerifierRegistry::new()),
        };
        Ok(Self {
            config,
            account,
            collaborators,
            registries,
            metrics: Arc::new(NodeMetrics::new()),
            shutdown: Arc::new(ShutdownController::new()),
            status: None,
            slots: None,
            task: None,
            started: false,
        })
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn peers(&self) -> &Arc<PeerRegistry> {
        &self.registries.peers
    }

    pub fn verifiers(&self) -> &Arc<VerifierRegistry> {
        &self.registries.verifiers
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    /// Handle for triggering shutdown from elsewhere (e.g. a signal task).
    pub fn shutdown_handle(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Status watch; `None` before [`start`](Self::start).
    pub fn status(&self) -> Option<watch::Receiver<NodeStatus>> {
        self.status.clone()
    }

    /// The orchestrator's slots; `None` before [`start`](Self::start).
    pub fn slots(&self) -> Option<Arc<SlotSet>> {
        self.slots.clone()
    }

    /// Restore the peer book and spawn the orchestrator.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        if self.started {
            return Err(NodeError::AlreadyStarted);
        }
        tracing::info!(
            account = %self.account,
            workspace = %self.config.workspace.display(),
            "storage node starting"
        );
        std::fs::create_dir_all(&self.config.workspace)?;
        self.restore_peers();

        let orchestrator = Orchestrator::new(
            self.account,
            self.config.schedule(),
            self.config.bootstrap_peers.clone(),
            self.collaborators.clone(),
            self.registries.clone(),
            Arc::clone(&self.metrics),
        );
        self.status = Some(orchestrator.status());
        self.slots = Some(orchestrator.slots());
        self.task = Some(tokio::spawn(orchestrator.run(Arc::clone(&self.shutdown))));
        self.started = true;
        Ok(())
    }

    /// Load and prune the persisted peer book. Failures leave it in memory only.
    fn restore_peers(&self) {
        let peers = &self.registries.peers;
        match peers.load() {
            Ok(count) => tracing::info!(peers = count, "peer registry loaded"),
            Err(e) if e.is_missing_file() => {
                tracing::info!(path = %peers.path().display(), "no peer file yet, starting empty")
            }
            Err(e) => tracing::warn!(error = %e, "peer file unreadable, starting in memory"),
        }
        let outcome = peers.prune_intranet_addresses();
        if outcome.removed > 0 {
            tracing::info!(removed = outcome.removed, "pruned peers without public addresses");
        }
        self.metrics.known_peers.set(peers.len() as i64);
    }

    /// Stop the orchestrator and persist the peer book.
    ///
    /// The peer book is persisted even if the orchestrator misses the
    /// shutdown timeout; the timeout is then reported as the error.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("storage node stopping");
        self.shutdown.shutdown();

        let mut timed_out = false;
        if let Some(task) = self.task.take() {
            let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "orchestrator task failed"),
                Err(_) => {
                    tracing::warn!(?timeout, "orchestrator did not stop in time");
                    timed_out = true;
                }
            }
        }

        let count = self.registries.peers.persist()?;
        tracing::info!(peers = count, "storage node stopped");
        if timed_out {
            return Err(NodeError::ShutdownTimeout);
        }
        Ok(())
    }

    /// Withdraw this node's collateral using the configured cooldown.
    pub async fn withdraw(&self, client: &dyn StakingClient) -> Result<String, NodeError> {
        let cooldown = self.config.withdraw_cooldown_blocks;
        match withdraw::withdraw(client, &self.account, cooldown).await {
            Ok(tx) => Ok(tx),
            Err(WithdrawError::Cooldown { remaining }) => {
                tracing::info!(
                    remaining_blocks = remaining,
                    wait = %format_block_span(remaining, self.config.block_interval_secs),
                    "withdrawal still cooling down"
                );
                Err(WithdrawError::Cooldown { remaining }.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
