//! The continuous discovery job.
//!
//! Feeds newly found peers into the peer registry, keeps the verifier
//! registry in step with the chain, and periodically prunes and persists
//! the peer book. The orchestrator relaunches it whenever it returns.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use strata_types::PeerRecord;

use crate::chain::{ChainClient, ChainError};
use crate::jobs::{JobError, PeerDiscovery};
use crate::metrics::NodeMetrics;
use crate::peer_registry::PeerRegistry;
use crate::verifier_registry::VerifierRegistry;

pub struct DiscoveryService {
    source: Arc<dyn PeerDiscovery>,
    chain: Arc<dyn ChainClient>,
    peers: Arc<PeerRegistry>,
    verifiers: Arc<VerifierRegistry>,
    metrics: Arc<NodeMetrics>,
    refresh_every: Duration,
    persist_every: Duration,
}

impl DiscoveryService {
    pub fn new(
        source: Arc<dyn PeerDiscovery>,
        chain: Arc<dyn ChainClient>,
        peers: Arc<PeerRegistry>,
        verifiers: Arc<VerifierRegistry>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            source,
            chain,
            peers,
            verifiers,
            metrics,
            refresh_every: Duration::from_secs(60),
            persist_every: Duration::from_secs(600),
        }
    }

    pub fn with_intervals(mut self, refresh_every: Duration, persist_every: Duration) -> Self {
        self.refresh_every = refresh_every;
        self.persist_every = persist_every;
        self
    }

    /// Run until the discovery source closes or shutdown fires.
    ///
    /// The verifier registry is refreshed once on entry and then every
    /// refresh interval. [`PeerDiscovery::next_peer`] must be cancel-safe:
    /// a pending call is dropped whenever a timer fires first.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> Result<(), JobError> {
        self.refresh_verifiers().await;
        let mut refresh = interval_at(Instant::now() + self.refresh_every, self.refresh_every);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut persist = interval_at(Instant::now() + self.persist_every, self.persist_every);
        persist.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("discovery stopping on shutdown");
                    return Ok(());
                }
                _ = refresh.tick() => self.refresh_verifiers().await,
                _ = persist.tick() => self.prune_and_persist(),
                found = self.source.next_peer() => match found {
                    Some(record) => self.record_peer(record),
                    None => {
                        info!(known_peers = self.peers.len(), "discovery source closed");
                        return Ok(());
                    }
                },
            }
        }
    }

    fn record_peer(&self, record: PeerRecord) {
        let id = record.id.clone();
        if self.peers.save(&id, record) {
            debug!(peer = %id, "peer recorded");
            self.metrics.known_peers.set(self.peers.len() as i64);
        }
    }

    /// Upsert every worker the chain currently lists.
    ///
    /// Workers missing from the listing stay registered; an empty or
    /// `NotFound` answer changes nothing.
    pub async fn refresh_verifiers(&self) {
        let workers = match self.chain.verifier_workers().await {
            Ok(workers) => workers,
            Err(ChainError::NotFound) => {
                debug!("no verifier workers listed");
                return;
            }
            Err(e) => {
                self.metrics.chain_errors.with_label_values(&["verifier_workers"]).inc();
                warn!(error = %e, "verifier refresh failed, keeping previous list");
                return;
            }
        };
        let listed = workers.len();
        for worker in workers {
            self.verifiers.save(&worker.account, worker.identity);
        }
        let known = self.verifiers.len();
        self.metrics.known_verifiers.set(known as i64);
        debug!(listed, known, "verifier registry refreshed");
    }

    /// Drop intranet addresses and write the peer book to disk.
    pub fn prune_and_persist(&self) {
        let outcome = self.peers.prune_intranet_addresses();
        self.metrics.known_peers.set(self.peers.len() as i64);
        match self.peers.persist() {
            Ok(count) => debug!(
                peers = count,
                removed = outcome.removed,
                path = %self.peers.path().display(),
                "peer registry persisted"
            ),
            Err(e) => warn!(error = %e, path = %self.peers.path().display(), "peer persist failed"),
        }
    }
}
