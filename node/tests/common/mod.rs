//! Shared harness for orchestrator-level tests.
#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use strata_node::{
    Collaborators, NodeMetrics, NodeStatus, Orchestrator, PeerRegistry, Phase, Registries,
    Schedule, ShutdownController, SlotSet, VerifierRegistry,
};
use strata_nullables::{NullChain, NullPeerDiscovery, NullTaskRunner};
use strata_types::{
    AccountId, ChallengeInfo, ChallengeWindow, MinerSnapshot, Multiaddr, PeerRecord,
    UnverifiedProof, VerifierWorker,
};

pub const BOOTSTRAP_PEER: &str = "/ip4/8.8.4.4/tcp/4001/p2p/boot";

pub fn own_account() -> AccountId {
    AccountId::new([7; 32])
}

pub fn account(seed: u8) -> AccountId {
    AccountId::new([seed; 32])
}

pub fn snapshot(miner: AccountId, idle_submitted: bool, service_submitted: bool) -> MinerSnapshot {
    MinerSnapshot {
        miner,
        idle_space: 1 << 30,
        service_space: 1 << 20,
        idle_submitted,
        service_submitted,
    }
}

pub fn window(snapshots: Vec<MinerSnapshot>) -> ChallengeWindow {
    ChallengeWindow {
        info: ChallengeInfo {
            start: strata_types::BlockHeight::new(90),
            random_index_count: 8,
        },
        snapshots,
    }
}

pub fn unverified(miner: AccountId) -> UnverifiedProof {
    UnverifiedProof {
        snapshot: snapshot(miner, true, true),
        proof: vec![0xaa; 4],
    }
}

pub fn worker(seed: u8) -> VerifierWorker {
    VerifierWorker {
        account: account(seed).to_hex(),
        identity: vec![seed; 4],
    }
}

pub fn addr(s: &str) -> Multiaddr {
    s.parse().expect("valid multiaddr")
}

pub fn peer(id: &str, addrs: &[&str]) -> PeerRecord {
    PeerRecord::new(id, addrs.iter().map(|a| addr(a)).collect())
}

pub struct Harness {
    pub chain: Arc<NullChain>,
    pub runner: Arc<NullTaskRunner>,
    pub discovery: Arc<NullPeerDiscovery>,
    pub peers: Arc<PeerRegistry>,
    pub verifiers: Arc<VerifierRegistry>,
    pub metrics: Arc<NodeMetrics>,
    pub shutdown: Arc<ShutdownController>,
    pub schedule: Schedule,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        Self {
            chain: Arc::new(NullChain::new()),
            runner: Arc::new(NullTaskRunner::new()),
            discovery: Arc::new(NullPeerDiscovery::new()),
            peers: Arc::new(PeerRegistry::new(dir.path().join("peers"))),
            verifiers: Arc::new(VerifierRegistry::new()),
            metrics: Arc::new(NodeMetrics::new()),
            shutdown: Arc::new(ShutdownController::new()),
            schedule: Schedule::default(),
            dir,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            chain: self.chain.clone(),
            runner: self.runner.clone(),
            discovery: self.discovery.clone(),
        }
    }

    /// Spawn an orchestrator over this harness.
    pub fn spawn(&self) -> Running {
        let orchestrator = Orchestrator::new(
            own_account(),
            self.schedule,
            vec![BOOTSTRAP_PEER.to_string()],
            self.collaborators(),
            Registries {
                peers: Arc::clone(&self.peers),
                verifiers: Arc::clone(&self.verifiers),
            },
            Arc::clone(&self.metrics),
        );
        let status = orchestrator.status();
        let slots = orchestrator.slots();
        let task = tokio::spawn(orchestrator.run(Arc::clone(&self.shutdown)));
        Running { status, slots, task }
    }
}

pub struct Running {
    pub status: watch::Receiver<NodeStatus>,
    pub slots: Arc<SlotSet>,
    pub task: JoinHandle<()>,
}

impl Running {
    pub async fn wait_for_phase(&mut self, phase: Phase) -> NodeStatus {
        self.status
            .wait_for(|s| s.phase == phase)
            .await
            .expect("orchestrator dropped its status")
            .clone()
    }
}

/// Let spawned tasks run without advancing the clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
