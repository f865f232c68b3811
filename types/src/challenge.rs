//! Challenge windows and proof bookkeeping reported by the chain.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AccountId, BlockHeight};

/// The two kinds of storage proof a miner owes the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofKind {
    /// Proof over committed idle space.
    Idle,
    /// Proof over stored customer data.
    Service,
}

impl ProofKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-miner entry of a challenge window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerSnapshot {
    pub miner: AccountId,
    pub idle_space: u128,
    pub service_space: u128,
    pub idle_submitted: bool,
    pub service_submitted: bool,
}

impl MinerSnapshot {
    /// Whether the proof of `kind` has already been submitted in this window.
    pub fn submitted(&self, kind: ProofKind) -> bool {
        match kind {
            ProofKind::Idle => self.idle_submitted,
            ProofKind::Service => self.service_submitted,
        }
    }
}

/// Window-wide challenge parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeInfo {
    /// Height at which the window opened.
    pub start: BlockHeight,
    /// Number of random indices the proof must cover.
    pub random_index_count: u32,
}

/// The currently active challenge epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeWindow {
    pub info: ChallengeInfo,
    pub snapshots: Vec<MinerSnapshot>,
}

impl ChallengeWindow {
    /// This miner's entry, if it was challenged in this window.
    pub fn snapshot_for(&self, miner: &AccountId) -> Option<&MinerSnapshot> {
        self.snapshots.iter().find(|s| &s.miner == miner)
    }
}

/// A submitted proof still waiting in a verifying worker's queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnverifiedProof {
    pub snapshot: MinerSnapshot,
    #[serde(default)]
    pub proof: Vec<u8>,
}
