//! Chain-derived miner status and verifier announcements.

use serde::{Deserialize, Serialize};

/// Registration state of a miner on chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MinerState {
    /// Registered and taking part in challenges.
    Positive,
    /// Collateral below requirement; new storage is not assigned.
    Frozen,
    /// Exit requested; waiting out the cooldown before withdrawal.
    Exit,
    /// Punished and locked.
    Lock,
}

impl MinerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Frozen => "frozen",
            Self::Exit => "exit",
            Self::Lock => "lock",
        }
    }
}

/// Snapshot of this miner's on-chain record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerInfo {
    pub state: MinerState,
    pub idle_space: u128,
    pub service_space: u128,
    pub lock_space: u128,
}

/// A verifying worker as announced on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierWorker {
    /// Chain account of the worker (hex public key).
    pub account: String,
    /// Network identity bytes used to reach the worker.
    pub identity: Vec<u8>,
}
