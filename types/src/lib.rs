//! Fundamental types for the Strata storage miner.
//!
//! This crate defines the plain data shared across the workspace: block
//! heights, chain accounts, peer records, challenge windows and the
//! chain-derived miner status. Nothing in here talks to the network.

pub mod account;
pub mod challenge;
pub mod error;
pub mod height;
pub mod miner;
pub mod peer;

pub use account::AccountId;
pub use challenge::{ChallengeInfo, ChallengeWindow, MinerSnapshot, ProofKind, UnverifiedProof};
pub use error::TypesError;
pub use height::BlockHeight;
pub use miner::{MinerInfo, MinerState, VerifierWorker};
pub use multiaddr::Multiaddr;
pub use peer::PeerRecord;
