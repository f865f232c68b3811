//! The chain seam: everything the core asks the blockchain.
//!
//! The RPC client and its wire protocol live outside this crate; the core
//! only sees [`ChainClient`]. Every query either yields a value, the
//! distinguished [`ChainError::NotFound`] (nothing there, not a failure),
//! or a hard error that the caller retries on its next tick.

use async_trait::async_trait;
use thiserror::Error;

use strata_types::{
    AccountId, BlockHeight, ChallengeWindow, MinerInfo, ProofKind, UnverifiedProof,
    VerifierWorker,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The queried entry does not exist. Callers treat this as an empty result.
    #[error("not found")]
    NotFound,

    #[error("rpc connection unavailable: {0}")]
    Connection(String),

    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("failed to decode chain data: {0}")]
    Decode(String),

    /// A transaction was broadcast but its inclusion was not observed.
    #[error("transaction {tx_hash} submitted but not confirmed")]
    Unconfirmed { tx_hash: String },
}

/// Read access to chain state needed by the orchestrator and its jobs.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Reconnect if the RPC connection dropped. Cheap when already connected.
    async fn ensure_connected(&self) -> Result<(), ChainError>;

    async fn block_height(&self) -> Result<BlockHeight, ChainError>;

    /// The active challenge window; `NotFound` when no challenge is running.
    async fn challenge_window(&self) -> Result<ChallengeWindow, ChainError>;

    /// Height by which challenged miners must submit their proofs.
    async fn challenge_expiration(&self) -> Result<BlockHeight, ChainError>;

    /// Height by which submitted proofs must be verified.
    async fn challenge_verify_expiration(&self) -> Result<BlockHeight, ChainError>;

    async fn unverified_idle_proofs(
        &self,
        verifier: &AccountId,
    ) -> Result<Vec<UnverifiedProof>, ChainError>;

    async fn unverified_service_proofs(
        &self,
        verifier: &AccountId,
    ) -> Result<Vec<UnverifiedProof>, ChainError>;

    /// DER-encoded public key used to verify proof tags.
    async fn verification_public_key(&self) -> Result<Vec<u8>, ChainError>;

    async fn miner_info(&self, account: &AccountId) -> Result<MinerInfo, ChainError>;

    /// Verifying workers currently registered on chain.
    async fn verifier_workers(&self) -> Result<Vec<VerifierWorker>, ChainError>;
}

/// Staking operations used by the withdrawal flow.
#[async_trait]
pub trait StakingClient: ChainClient {
    /// Height at which `account` requested exit; `NotFound` if it never did.
    async fn exit_height(&self, account: &AccountId) -> Result<BlockHeight, ChainError>;

    /// Withdraw the staked collateral, returning the transaction hash.
    async fn withdraw(&self) -> Result<String, ChainError>;
}

/// Query a verifier's queue of unverified proofs of `kind`.
pub async fn unverified_proofs(
    chain: &dyn ChainClient,
    kind: ProofKind,
    verifier: &AccountId,
) -> Result<Vec<UnverifiedProof>, ChainError> {
    match kind {
        ProofKind::Idle => chain.unverified_idle_proofs(verifier).await,
        ProofKind::Service => chain.unverified_service_proofs(verifier).await,
    }
}
