//! Nullable chain: scripted answers to every chain query.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;

use strata_node::chain::{ChainClient, ChainError, StakingClient};
use strata_types::{
    AccountId, BlockHeight, ChallengeWindow, MinerInfo, MinerState, UnverifiedProof,
    VerifierWorker,
};

/// A 2048-bit RSA public key in PKCS#1 DER, served once scripted keys run out.
pub const TEST_KEY_DER: &[u8] = &[
    0x30, 0x82, 0x01, 0x0a, 0x02, 0x82, 0x01, 0x01, 0x00, 0x85, 0x29, 0x30,
    0xc5, 0x8f, 0x66, 0xe3, 0x01, 0x0b, 0x1f, 0x23, 0x4e, 0xd9, 0xa3, 0xa7,
    0x33, 0x7f, 0xe0, 0xfc, 0x1f, 0x35, 0xb4, 0x6e, 0xda, 0x0d, 0xc4, 0x1c,
    0x6e, 0x2a, 0x04, 0x82, 0x30, 0x43, 0x2a, 0x35, 0xeb, 0xf9, 0xed, 0xa9,
    0xcd, 0xbd, 0xee, 0x29, 0x7e, 0xb4, 0xa3, 0x57, 0x58, 0x76, 0x1a, 0x29,
    0x7b, 0x72, 0x4d, 0x2e, 0xf4, 0x6b, 0x65, 0x36, 0xc9, 0xe4, 0xd5, 0xac,
    0x25, 0xb4, 0x99, 0xeb, 0x62, 0xdf, 0x64, 0xd4, 0x22, 0xe3, 0xfa, 0x71,
    0x28, 0x93, 0xdd, 0x7d, 0xc3, 0xec, 0x5e, 0x0f, 0xb1, 0x11, 0xc4, 0x05,
    0xae, 0x22, 0x61, 0x08, 0xe3, 0x13, 0xa8, 0xc0, 0x01, 0x5e, 0x25, 0x67,
    0x6e, 0x0d, 0x73, 0xe5, 0xd9, 0x2d, 0xe5, 0x08, 0xcd, 0x8d, 0xb4, 0x4a,
    0x69, 0xd8, 0xc6, 0x78, 0x27, 0x3d, 0x0c, 0x88, 0x2f, 0xa1, 0x5c, 0x50,
    0xc6, 0x3b, 0xe2, 0x75, 0x13, 0xe7, 0xe7, 0xb6, 0x21, 0xd6, 0x4b, 0xe2,
    0x6e, 0x7f, 0xaa, 0x6b, 0x87, 0x10, 0x18, 0x0e, 0x45, 0x6f, 0x82, 0x34,
    0x88, 0x3f, 0x32, 0xba, 0x5c, 0x70, 0x08, 0x9d, 0xfe, 0x7b, 0x10, 0x70,
    0xe6, 0x82, 0x9b, 0x03, 0xa8, 0x58, 0x01, 0x05, 0x05, 0xd8, 0x02, 0xa2,
    0x7e, 0xa3, 0x9a, 0xa9, 0x9a, 0x5f, 0x30, 0x1e, 0xa8, 0x18, 0xb2, 0x1a,
    0xc8, 0x84, 0x49, 0xef, 0x02, 0x41, 0xa9, 0x70, 0x2f, 0x46, 0xeb, 0x19,
    0x15, 0x04, 0xf0, 0xc0, 0xff, 0xa5, 0x12, 0xdd, 0x4f, 0xe7, 0x2c, 0xa7,
    0x49, 0xd9, 0x7c, 0x9b, 0xe7, 0xfc, 0x77, 0x35, 0xbf, 0x89, 0xe0, 0x56,
    0x2d, 0xe8, 0xe6, 0x97, 0x4d, 0x7e, 0x8a, 0x25, 0xb0, 0x0f, 0x19, 0xcb,
    0xaf, 0x06, 0x4a, 0xa8, 0xa5, 0x96, 0x9f, 0x31, 0xd9, 0xd9, 0x66, 0xb2,
    0xca, 0xd8, 0x5f, 0x4d, 0x0b, 0x87, 0x45, 0x51, 0xfd, 0x85, 0x5e, 0x60,
    0x41, 0x02, 0x03, 0x01, 0x00, 0x01,
];

struct ChainState {
    connection: Result<(), ChainError>,
    height: Result<BlockHeight, ChainError>,
    window: Result<ChallengeWindow, ChainError>,
    expiration: Result<BlockHeight, ChainError>,
    verify_expiration: Result<BlockHeight, ChainError>,
    idle_queues: HashMap<AccountId, Result<Vec<UnverifiedProof>, ChainError>>,
    service_queues: HashMap<AccountId, Result<Vec<UnverifiedProof>, ChainError>>,
    key_script: VecDeque<Result<Vec<u8>, ChainError>>,
    miner: Result<MinerInfo, ChainError>,
    workers: Result<Vec<VerifierWorker>, ChainError>,
    exit_height: Result<BlockHeight, ChainError>,
    withdrawal: Result<String, ChainError>,
    calls: Vec<&'static str>,
    key_fetches: Vec<Instant>,
}

/// A test chain whose every answer is set by the test.
///
/// Defaults describe a healthy chain with no active challenge: connected,
/// height 100, a valid verification key, a positive miner, no workers.
pub struct NullChain {
    state: Mutex<ChainState>,
}

impl NullChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                connection: Ok(()),
                height: Ok(BlockHeight::new(100)),
                window: Err(ChainError::NotFound),
                expiration: Ok(BlockHeight::new(200)),
                verify_expiration: Ok(BlockHeight::new(300)),
                idle_queues: HashMap::new(),
                service_queues: HashMap::new(),
                key_script: VecDeque::new(),
                miner: Ok(MinerInfo {
                    state: MinerState::Positive,
                    idle_space: 0,
                    service_space: 0,
                    lock_space: 0,
                }),
                workers: Ok(Vec::new()),
                exit_height: Err(ChainError::NotFound),
                withdrawal: Ok("0xfeed".to_string()),
                calls: Vec::new(),
                key_fetches: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: &'static str) -> MutexGuard<'_, ChainState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    pub fn set_connection(&self, result: Result<(), ChainError>) {
        self.state().connection = result;
    }

    pub fn set_height(&self, result: Result<BlockHeight, ChainError>) {
        self.state().height = result;
    }

    pub fn set_window(&self, result: Result<ChallengeWindow, ChainError>) {
        self.state().window = result;
    }

    pub fn set_expiration(&self, result: Result<BlockHeight, ChainError>) {
        self.state().expiration = result;
    }

    pub fn set_verify_expiration(&self, result: Result<BlockHeight, ChainError>) {
        self.state().verify_expiration = result;
    }

    pub fn set_idle_queue(&self, verifier: AccountId, result: Result<Vec<UnverifiedProof>, ChainError>) {
        self.state().idle_queues.insert(verifier, result);
    }

    pub fn set_service_queue(
        &self,
        verifier: AccountId,
        result: Result<Vec<UnverifiedProof>, ChainError>,
    ) {
        self.state().service_queues.insert(verifier, result);
    }

    /// Queue answers for the next key fetches; once drained, the valid
    /// [`TEST_KEY_DER`] is returned.
    pub fn script_key(&self, answers: impl IntoIterator<Item = Result<Vec<u8>, ChainError>>) {
        self.state().key_script.extend(answers);
    }

    pub fn set_miner(&self, result: Result<MinerInfo, ChainError>) {
        self.state().miner = result;
    }

    pub fn set_workers(&self, result: Result<Vec<VerifierWorker>, ChainError>) {
        self.state().workers = result;
    }

    pub fn set_exit_height(&self, result: Result<BlockHeight, ChainError>) {
        self.state().exit_height = result;
    }

    pub fn set_withdrawal(&self, result: Result<String, ChainError>) {
        self.state().withdrawal = result;
    }

    /// Names of every query made so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == call).count()
    }

    /// When each key fetch happened (tokio time, so pausable).
    pub fn key_fetch_times(&self) -> Vec<Instant> {
        self.state().key_fetches.clone()
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for NullChain {
    async fn ensure_connected(&self) -> Result<(), ChainError> {
        self.record("ensure_connected").connection.clone()
    }

    async fn block_height(&self) -> Result<BlockHeight, ChainError> {
        self.record("block_height").height.clone()
    }

    async fn challenge_window(&self) -> Result<ChallengeWindow, ChainError> {
        self.record("challenge_window").window.clone()
    }

    async fn challenge_expiration(&self) -> Result<BlockHeight, ChainError> {
        self.record("challenge_expiration").expiration.clone()
    }

    async fn challenge_verify_expiration(&self) -> Result<BlockHeight, ChainError> {
        self.record("challenge_verify_expiration").verify_expiration.clone()
    }

    async fn unverified_idle_proofs(
        &self,
        verifier: &AccountId,
    ) -> Result<Vec<UnverifiedProof>, ChainError> {
        self.record("unverified_idle_proofs")
            .idle_queues
            .get(verifier)
            .cloned()
            .unwrap_or(Err(ChainError::NotFound))
    }

    async fn unverified_service_proofs(
        &self,
        verifier: &AccountId,
    ) -> Result<Vec<UnverifiedProof>, ChainError> {
        self.record("unverified_service_proofs")
            .service_queues
            .get(verifier)
            .cloned()
            .unwrap_or(Err(ChainError::NotFound))
    }

    async fn verification_public_key(&self) -> Result<Vec<u8>, ChainError> {
        let mut state = self.record("verification_public_key");
        state.key_fetches.push(Instant::now());
        state
            .key_script
            .pop_front()
            .unwrap_or_else(|| Ok(TEST_KEY_DER.to_vec()))
    }

    async fn miner_info(&self, _account: &AccountId) -> Result<MinerInfo, ChainError> {
        self.record("miner_info").miner.clone()
    }

    async fn verifier_workers(&self) -> Result<Vec<VerifierWorker>, ChainError> {
        self.record("verifier_workers").workers.clone()
    }
}

#[async_trait]
impl StakingClient for NullChain {
    async fn exit_height(&self, _account: &AccountId) -> Result<BlockHeight, ChainError> {
        self.record("exit_height").exit_height.clone()
    }

    async fn withdraw(&self) -> Result<String, ChainError> {
        self.record("withdraw").withdrawal.clone()
    }
}
