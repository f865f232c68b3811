//! Strata storage miner runtime.
//!
//! The orchestrator keeps this node's storage commitments provable: it polls
//! the chain for challenges, launches proof and verification jobs under
//! per-kind slots, keeps the continuous space-management and discovery jobs
//! alive, and maintains the peer and verifier registries those jobs share.
//! Everything outside that loop (chain RPC, proof cryptography, transport)
//! is reached through the traits in [`chain`] and [`jobs`].

pub mod chain;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod jobs;
pub mod key;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod orchestrator;
pub mod peer_registry;
pub mod poller;
pub mod shutdown;
pub mod slot;
pub mod tracing_spans;
pub mod verifier_registry;
pub mod withdraw;

pub use chain::{ChainClient, ChainError, StakingClient};
pub use config::{NodeConfig, Schedule};
pub use discovery::DiscoveryService;
pub use dispatcher::Dispatcher;
pub use error::NodeError;
pub use jobs::{ChallengeJob, Job, JobError, PeerDiscovery, TaskRunner, VerifyResultJob};
pub use key::{KeyError, VerificationKey};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::StorageNode;
pub use orchestrator::{Collaborators, NodeStatus, Orchestrator, Phase, Registries};
pub use peer_registry::{PeerBook, PeerRegistry, PruneOutcome, RegistryError};
pub use poller::{ChallengePoller, TickOutcome, TickReport};
pub use shutdown::ShutdownController;
pub use slot::{SlotGuard, SlotSet, TaskKind, TaskSlot};
pub use verifier_registry::VerifierRegistry;
pub use withdraw::{check_cooldown, withdraw, WithdrawError};
