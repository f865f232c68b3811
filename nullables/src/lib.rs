//! Nullable collaborators for deterministic testing.
//!
//! Every external seam of the node (chain RPC, job execution, peer
//! discovery) has a stand-in here that:
//! - returns scripted values instead of touching the network
//! - records every call for assertions
//! - can be reconfigured while the node is running
//!
//! Usage: build a node with these in its `Collaborators` and drive time with
//! `tokio::time::pause`.

pub mod chain;
pub mod discovery;
pub mod runner;

pub use chain::{NullChain, TEST_KEY_DER};
pub use discovery::NullPeerDiscovery;
pub use runner::{Behavior, NullTaskRunner};
