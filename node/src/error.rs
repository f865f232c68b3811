use thiserror::Error;

use crate::chain::ChainError;
use crate::key::KeyError;
use crate::peer_registry::RegistryError;
use crate::withdraw::WithdrawError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("peer registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("verification key error: {0}")]
    Key(#[from] KeyError),

    #[error("withdraw error: {0}")]
    Withdraw(#[from] WithdrawError),

    #[error("invalid value: {0}")]
    Types(#[from] strata_types::TypesError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node already started")]
    AlreadyStarted,

    #[error("shutdown timeout")]
    ShutdownTimeout,
}
