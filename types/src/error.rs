//! Error type for parsing and validating shared types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid account: {0}")]
    InvalidAccount(String),

    #[error("invalid peer record: {0}")]
    InvalidPeer(String),
}
