//! Collateral withdrawal after exit.
//!
//! A miner that has exited must wait out a cooldown, measured in blocks
//! from its exit height, before the chain releases its stake.

use thiserror::Error;
use tracing::info;

use strata_types::{AccountId, BlockHeight};

use crate::chain::{ChainError, StakingClient};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WithdrawError {
    #[error("account is not a registered miner")]
    NotRegistered,

    #[error("miner has not requested exit")]
    NotExited,

    #[error("chain height {current} is below exit height {exit}")]
    HeightRegression {
        current: BlockHeight,
        exit: BlockHeight,
    },

    #[error("cooldown not finished, {remaining} blocks remaining")]
    Cooldown { remaining: u32 },

    #[error("withdrawal transaction {tx_hash} not yet confirmed")]
    Pending { tx_hash: String },

    #[error("chain error: {0}")]
    Chain(ChainError),
}

/// Pure cooldown check: `Ok` once `cooldown` blocks have passed since `exit`.
pub fn check_cooldown(
    current: BlockHeight,
    exit: BlockHeight,
    cooldown: u32,
) -> Result<(), WithdrawError> {
    if current < exit {
        return Err(WithdrawError::HeightRegression { current, exit });
    }
    let elapsed = current.saturating_sub(exit);
    if elapsed < cooldown {
        return Err(WithdrawError::Cooldown {
            remaining: cooldown - elapsed,
        });
    }
    Ok(())
}

/// Withdraw `account`'s collateral once its exit cooldown has elapsed.
///
/// Returns the withdrawal transaction hash.
pub async fn withdraw(
    client: &dyn StakingClient,
    account: &AccountId,
    cooldown: u32,
) -> Result<String, WithdrawError> {
    client.miner_info(account).await.map_err(|e| match e {
        ChainError::NotFound => WithdrawError::NotRegistered,
        other => WithdrawError::Chain(other),
    })?;
    let exit = client.exit_height(account).await.map_err(|e| match e {
        ChainError::NotFound => WithdrawError::NotExited,
        other => WithdrawError::Chain(other),
    })?;
    let current = client.block_height().await.map_err(WithdrawError::Chain)?;
    check_cooldown(current, exit, cooldown)?;

    let tx_hash = client.withdraw().await.map_err(|e| match e {
        ChainError::Unconfirmed { tx_hash } => WithdrawError::Pending { tx_hash },
        other => WithdrawError::Chain(other),
    })?;
    info!(account = %account, tx = %tx_hash, "collateral withdrawn");
    Ok(tx_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(n: u32) -> BlockHeight {
        BlockHeight::new(n)
    }

    #[test]
    fn cooldown_reports_remaining_blocks() {
        assert_eq!(
            check_cooldown(h(1_100), h(1_000), 500),
            Err(WithdrawError::Cooldown { remaining: 400 })
        );
        assert_eq!(
            check_cooldown(h(1_000), h(1_000), 500),
            Err(WithdrawError::Cooldown { remaining: 500 })
        );
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        assert!(check_cooldown(h(1_500), h(1_000), 500).is_ok());
        assert!(check_cooldown(h(9_999), h(1_000), 500).is_ok());
        assert!(check_cooldown(h(5), h(5), 0).is_ok());
    }

    #[test]
    fn height_regression_is_rejected() {
        assert_eq!(
            check_cooldown(h(10), h(20), 5),
            Err(WithdrawError::HeightRegression {
                current: h(10),
                exit: h(20)
            })
        );
    }
}
