//! Block height type.
//!
//! Every deadline the chain hands out (challenge expiration, verify
//! expiration, exit height) is a block height, never wall-clock time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A chain block number.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockHeight(u32);

impl BlockHeight {
    pub const ZERO: Self = Self(0);

    pub fn new(height: u32) -> Self {
        Self(height)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Number of blocks from `earlier` up to `self`, zero if `earlier` is later.
    pub fn saturating_sub(&self, earlier: BlockHeight) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for BlockHeight {
    fn from(height: u32) -> Self {
        Self(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_sub_never_underflows() {
        assert_eq!(BlockHeight::new(10).saturating_sub(BlockHeight::new(4)), 6);
        assert_eq!(BlockHeight::new(4).saturating_sub(BlockHeight::new(10)), 0);
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&BlockHeight::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
