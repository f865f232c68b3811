use proptest::prelude::*;

use strata_types::{AccountId, BlockHeight};

proptest! {
    /// Any account renders to a string that parses back to the same account.
    #[test]
    fn account_display_parses_back(bytes in prop::array::uniform32(0u8..)) {
        let account = AccountId::new(bytes);
        let parsed: AccountId = account.to_string().parse().unwrap();
        prop_assert_eq!(parsed, account);
    }

    /// Block distance is zero exactly when the later height is not ahead.
    #[test]
    fn block_distance_matches_ordering(a in any::<u32>(), b in any::<u32>()) {
        let ha = BlockHeight::new(a);
        let hb = BlockHeight::new(b);
        prop_assert_eq!(ha.saturating_sub(hb) == 0, a <= b);
    }
}
