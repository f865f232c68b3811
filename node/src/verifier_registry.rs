//! Verifier registry: verifying-worker accounts mapped to their network identity.
//!
//! Same lock discipline as the peer registry (exclusive for writes, shared
//! for reads, copies out) but no persistence. Entries are only ever
//! replaced by a newer announcement from the same account, never expired.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct VerifierRegistry {
    workers: RwLock<HashMap<String, Vec<u8>>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or replace the identity announced by `account`.
    pub fn save(&self, account: &str, identity: Vec<u8>) {
        self.write_map().insert(account.to_string(), identity);
    }

    pub fn get(&self, account: &str) -> Option<Vec<u8>> {
        self.read_map().get(account).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Copy of every known worker account. Order is unspecified.
    pub fn list_accounts(&self) -> Vec<String> {
        self.read_map().keys().cloned().collect()
    }

    pub fn list_identities(&self) -> Vec<Vec<u8>> {
        self.read_map().values().cloned().collect()
    }

    /// Identities rendered as lowercase hex, for logs and operators.
    pub fn list_identities_encoded(&self) -> Vec<String> {
        self.read_map().values().map(hex::encode).collect()
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.workers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.workers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_replaces_identity() {
        let reg = VerifierRegistry::new();
        reg.save("alice", vec![1, 2]);
        reg.save("alice", vec![0xab]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("alice"), Some(vec![0xab]));
        assert_eq!(reg.list_identities_encoded(), vec!["ab"]);
        assert_eq!(reg.get("bob"), None);
    }

    #[test]
    fn listings_are_copies() {
        let reg = VerifierRegistry::new();
        reg.save("alice", vec![1]);
        let mut accounts = reg.list_accounts();
        accounts.push("mallory".into());
        let mut ids = reg.list_identities();
        ids[0].push(9);
        assert_eq!(reg.list_accounts(), vec!["alice"]);
        assert_eq!(reg.get("alice"), Some(vec![1]));
    }
}
