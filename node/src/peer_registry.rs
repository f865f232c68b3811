//! Peer registry: the node's address book of known network peers.
//!
//! The discovery job records peers as they are found and the node facade
//! loads and persists the book across restarts. All access goes through a
//! single `RwLock`; no method hands out a reference into the map.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use tempfile::NamedTempFile;
use thiserror::Error;

use strata_types::{Multiaddr, PeerRecord};
use strata_utils::{dedup_preserving_order, is_public_addr};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    /// Whether the peer file simply does not exist yet.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Outcome of an intranet pruning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    /// Records that kept at least one public address.
    pub kept: usize,
    /// Records deleted because no public address survived.
    pub removed: usize,
}

/// Concurrency-safe map from peer id to [`PeerRecord`], persisted as JSON.
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, PeerRecord>>,
    path: PathBuf,
}

impl PeerRegistry {
    /// An empty registry that persists to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort insert: records `record` under `id` only if the registry
    /// lock is free right now.
    ///
    /// Never blocks. Returns `false` (and drops the write) when another
    /// holder has the lock; discovery traffic re-announces peers, so a
    /// dropped write is recovered on the next sighting.
    pub fn save(&self, id: &str, record: PeerRecord) -> bool {
        let mut peers = match self.peers.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::trace!(peer = %id, "peer registry busy, dropping save");
                return false;
            }
        };
        peers.insert(id.to_string(), record);
        true
    }

    /// Take the exclusive lock for a sequence of mutations.
    ///
    /// Blocks until the lock is available. Keep the returned book alive only
    /// for in-memory work; never hold it across an `.await`.
    pub fn lock(&self) -> PeerBook<'_> {
        PeerBook {
            peers: self.write_map(),
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.read_map().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<PeerRecord> {
        self.read_map().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Copy of every registry key.
    pub fn list_ids(&self) -> Vec<String> {
        self.read_map().keys().cloned().collect()
    }

    /// Copy of every record's own peer identity.
    pub fn list_identities(&self) -> Vec<String> {
        self.read_map().values().map(|r| r.id.clone()).collect()
    }

    /// Copy of the whole registry.
    pub fn snapshot(&self) -> HashMap<String, PeerRecord> {
        self.read_map().clone()
    }

    /// Drop every non-public address; delete records left with none.
    ///
    /// Idempotent: a second pass over already-pruned contents changes nothing.
    pub fn prune_intranet_addresses(&self) -> PruneOutcome {
        self.lock().prune_intranet_addresses()
    }

    /// Write the registry to its file.
    ///
    /// The read lock is held only while encoding, so the file reflects one
    /// consistent snapshot; the disk write happens after it is released.
    /// Each call writes its own temp file in the target directory and
    /// renames it over the registry file, so concurrent persists never
    /// publish a partial file.
    pub fn persist(&self) -> Result<usize, RegistryError> {
        let (buf, count) = {
            let peers = self.read_map();
            (serde_json::to_vec(&*peers)?, peers.len())
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&buf)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(count)
    }

    /// Merge the registry file into memory, returning how many records it held.
    ///
    /// Entries from the file overwrite in-memory entries with the same id.
    /// On any error the in-memory registry is left untouched.
    pub fn load(&self) -> Result<usize, RegistryError> {
        let buf = std::fs::read(&self.path)?;
        let loaded: HashMap<String, PeerRecord> = serde_json::from_slice(&buf)?;
        let count = loaded.len();
        self.write_map().extend(loaded);
        Ok(count)
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<String, PeerRecord>> {
        self.peers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<String, PeerRecord>> {
        self.peers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive view of the registry; see [`PeerRegistry::lock`].
pub struct PeerBook<'a> {
    peers: RwLockWriteGuard<'a, HashMap<String, PeerRecord>>,
}

impl PeerBook<'_> {
    /// Insert or replace a record. The caller already holds the lock.
    pub fn upsert(&mut self, id: &str, record: PeerRecord) {
        self.peers.insert(id.to_string(), record);
    }

    pub fn remove(&mut self, id: &str) -> Option<PeerRecord> {
        self.peers.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&PeerRecord> {
        self.peers.get(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn prune_intranet_addresses(&mut self) -> PruneOutcome {
        let mut outcome = PruneOutcome::default();
        let ids: Vec<String> = self.peers.keys().cloned().collect();
        for id in ids {
            let Some(record) = self.peers.remove(&id) else {
                continue;
            };
            let public: Vec<Multiaddr> = record
                .addrs
                .into_iter()
                .filter(|addr| is_public_addr(addr))
                .collect();
            if public.is_empty() {
                outcome.removed += 1;
                continue;
            }
            outcome.kept += 1;
            let pruned = PeerRecord::new(record.id, dedup_preserving_order(public));
            self.upsert(&id, pruned);
        }
        outcome
    }
}
