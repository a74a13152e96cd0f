/// Seen-state persistence — acknowledged notification ids, per user,
/// durable across reloads. Backed by sled; one JSON record per user id.
///
/// Load is best-effort: a missing or malformed record degrades to an empty
/// set (everything shows as new, nothing is lost). Save is fire-and-forget:
/// failures are logged, never surfaced, never retried.
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

const RECORD_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeenRecordV1 {
    version: u8,
    ids: Vec<String>,
}

/// In-memory view of one user's acknowledged ids. Keeps insertion order so
/// the cap can drop the oldest entries first.
#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    order: Vec<String>,
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Insert an id; returns false if it was already present
    pub fn insert(&mut self, id: String) -> bool {
        if !self.ids.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop the oldest ids until at most `cap` remain
    pub fn truncate_to(&mut self, cap: usize) {
        if self.order.len() <= cap {
            return;
        }
        let dropped = self.order.drain(..self.order.len() - cap);
        for id in dropped {
            self.ids.remove(&id);
        }
    }

    fn from_ids(ids: Vec<String>) -> Self {
        let mut set = Self::default();
        for id in ids {
            set.insert(id);
        }
        set
    }
}

pub struct SeenStore {
    db: sled::Db,
}

impl SeenStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let db = sled::open(data_dir.join("seen.db"))
            .map_err(|e| SyncError::Storage(format!("seen DB: {}", e)))?;
        Ok(Self { db })
    }

    /// Load a user's seen-set. Never fails: malformed or absent records load
    /// as empty.
    pub fn load(&self, user_id: u64) -> SeenSet {
        let key = Self::key(user_id);
        let raw = match self.db.get(key.as_bytes()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return SeenSet::default(),
            Err(e) => {
                warn!("Failed to read seen record for user {}: {}", user_id, e);
                return SeenSet::default();
            }
        };

        match serde_json::from_slice::<SeenRecordV1>(&raw) {
            Ok(record) if record.version == RECORD_VERSION => SeenSet::from_ids(record.ids),
            Ok(record) => {
                warn!(
                    "Unsupported seen record version {} for user {}, starting empty",
                    record.version, user_id
                );
                SeenSet::default()
            }
            Err(e) => {
                warn!("Malformed seen record for user {}: {}", user_id, e);
                SeenSet::default()
            }
        }
    }

    /// Persist a user's seen-set, applying the retention cap. Best effort:
    /// failures are logged and swallowed.
    pub fn save(&self, user_id: u64, seen: &mut SeenSet, cap: usize) {
        seen.truncate_to(cap);
        let record = SeenRecordV1 {
            version: RECORD_VERSION,
            ids: seen.order.clone(),
        };
        let value = match serde_json::to_vec(&record) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to encode seen record for user {}: {}", user_id, e);
                return;
            }
        };
        if let Err(e) = self.db.insert(Self::key(user_id).as_bytes(), value) {
            warn!("Failed to save seen record for user {}: {}", user_id, e);
            return;
        }
        debug!("Saved {} seen ids for user {}", seen.len(), user_id);
    }

    /// Flush pending writes (used on engine shutdown)
    pub fn flush(&self) {
        if let Err(e) = self.db.flush() {
            warn!("Failed to flush seen store: {}", e);
        }
    }

    fn key(user_id: u64) -> String {
        format!("seen:{}", user_id)
    }
}

impl Clone for SeenStore {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}
