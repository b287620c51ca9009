//! The provenance registry: an append-only, content-addressed record store.
//!
//! Records are keyed by fingerprint. `put` is the only mutator; there is no
//! update or delete path, so concurrent commits to distinct fingerprints are
//! independent and concurrent commits racing for the same fingerprint resolve
//! to exactly one winner (the loser observes `AlreadyExists`). Insertion
//! order is tracked in a separate index; the record itself carries no
//! sequence number.
//!
//! Existence is derived from "endorser is non-null" rather than stored as a
//! flag, and the non-null endorser invariant is enforced at `put`, so the
//! two can never disagree.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::Fingerprint;
use crate::identity::Identity;

/// Minimum endorsement length in bytes.
pub const ENDORSEMENT_MIN_LEN: usize = 1;

/// Maximum endorsement length in bytes.
pub const ENDORSEMENT_MAX_LEN: usize = 2048;

/// Schema version for registry snapshot files.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for registry snapshot files.
pub const SNAPSHOT_SCHEMA_ID: &str = "provenance/registry_snapshot@1";

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("record already exists for fingerprint {0}")]
    AlreadyExists(Fingerprint),

    #[error("invalid timestamp {timestamp}: must be > 0 and <= registry time {now}")]
    InvalidTimestamp { timestamp: u64, now: u64 },

    #[error("invalid endorsement length {0}: must be in [{ENDORSEMENT_MIN_LEN}, {ENDORSEMENT_MAX_LEN}]")]
    InvalidEndorsement(usize),

    #[error("endorser must not be the null identity")]
    InvalidEndorser,

    #[error("no record for fingerprint {0}")]
    NotFound(Fingerprint),

    #[error("index {index} out of range: registry has {count} records")]
    OutOfRange { index: usize, count: usize },
}

/// Errors from snapshot persistence.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot schema: {0}")]
    UnsupportedSchema(String),

    #[error("snapshot record rejected: {0}")]
    Invalid(#[from] RegistryError),
}

mod endorsement_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// One committed provenance record. Immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Content digest of the artifact (registry key).
    pub fingerprint: Fingerprint,

    /// Unix timestamp (seconds) claimed at commit time.
    pub timestamp: u64,

    /// Identity that endorsed the artifact.
    pub endorser: Identity,

    /// Opaque endorsement bytes (base64 in JSON). Never empty.
    #[serde(with = "endorsement_base64")]
    pub endorsement: Vec<u8>,

    /// Optional locator into the content-addressed storage network.
    /// Empty string means "not published"; the record is valid without it.
    pub storage_locator: String,
}

impl ProvenanceRecord {
    /// Whether the artifact's bytes were published to storage.
    pub fn is_published(&self) -> bool {
        !self.storage_locator.is_empty()
    }
}

/// Registry snapshot artifact (registry_snapshot.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,

    /// Records in insertion order
    pub records: Vec<ProvenanceRecord>,
}

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    records: HashMap<Fingerprint, ProvenanceRecord>,
    index: Vec<Fingerprint>,
    subscribers: Vec<Sender<ProvenanceRecord>>,
}

/// The append-only provenance registry.
///
/// Thread-safe: all state lives behind a single mutex, so `put` is evaluated
/// atomically against the current contents (first writer wins).
pub struct ProvenanceRegistry {
    inner: Mutex<RegistryInner>,
    clock: Clock,
}

impl std::fmt::Debug for ProvenanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceRegistry").finish_non_exhaustive()
    }
}

impl Default for ProvenanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvenanceRegistry {
    /// Create an empty registry using the wall clock.
    pub fn new() -> Self {
        Self::with_clock(|| Utc::now().timestamp().max(0) as u64)
    }

    /// Create an empty registry with an injected clock (unix seconds).
    pub fn with_clock(clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            clock: Box::new(clock),
        }
    }

    /// The registry's current time in unix seconds.
    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    /// Commit a record. The only mutator.
    ///
    /// Fails with `AlreadyExists` if the fingerprint is already committed,
    /// `InvalidTimestamp` if the timestamp is zero or future-dated,
    /// `InvalidEndorsement` if the endorsement length is out of bounds, and
    /// `InvalidEndorser` for the null identity. On success the fingerprint
    /// is appended to the insertion index and the full record is sent to
    /// every live subscriber.
    pub fn put(
        &self,
        fingerprint: Fingerprint,
        timestamp: u64,
        endorsement: Vec<u8>,
        endorser: Identity,
        storage_locator: String,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        // Uniqueness is checked first: a duplicate commit reports
        // AlreadyExists regardless of whatever else is wrong with the
        // second attempt's parameters
        if inner.records.contains_key(&fingerprint) {
            return Err(RegistryError::AlreadyExists(fingerprint));
        }

        let now = self.now();
        if timestamp == 0 || timestamp > now {
            return Err(RegistryError::InvalidTimestamp { timestamp, now });
        }
        if endorsement.len() < ENDORSEMENT_MIN_LEN || endorsement.len() > ENDORSEMENT_MAX_LEN {
            return Err(RegistryError::InvalidEndorsement(endorsement.len()));
        }
        if endorser.is_null() {
            return Err(RegistryError::InvalidEndorser);
        }

        let record = ProvenanceRecord {
            fingerprint,
            timestamp,
            endorser,
            endorsement,
            storage_locator,
        };

        inner.records.insert(fingerprint, record.clone());
        inner.index.push(fingerprint);

        // Drop subscribers whose receiver has gone away
        inner.subscribers.retain(|tx| tx.send(record.clone()).is_ok());

        Ok(())
    }

    /// Look up a record by fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Result<ProvenanceRecord, RegistryError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .records
            .get(fingerprint)
            .cloned()
            .ok_or(RegistryError::NotFound(*fingerprint))
    }

    /// Whether a record exists for the fingerprint.
    ///
    /// Derived property: true exactly when a record is present, and every
    /// present record has a non-null endorser by the `put` invariant.
    pub fn exists(&self, fingerprint: &Fingerprint) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .records
            .get(fingerprint)
            .map(|r| !r.endorser.is_null())
            .unwrap_or(false)
    }

    /// Number of committed records.
    pub fn count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.index.len()
    }

    /// Fingerprint at position `i` in insertion order.
    pub fn by_index(&self, i: usize) -> Result<Fingerprint, RegistryError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.index.get(i).copied().ok_or(RegistryError::OutOfRange {
            index: i,
            count: inner.index.len(),
        })
    }

    /// Subscribe to `Recorded` events.
    ///
    /// Every subsequent successful `put` sends the committed record to the
    /// returned receiver, in commit order.
    pub fn subscribe(&self) -> Receiver<ProvenanceRecord> {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.subscribers.push(tx);
        rx
    }

    /// Export all records in insertion order as a snapshot artifact.
    pub fn export_snapshot(&self) -> RegistrySnapshot {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let records = inner
            .index
            .iter()
            .filter_map(|fp| inner.records.get(fp).cloned())
            .collect();
        RegistrySnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            schema_id: SNAPSHOT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            records,
        }
    }

    /// Write a snapshot to a JSON file.
    pub fn write_to_file(&self, path: &Path) -> Result<(), SnapshotError> {
        let snapshot = self.export_snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a registry from a snapshot file.
    ///
    /// Every record is re-validated through `put` against this registry's
    /// clock, so a tampered snapshot (duplicate fingerprint, future
    /// timestamp, out-of-bounds endorsement, null endorser) is rejected with
    /// the matching `RegistryError`.
    pub fn load_from_file(
        path: &Path,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;
        let snapshot: RegistrySnapshot = serde_json::from_str(&json)?;
        if snapshot.schema_id != SNAPSHOT_SCHEMA_ID {
            return Err(SnapshotError::UnsupportedSchema(snapshot.schema_id));
        }

        let registry = Self::with_clock(clock);
        for record in snapshot.records {
            registry.put(
                record.fingerprint,
                record.timestamp,
                record.endorsement,
                record.endorser,
                record.storage_locator,
            )?;
        }
        Ok(registry)
    }
}
