//! Durable session record.
//!
//! A single small JSON file with fixed field names: the anchor position
//! as a byte-stable blob, the session start as epoch milliseconds, and
//! the activity label as a string. Writes go to a temp file and are
//! renamed into place, so a reader never observes a partial record.
//! Distance is intentionally not persisted; a restored session reports
//! zero until a fresh fix arrives.

use crate::core::types::{ActivityKind, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version byte leading the encoded position blob.
const POSITION_ENCODING_VERSION: u8 = 1;

/// `[version u8][lat f64 BE][lon f64 BE][timestamp_millis i64 BE]`
const POSITION_ENCODED_LEN: usize = 25;

/// The durable subset of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedSession {
    pub anchor: Position,
    pub started_at: DateTime<Utc>,
    pub activity: ActivityKind,
}

/// On-disk layout. Field names are the record's fixed keys.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    position: Vec<u8>,
    timestamp: i64,
    activity: String,
}

/// Store errors. Callers treat failures as "no persisted session" or
/// "write dropped" and keep tracking in memory.
#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Serialize(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {e}"),
            StoreError::Serialize(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Synchronous, local, atomic-per-call session persistence.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the full record.
    pub fn save(&self, session: &PersistedSession) -> Result<(), StoreError> {
        let record = StoredRecord {
            position: encode_position(&session.anchor).to_vec(),
            timestamp: session.started_at.timestamp_millis(),
            activity: session.activity.label().to_string(),
        };
        self.write(&record)
    }

    /// Update only the activity field, leaving the stored position
    /// bytes and timestamp untouched. A no-op when no record exists.
    pub fn save_activity(&self, activity: ActivityKind) -> Result<(), StoreError> {
        let Some(mut record) = self.read() else {
            return Ok(());
        };
        record.activity = activity.label().to_string();
        self.write(&record)
    }

    /// Load the persisted session, if a resumable record exists.
    ///
    /// A record is resumable when its position blob decodes and its
    /// timestamp is positive; anything else (missing file, malformed
    /// JSON, truncated blob, unknown codec version) yields `None`.
    pub fn load(&self) -> Option<PersistedSession> {
        let record = self.read()?;
        if record.timestamp <= 0 {
            return None;
        }
        let anchor = decode_position(&record.position)?;
        let started_at = DateTime::from_timestamp_millis(record.timestamp)?;
        Some(PersistedSession {
            anchor,
            started_at,
            activity: ActivityKind::from_label(&record.activity),
        })
    }

    /// Remove the record; a subsequent `load` returns `None`.
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    fn read(&self) -> Option<StoredRecord> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("malformed session record, treating as absent: {e}");
                None
            }
        }
    }

    fn write(&self, record: &StoredRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string(record).map_err(|e| StoreError::Serialize(e.to_string()))?;

        // Write then rename so no partial record is ever observable.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(e.to_string()))
    }
}

/// Encode a position into the fixed 25-byte layout. The float bit
/// patterns are carried verbatim, so decode restores them exactly.
pub fn encode_position(position: &Position) -> [u8; POSITION_ENCODED_LEN] {
    let mut bytes = [0u8; POSITION_ENCODED_LEN];
    bytes[0] = POSITION_ENCODING_VERSION;
    bytes[1..9].copy_from_slice(&position.latitude.to_be_bytes());
    bytes[9..17].copy_from_slice(&position.longitude.to_be_bytes());
    bytes[17..25].copy_from_slice(&position.timestamp.timestamp_millis().to_be_bytes());
    bytes
}

/// Decode a position blob. Returns `None` on a wrong length, unknown
/// version, or out-of-range timestamp.
pub fn decode_position(bytes: &[u8]) -> Option<Position> {
    if bytes.len() != POSITION_ENCODED_LEN || bytes[0] != POSITION_ENCODING_VERSION {
        return None;
    }

    let latitude = f64::from_be_bytes(bytes[1..9].try_into().ok()?);
    let longitude = f64::from_be_bytes(bytes[9..17].try_into().ok()?);
    let millis = i64::from_be_bytes(bytes[17..25].try_into().ok()?);
    let timestamp = DateTime::from_timestamp_millis(millis)?;

    Some(Position::new(latitude, longitude, timestamp))
}
