use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("refusing to overwrite slot {key}: its contents were never read")]
    Unverified { key: String },
}

/// Contents of a durable slot as last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    pub payload: String,
    /// Incremented on every write, starting at 1.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a slot write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWrite {
    pub version: u64,
    /// Version that was overwritten, or `None` if the slot was empty.
    pub previous_version: Option<u64>,
}

impl SlotWrite {
    pub(crate) fn from_version(version: u64) -> Self {
        Self {
            version,
            previous_version: (version > 1).then(|| version - 1),
        }
    }
}

/// Durable key-value slots holding serialized progress.
///
/// Writes are unconditional (last write wins). Each write bumps the slot's
/// version so callers can detect that someone else wrote in between.
#[async_trait]
pub trait ProgressSlotRepository: Send + Sync {
    /// Read a slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read. A missing slot is `Ok(None)`.
    async fn read_slot(&self, key: &str) -> Result<Option<SlotRecord>, StorageError>;

    /// Replace the payload of a slot, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be stored.
    async fn write_slot(
        &self,
        key: &str,
        payload: &str,
        written_at: DateTime<Utc>,
    ) -> Result<SlotWrite, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    slots: Arc<Mutex<HashMap<String, SlotRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Overwrite a slot's payload directly, bypassing versioning rules callers
    /// would normally follow. Useful for seeding legacy or corrupted blobs.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw(&self, key: &str, payload: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let version = guard.get(key).map_or(1, |slot| slot.version + 1);
        guard.insert(
            key.to_owned(),
            SlotRecord {
                payload: payload.to_owned(),
                version,
                updated_at: at,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl ProgressSlotRepository for InMemoryRepository {
    async fn read_slot(&self, key: &str) -> Result<Option<SlotRecord>, StorageError> {
        let guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn write_slot(
        &self,
        key: &str,
        payload: &str,
        written_at: DateTime<Utc>,
    ) -> Result<SlotWrite, StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let version = guard.get(key).map_or(1, |slot| slot.version + 1);
        guard.insert(
            key.to_owned(),
            SlotRecord {
                payload: payload.to_owned(),
                version,
                updated_at: written_at,
            },
        );
        Ok(SlotWrite::from_version(version))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress_slots: Arc<dyn ProgressSlotRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress_slots: Arc<dyn ProgressSlotRepository> = Arc::new(repo);
        Self { progress_slots }
    }
}
