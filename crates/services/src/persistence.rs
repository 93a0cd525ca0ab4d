use std::sync::Arc;

use chrono::{DateTime, Utc};
use plans_core::model::UserProgress;
use storage::record::{decode_progress, encode_progress};
use storage::repository::{ProgressSlotRepository, StorageError};

/// Slot key the progress table is stored under.
pub const PROGRESS_SLOT_KEY: &str = "readingPlanProgress";

/// Round-trips the progress table through a durable slot.
///
/// Writes are last-write-wins. The adapter remembers the slot version it
/// last observed so it can report when another writer got in between; it
/// still overwrites in that case.
///
/// A load that fails to read the backend leaves the adapter unresolved: the
/// slot may still hold saved progress, so it is never overwritten until it
/// has been read or confirmed absent.
pub struct ProgressPersistence {
    slots: Arc<dyn ProgressSlotRepository>,
    key: String,
    known_version: Option<u64>,
    unresolved: bool,
}

impl ProgressPersistence {
    #[must_use]
    pub fn new(slots: Arc<dyn ProgressSlotRepository>) -> Self {
        Self::with_key(slots, PROGRESS_SLOT_KEY)
    }

    #[must_use]
    pub fn with_key(slots: Arc<dyn ProgressSlotRepository>, key: impl Into<String>) -> Self {
        Self {
            slots,
            key: key.into(),
            known_version: None,
            unresolved: false,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the last load could not read the slot.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.unresolved
    }

    /// Read the persisted table.
    ///
    /// Never fails: a missing slot, an unreadable backend or a malformed
    /// payload all yield an empty table. After a read error the adapter is
    /// unresolved; see [`ProgressPersistence::is_unresolved`].
    pub async fn load(&mut self) -> UserProgress {
        let slot = match self.slots.read_slot(&self.key).await {
            Ok(Some(slot)) => slot,
            Ok(None) => {
                tracing::debug!(key = %self.key, "no saved reading plan progress");
                self.unresolved = false;
                return UserProgress::new();
            }
            Err(err) => {
                tracing::error!(key = %self.key, error = %err, "failed to read saved progress");
                self.unresolved = true;
                return UserProgress::new();
            }
        };
        self.unresolved = false;
        self.known_version = Some(slot.version);

        match decode_progress(&slot.payload) {
            Ok(decoded) => {
                if !decoded.repaired.is_empty() || !decoded.dropped.is_empty() {
                    tracing::warn!(
                        key = %self.key,
                        repaired = ?decoded.repaired,
                        dropped = ?decoded.dropped,
                        "normalized saved progress records"
                    );
                }
                decoded.progress
            }
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "discarding malformed saved progress"
                );
                UserProgress::new()
            }
        }
    }

    /// Serialize and write the full table.
    ///
    /// While unresolved, the slot is checked first and only written if it is
    /// still absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unverified` if unresolved and the slot exists,
    /// or `StorageError` if encoding, the check or the slot write fails.
    pub async fn save(
        &mut self,
        progress: &UserProgress,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if self.unresolved {
            if self.slots.read_slot(&self.key).await?.is_some() {
                return Err(StorageError::Unverified {
                    key: self.key.clone(),
                });
            }
            self.unresolved = false;
        }
        let payload = encode_progress(progress)?;
        let write = self.slots.write_slot(&self.key, &payload, at).await?;

        if write.previous_version != self.known_version {
            tracing::warn!(
                key = %self.key,
                expected = ?self.known_version,
                found = ?write.previous_version,
                "progress slot was overwritten by another writer; keeping this write"
            );
        }
        self.known_version = Some(write.version);
        Ok(())
    }
}
