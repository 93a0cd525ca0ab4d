use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::repository::{ProgressSlotRepository, SlotRecord, SlotWrite, StorageError};

use super::SqliteRepository;
use super::mapping::{ser, version_from_i64};

#[async_trait]
impl ProgressSlotRepository for SqliteRepository {
    async fn read_slot(&self, key: &str) -> Result<Option<SlotRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT payload, version, updated_at
            FROM progress_slots
            WHERE key = ?1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.try_get("payload").map_err(ser)?;
        let version = version_from_i64(row.try_get("version").map_err(ser)?)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

        Ok(Some(SlotRecord {
            payload,
            version,
            updated_at,
        }))
    }

    async fn write_slot(
        &self,
        key: &str,
        payload: &str,
        written_at: DateTime<Utc>,
    ) -> Result<SlotWrite, StorageError> {
        let row = sqlx::query(
            r"
            INSERT INTO progress_slots (key, payload, version, updated_at)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                version = progress_slots.version + 1,
                updated_at = excluded.updated_at
            RETURNING version
            ",
        )
        .bind(key)
        .bind(payload)
        .bind(written_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let version = version_from_i64(row.try_get("version").map_err(ser)?)?;
        Ok(SlotWrite::from_version(version))
    }
}
