//! Settings database access
//!
//! Read/write settings from the settings table (key-value store). The
//! playback position of each device is stored there too, under
//! `player_media_index:<device_id>`.

use crate::error::{Error, Result};
use crate::playback::store::IndexStore;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

const MEDIA_INDEX_PREFIX: &str = "player_media_index:";

fn media_index_key(device_id: &str) -> String {
    format!("{}{}", MEDIA_INDEX_PREFIX, device_id)
}

/// Save the index that will be shown next for a device
pub async fn save_media_index(db: &Pool<Sqlite>, device_id: &str, index: usize) -> Result<()> {
    set_setting(db, &media_index_key(device_id), index).await
}

/// Load the last persisted index for a device
///
/// An unparseable value is treated as absent: playback then starts over
/// instead of refusing to start.
pub async fn load_media_index(db: &Pool<Sqlite>, device_id: &str) -> Result<Option<i64>> {
    match get_setting::<i64>(db, &media_index_key(device_id)).await {
        Ok(value) => Ok(value),
        Err(Error::Config(msg)) => {
            tracing::warn!("Ignoring persisted media index: {}", msg);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Generic setting getter
///
/// Returns None if the key doesn't exist or holds NULL.
/// Parses value from string using FromStr trait.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    match value.flatten() {
        Some(s) => match s.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}

/// Durable index store backed by the settings table
#[derive(Clone)]
pub struct SqliteIndexStore {
    db: Pool<Sqlite>,
}

impl SqliteIndexStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    async fn load(&self, device_id: &str) -> Result<Option<i64>> {
        load_media_index(&self.db, device_id).await
    }

    async fn save(&self, device_id: &str, index: usize) -> Result<()> {
        save_media_index(&self.db, device_id, index).await
    }
}
