//! Database query functions for the `settings` table.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::Setting;

/// Fetch a setting value by key. `None` when the key was never written.
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to read setting {key}"))?;

    Ok(value.map(|(v,)| v))
}

/// Insert or overwrite a setting.
pub async fn put_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await
    .with_context(|| format!("failed to write setting {key}"))?;

    Ok(())
}

/// Write several settings atomically.
pub async fn put_settings(pool: &SqlitePool, entries: &[(&str, &str)]) -> Result<()> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let now = Utc::now();
    for (key, value) in entries {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to write setting {key}"))?;
    }
    tx.commit().await.context("failed to commit settings")?;
    Ok(())
}

/// Delete the given keys. Returns how many rows were removed.
pub async fn delete_settings(pool: &SqlitePool, keys: &[&str]) -> Result<u64> {
    let mut removed = 0;
    for key in keys {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(pool)
            .await
            .with_context(|| format!("failed to delete setting {key}"))?;
        removed += result.rows_affected();
    }
    Ok(removed)
}

/// List every stored setting, ordered by key.
pub async fn list_settings(pool: &SqlitePool) -> Result<Vec<Setting>> {
    let settings = sqlx::query_as::<_, Setting>("SELECT * FROM settings ORDER BY key")
        .fetch_all(pool)
        .await
        .context("failed to list settings")?;

    Ok(settings)
}
