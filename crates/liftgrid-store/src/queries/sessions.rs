//! Database query functions for the `workout_sessions` table.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::models::{ExerciseStats, LoggedSet, WorkoutSession};

/// Fields needed to record a new session.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub performed_at: DateTime<Utc>,
    pub day: &'a str,
    pub exercise_name: &'a str,
    pub sets: &'a [LoggedSet],
    pub notes: Option<&'a str>,
    pub synced: bool,
}

/// Insert a session and return the stored row.
pub async fn insert_session(pool: &SqlitePool, new: &NewSession<'_>) -> Result<WorkoutSession> {
    let session = sqlx::query_as::<_, WorkoutSession>(
        "INSERT INTO workout_sessions (performed_at, day, exercise_name, sets, notes, synced) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         RETURNING *",
    )
    .bind(new.performed_at)
    .bind(new.day)
    .bind(new.exercise_name)
    .bind(Json(new.sets))
    .bind(new.notes)
    .bind(new.synced)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert session for {}", new.exercise_name))?;

    Ok(session)
}

/// Fetch a single session by id.
pub async fn get_session(pool: &SqlitePool, id: i64) -> Result<Option<WorkoutSession>> {
    let session =
        sqlx::query_as::<_, WorkoutSession>("SELECT * FROM workout_sessions WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("failed to get session {id}"))?;

    Ok(session)
}

/// Most recent sessions first.
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<WorkoutSession>> {
    let sessions = sqlx::query_as::<_, WorkoutSession>(
        "SELECT * FROM workout_sessions ORDER BY performed_at DESC, id DESC LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list recent sessions")?;

    Ok(sessions)
}

/// Sessions performed in `[from, to)`, oldest first.
pub async fn list_between(
    pool: &SqlitePool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<WorkoutSession>> {
    let sessions = sqlx::query_as::<_, WorkoutSession>(
        "SELECT * FROM workout_sessions \
         WHERE performed_at >= ?1 AND performed_at < ?2 \
         ORDER BY performed_at ASC, id ASC",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to list sessions in range")?;

    Ok(sessions)
}

/// Mark a session as written to the source document.
pub async fn mark_synced(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE workout_sessions SET synced = 1 WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to mark session {id} synced"))?;

    Ok(result.rows_affected() > 0)
}

/// Sessions that never reached the source document, oldest first.
pub async fn list_unsynced(pool: &SqlitePool) -> Result<Vec<WorkoutSession>> {
    let sessions = sqlx::query_as::<_, WorkoutSession>(
        "SELECT * FROM workout_sessions WHERE synced = 0 ORDER BY performed_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await
    .context("failed to list unsynced sessions")?;

    Ok(sessions)
}

/// Per-exercise aggregates over the whole history, keyed by exercise name.
///
/// Only completed sets count toward `total_sets` and `total_weight`.
pub async fn exercise_stats(pool: &SqlitePool) -> Result<BTreeMap<String, ExerciseStats>> {
    let sessions = sqlx::query_as::<_, WorkoutSession>(
        "SELECT * FROM workout_sessions ORDER BY performed_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await
    .context("failed to load sessions for stats")?;

    Ok(aggregate(&sessions))
}

fn aggregate(sessions: &[WorkoutSession]) -> BTreeMap<String, ExerciseStats> {
    let mut stats: BTreeMap<String, ExerciseStats> = BTreeMap::new();
    for session in sessions {
        let entry = stats.entry(session.exercise_name.clone()).or_default();
        entry.sessions += 1;
        for set in session.sets.iter().filter(|s| s.completed) {
            entry.total_sets += 1;
            entry.total_weight += set.weight_value();
        }
        entry.last_performed = match entry.last_performed {
            Some(prev) if prev >= session.performed_at => Some(prev),
            _ => Some(session.performed_at),
        };
    }
    stats
}
