use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Fixed keys of the `settings` table.
///
/// A missing key always means "not configured yet", never corruption.
pub mod keys {
    /// URL of the workout document last configured by the user.
    pub const DOCUMENT_URL: &str = "document_url";
    /// Cached OAuth access token.
    pub const ACCESS_TOKEN: &str = "oauth.access_token";
    /// Cached OAuth refresh token.
    pub const REFRESH_TOKEN: &str = "oauth.refresh_token";
    /// Absolute expiry of the cached access token, RFC 3339.
    pub const TOKEN_EXPIRY: &str = "oauth.token_expiry";

    /// Every key that belongs to the cached credential.
    pub const CREDENTIAL: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, TOKEN_EXPIRY];
}

/// A single key-value setting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Workout history
// ---------------------------------------------------------------------------

/// One set as it was logged by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    /// 1-based set number.
    pub set_number: u32,
    pub weight: String,
    #[serde(default)]
    pub reps: Option<String>,
    pub completed: bool,
}

impl LoggedSet {
    /// Weight as a number, treating unparsable values (e.g. "bodyweight") as zero.
    pub fn weight_value(&self) -> f64 {
        self.weight.trim().replace(',', ".").parse().unwrap_or(0.0)
    }
}

/// A logged exercise session -- one exercise on one day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutSession {
    pub id: i64,
    pub performed_at: DateTime<Utc>,
    /// Canonical weekday label the session was planned for.
    pub day: String,
    pub exercise_name: String,
    pub sets: Json<Vec<LoggedSet>>,
    pub notes: Option<String>,
    /// Whether the results also reached the source document.
    pub synced: bool,
}

impl WorkoutSession {
    /// Number of sets marked completed.
    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.completed).count()
    }
}

/// Aggregate statistics for one exercise across all sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExerciseStats {
    pub sessions: i64,
    pub total_sets: i64,
    pub total_weight: f64,
    pub last_performed: Option<DateTime<Utc>>,
}
