//! `liftgrid log`, `history` and `stats`: record completed sets locally and
//! write them into the sheet.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::warn;

use liftgrid_core::layout::{Weekday, WorkoutPlan};
use liftgrid_core::write::{PlanContext, ProgressEntry, SetResult, WriteResult, manual_instructions};
use liftgrid_store::models::{ExerciseStats, LoggedSet, WorkoutSession};
use liftgrid_store::queries::sessions::{self, NewSession};

use crate::app::{App, SurfaceKind};

// -----------------------------------------------------------------------
// Argument parsing
// -----------------------------------------------------------------------

/// Parse a `--set N=WEIGHT` argument.
pub fn parse_set(arg: &str) -> Result<SetResult, String> {
    let (number, weight) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected N=WEIGHT, got {arg:?}"))?;
    let set_number: u32 = number
        .trim()
        .parse()
        .map_err(|_| format!("set number must be a positive integer, got {number:?}"))?;
    if set_number == 0 {
        return Err("set numbers start at 1".to_string());
    }
    let weight = weight.trim();
    if weight.is_empty() {
        return Err(format!("set {set_number} has no weight"));
    }
    Ok(SetResult {
        set_number,
        weight: weight.to_string(),
        reps: None,
        completed: true,
    })
}

/// The sheet's spelling of `name` on `day`, matched case-insensitively.
fn canonical_name(plan: &WorkoutPlan, name: &str, day: Weekday) -> Option<String> {
    let wanted = name.trim().to_lowercase();
    plan.day(day)
        .iter()
        .find(|e| e.name.to_lowercase() == wanted)
        .map(|e| e.name.clone())
}

// -----------------------------------------------------------------------
// log
// -----------------------------------------------------------------------

pub async fn run_log(
    app: &App,
    exercise: &str,
    day: Weekday,
    sets: Vec<SetResult>,
    manual: bool,
) -> Result<()> {
    if sets.is_empty() {
        bail!("nothing to log; pass at least one --set N=WEIGHT");
    }

    let loaded = app.load_sheet().await?;
    let exercise_name = canonical_name(&loaded.layout.plan, exercise, day)
        .with_context(|| format!("{exercise:?} is not on the {day} plan"))?;
    let entry = ProgressEntry {
        exercise_name,
        day,
        sets,
    };

    let session = record_session(app, &entry).await?;

    let context = PlanContext::new(
        loaded.document_id.clone(),
        &loaded.grid,
        Some(Arc::new(loaded.layout.positions)),
    )
    .with_sheet_name(app.config.sheet_name.clone())
    .with_origin(loaded.origin);

    if manual {
        print_result(&manual_instructions(&context, &entry)?);
        return Ok(());
    }

    let coordinator = app.write_coordinator(SurfaceKind::Loopback { browser: true })?;
    let result = coordinator.write_progress(&context, &entry).await?;
    print_result(&result);

    match result {
        WriteResult::Written { positions } if positions.is_empty() => {
            warn!(
                exercise = %entry.exercise_name,
                day = %entry.day,
                "no set fits the exercise's cells, session left unsynced"
            );
        }
        WriteResult::Written { .. } => {
            sessions::mark_synced(&app.pool, session.id).await?;
        }
        WriteResult::Unauthorized(_) => {
            // Still show where the values go so they can be typed in.
            print_result(&manual_instructions(&context, &entry)?);
        }
        WriteResult::PartiallyFailed { .. } | WriteResult::Manual { .. } => {}
    }
    Ok(())
}

async fn record_session(app: &App, entry: &ProgressEntry) -> Result<WorkoutSession> {
    let sets: Vec<LoggedSet> = entry
        .sets
        .iter()
        .map(|s| LoggedSet {
            set_number: s.set_number,
            weight: s.weight.clone(),
            reps: s.reps.clone(),
            completed: s.completed,
        })
        .collect();
    let day = entry.day.to_string();
    sessions::insert_session(
        &app.pool,
        &NewSession {
            performed_at: Utc::now(),
            day: &day,
            exercise_name: &entry.exercise_name,
            sets: &sets,
            notes: None,
            synced: false,
        },
    )
    .await
    .context("failed to record workout session")
}

fn print_result(result: &WriteResult) {
    match result {
        WriteResult::Written { positions } if positions.is_empty() => {
            println!("Nothing to write.");
        }
        WriteResult::Written { positions } => {
            println!("Wrote {} cell(s): {}", positions.len(), positions.join(", "));
        }
        WriteResult::PartiallyFailed { message, .. } => {
            warn!(%message, "sheet update incomplete");
            println!("Sheet update incomplete: {message}");
        }
        WriteResult::Unauthorized(failure) => {
            println!("Not written, authorization failed: {failure}");
        }
        WriteResult::Manual { instructions } => {
            println!("Enter these values by hand:");
            for line in instructions {
                println!("  {line}");
            }
        }
    }
}

// -----------------------------------------------------------------------
// history / stats
// -----------------------------------------------------------------------

pub async fn run_history(app: &App, limit: i64) -> Result<()> {
    let recent = sessions::list_recent(&app.pool, limit).await?;
    if recent.is_empty() {
        println!("No workouts logged yet.");
        return Ok(());
    }
    for session in &recent {
        println!("{}", render_session(session));
    }
    Ok(())
}

pub fn render_session(session: &WorkoutSession) -> String {
    let weights: Vec<&str> = session
        .sets
        .iter()
        .filter(|s| s.completed)
        .map(|s| s.weight.as_str())
        .collect();
    format!(
        "{}  {:<9}  {}  {}{}",
        session.performed_at.format("%Y-%m-%d %H:%M"),
        session.day,
        session.exercise_name,
        weights.join(" / "),
        if session.synced { "" } else { "  (not in sheet)" }
    )
}

pub async fn run_stats(app: &App, exercise: &str) -> Result<()> {
    let all = sessions::exercise_stats(&app.pool).await?;
    let wanted = exercise.trim().to_lowercase();
    let Some((name, stats)) = all.iter().find(|(name, _)| name.to_lowercase() == wanted) else {
        println!("No sessions logged for {exercise:?}.");
        return Ok(());
    };
    print!("{}", render_stats(name, stats));
    Ok(())
}

pub fn render_stats(name: &str, stats: &ExerciseStats) -> String {
    let last = stats
        .last_performed
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "{name}\n  sessions:       {}\n  completed sets: {}\n  total weight:   {}\n  last performed: {last}\n",
        stats.sessions, stats.total_sets, stats.total_weight
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{DOC_URL, test_app};
    use liftgrid_core::auth::{AccessToken, Credential, CredentialStore};
    use liftgrid_store::models::keys;
    use liftgrid_store::queries::settings;
    use liftgrid_test_utils::{FakeGoogle, fixtures};

    async fn app_with_sheet(fake: &FakeGoogle) -> App {
        fake.publish_csv("DOC123", &fixtures::to_csv(&fixtures::weekly_grid()));
        let app = test_app(fake).await;
        settings::put_setting(&app.pool, keys::DOCUMENT_URL, DOC_URL)
            .await
            .unwrap();
        app
    }

    async fn sign_in(app: &App) {
        app.credential_store()
            .save(&Credential {
                access_token: AccessToken::new("cached"),
                refresh_token: Some("rt".to_string()),
                expiry: Utc::now() + chrono::Duration::hours(1),
            })
            .await
            .unwrap();
    }

    #[test]
    fn parse_set_accepts_number_and_weight() {
        let set = parse_set("2=52,5").unwrap();
        assert_eq!(set.set_number, 2);
        assert_eq!(set.weight, "52,5");
        assert!(set.completed);
    }

    #[test]
    fn parse_set_rejects_bad_input() {
        assert!(parse_set("52.5").is_err());
        assert!(parse_set("0=50").is_err());
        assert!(parse_set("two=50").is_err());
        assert!(parse_set("1=").is_err());
    }

    #[tokio::test]
    async fn log_writes_and_marks_session_synced() {
        let fake = FakeGoogle::start().await;
        let app = app_with_sheet(&fake).await;
        sign_in(&app).await;

        run_log(
            &app,
            "squat",
            Weekday::Monday,
            vec![parse_set("1=60").unwrap(), parse_set("2=65").unwrap()],
            false,
        )
        .await
        .unwrap();

        let mut written: Vec<String> = fake.writes().into_iter().map(|w| w.range).collect();
        written.sort();
        assert_eq!(written, vec!["B8".to_string(), "C8".to_string()]);

        let history = sessions::list_recent(&app.pool, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].exercise_name, "Squat");
        assert!(history[0].synced);
    }

    #[tokio::test]
    async fn failed_write_keeps_session_unsynced() {
        let fake = FakeGoogle::start().await;
        fake.fail_range("B8");
        let app = app_with_sheet(&fake).await;
        sign_in(&app).await;

        run_log(&app, "Squat", Weekday::Monday, vec![parse_set("1=60").unwrap()], false)
            .await
            .unwrap();

        let history = sessions::list_recent(&app.pool, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].synced);
    }

    #[tokio::test]
    async fn sets_past_the_span_leave_session_unsynced() {
        let fake = FakeGoogle::start().await;
        let app = app_with_sheet(&fake).await;
        sign_in(&app).await;

        // Monday Squat has three set columns.
        run_log(&app, "Squat", Weekday::Monday, vec![parse_set("5=60").unwrap()], false)
            .await
            .unwrap();

        assert!(fake.writes().is_empty());
        let history = sessions::list_recent(&app.pool, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].synced);
    }

    #[tokio::test]
    async fn configured_range_offsets_written_cells() {
        let fake = FakeGoogle::start().await;
        let mut app = app_with_sheet(&fake).await;
        app.config.range = "B2:Z1000".to_string();
        sign_in(&app).await;

        run_log(&app, "Squat", Weekday::Monday, vec![parse_set("1=60").unwrap()], false)
            .await
            .unwrap();

        let written: Vec<String> = fake.writes().into_iter().map(|w| w.range).collect();
        assert_eq!(written, vec!["C9".to_string()]);
    }

    #[tokio::test]
    async fn manual_log_never_touches_the_sheet() {
        let fake = FakeGoogle::start().await;
        let app = app_with_sheet(&fake).await;

        run_log(&app, "Squat", Weekday::Monday, vec![parse_set("1=60").unwrap()], true)
            .await
            .unwrap();

        assert!(fake.writes().is_empty());
        assert_eq!(fake.code_exchanges() + fake.refreshes(), 0);
        let history = sessions::list_recent(&app.pool, 10).await.unwrap();
        assert!(!history[0].synced);
    }

    #[tokio::test]
    async fn unknown_exercise_is_rejected_before_recording() {
        let fake = FakeGoogle::start().await;
        let app = app_with_sheet(&fake).await;

        let err = run_log(&app, "Deadlift", Weekday::Monday, vec![parse_set("1=100").unwrap()], true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not on the Monday plan"), "{err}");
        assert!(sessions::list_recent(&app.pool, 10).await.unwrap().is_empty());
    }

    #[test]
    fn stats_rendering() {
        let stats = ExerciseStats {
            sessions: 2,
            total_sets: 5,
            total_weight: 312.5,
            last_performed: None,
        };
        let out = render_stats("Squat", &stats);
        assert!(out.starts_with("Squat\n"));
        assert!(out.contains("completed sets: 5"));
        assert!(out.contains("total weight:   312.5"));
        assert!(out.contains("last performed: never"));
    }
}
