use anyhow::{Context, Result};
use chrono::Local;

use liftgrid_core::layout::{ExerciseRecord, Weekday, WorkoutPlan};

use crate::app::App;

/// Which part of the week to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySelection {
    Week,
    Day(Weekday),
}

impl DaySelection {
    pub fn from_flags(day: Option<Weekday>, today: bool) -> Self {
        match (day, today) {
            (Some(day), _) => Self::Day(day),
            (None, true) => Self::Day(today_weekday()),
            (None, false) => Self::Week,
        }
    }
}

pub fn today_weekday() -> Weekday {
    chrono::Datelike::weekday(&Local::now().date_naive()).into()
}

pub async fn run_plan(app: &App, selection: DaySelection, json: bool) -> Result<()> {
    let loaded = app.load_sheet().await?;
    let plan = &loaded.layout.plan;

    if json {
        let out = match selection {
            DaySelection::Week => serde_json::to_string_pretty(plan),
            DaySelection::Day(day) => serde_json::to_string_pretty(plan.day(day)),
        }
        .context("failed to serialize plan")?;
        println!("{out}");
        return Ok(());
    }

    print!("{}", render_plan(plan, selection));
    Ok(())
}

/// Human-readable plan, one block per day.
pub fn render_plan(plan: &WorkoutPlan, selection: DaySelection) -> String {
    let days: Vec<Weekday> = match selection {
        DaySelection::Week => Weekday::ALL.to_vec(),
        DaySelection::Day(day) => vec![day],
    };

    let mut out = String::new();
    for day in days {
        out.push_str(day.as_str());
        out.push('\n');
        let exercises = plan.day(day);
        if exercises.is_empty() {
            out.push_str("  rest\n");
        }
        for exercise in exercises {
            out.push_str("  ");
            out.push_str(&render_exercise(exercise));
            out.push('\n');
        }
    }
    out
}

fn render_exercise(exercise: &ExerciseRecord) -> String {
    let mut line = format!("{}: {} sets", exercise.name, exercise.set_count);
    if !exercise.reps_spec.is_empty() {
        line.push_str(&format!(" x {}", exercise.reps_spec));
    }
    if !exercise.muscle_group.is_empty() {
        line.push_str(&format!(" [{}]", exercise.muscle_group));
    }
    if !exercise.specialty_note.is_empty() {
        line.push_str(&format!(" ({})", exercise.specialty_note));
    }
    line
}
