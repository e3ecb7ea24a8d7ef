//! Exercise-row scanning and attribute resolution.
//!
//! Everything here is a pure function over an immutable [`Grid`].

use std::ops::Range;

use super::types::{
    DayBlock, ExerciseRecord, Vocabulary, WorkoutPlan, contains_label, numbers,
};
use crate::grid::Grid;

/// Rows above and below an exercise row searched for its muscle group.
const GROUP_RADIUS: usize = 5;
/// Rows from the exercise row downward searched for the other attributes.
const ATTRIBUTE_WINDOW: usize = 10;

/// Build the plan from every day block.
pub fn scan_exercises(grid: &Grid, blocks: &[DayBlock], vocab: &Vocabulary) -> WorkoutPlan {
    let mut plan = WorkoutPlan::new();
    for block in blocks {
        for row in exercise_rows(grid, vocab) {
            if let Some(record) = read_exercise(grid, block, row, vocab) {
                plan.push(record);
            }
        }
    }
    plan
}

/// Data rows whose label cell names an exercise.
pub(crate) fn exercise_rows<'a>(
    grid: &'a Grid,
    vocab: &'a Vocabulary,
) -> impl Iterator<Item = usize> + 'a {
    (1..grid.len()).filter(move |&r| is_exercise_row(grid, r, vocab))
}

pub(crate) fn is_exercise_row(grid: &Grid, row: usize, vocab: &Vocabulary) -> bool {
    contains_label(grid.cell(row, 0), vocab.exercise)
}

/// Trimmed exercise name at `(row, column)`, unless it is blank or a rest marker.
pub(crate) fn exercise_name<'a>(
    grid: &'a Grid,
    row: usize,
    column: usize,
    vocab: &Vocabulary,
) -> Option<&'a str> {
    let name = grid.cell(row, column).trim();
    (!name.is_empty() && !vocab.is_rest(name)).then_some(name)
}

fn read_exercise(
    grid: &Grid,
    block: &DayBlock,
    row: usize,
    vocab: &Vocabulary,
) -> Option<ExerciseRecord> {
    let name = exercise_name(grid, row, block.start_column, vocab)?;
    let column = block.start_column;

    let group_rows = row.saturating_sub(GROUP_RADIUS)..(row + GROUP_RADIUS + 1).min(grid.len());
    let below = row..(row + ATTRIBUTE_WINDOW).min(grid.len());

    let lookup = |rows: Range<usize>, label: &str| -> String {
        labelled_value(grid, rows, label, column)
            .unwrap_or_default()
            .to_owned()
    };

    let set_count = labelled_value(grid, below.clone(), vocab.sets, column)
        .and_then(|cell| numbers(cell).find(|n| *n > 0))
        .unwrap_or(ExerciseRecord::DEFAULT_SET_COUNT);

    Some(ExerciseRecord {
        name: name.to_owned(),
        muscle_group: lookup(group_rows, vocab.group),
        set_count,
        reps_spec: lookup(below.clone(), vocab.reps),
        video_url: lookup(below.clone(), vocab.link),
        specialty_note: lookup(below, vocab.specialty),
        day: block.day,
        source_row: row,
    })
}

/// Value in `column` of the first row in `rows` whose label cell contains `label`.
fn labelled_value<'a>(
    grid: &'a Grid,
    rows: Range<usize>,
    label: &str,
    column: usize,
) -> Option<&'a str> {
    rows.into_iter()
        .find(|&r| contains_label(grid.cell(r, 0), label))
        .map(|r| grid.cell(r, column).trim())
}
