//! Position index construction.

use tracing::debug;

use super::exercises::{exercise_name, is_exercise_row};
use super::types::{CellSpan, DayBlock, PositionIndex, Vocabulary, contains_label};
use crate::grid::Grid;

/// How far above a weight row the owning exercise row may sit.
const MAX_LOOKBACK: usize = 10;

/// Map every `(exercise, day)` to the weight row and block span its set
/// values are written into.
///
/// Weight rows are found independently of the plan: each one walks up to
/// the nearest exercise row and reads the exercise name at every block's
/// start column. Later weight rows overwrite earlier entries for the same
/// key.
pub fn build_position_index(grid: &Grid, blocks: &[DayBlock], vocab: &Vocabulary) -> PositionIndex {
    let mut index = PositionIndex::new(grid.id());

    for row in 1..grid.len() {
        if !contains_label(grid.cell(row, 0), vocab.weight) {
            continue;
        }

        let Some(exercise_row) = owning_exercise_row(grid, row, vocab) else {
            debug!(row, "weight row has no exercise row within reach, skipping");
            continue;
        };

        for block in blocks {
            let Some(name) = exercise_name(grid, exercise_row, block.start_column, vocab) else {
                continue;
            };
            let span = CellSpan {
                row,
                start_column: block.start_column,
                end_column: block.end_column,
            };
            if let Some(previous) = index.insert(name, block.day, span) {
                debug!(
                    exercise = %name,
                    day = %block.day,
                    previous_row = previous.row,
                    row,
                    "duplicate exercise position, keeping the later row"
                );
            }
        }
    }

    index
}

/// Nearest exercise row above `row`, looking back at most [`MAX_LOOKBACK`]
/// rows and never into the header.
fn owning_exercise_row(grid: &Grid, row: usize, vocab: &Vocabulary) -> Option<usize> {
    let lowest = row.saturating_sub(MAX_LOOKBACK).max(1);
    (lowest..row).rev().find(|&r| is_exercise_row(grid, r, vocab))
}
