//! Header classification: which columns belong to which weekday.

use super::types::{DayBlock, Vocabulary, Weekday};
use crate::grid::Grid;

/// Find one block per weekday present in the header, in weekday order.
///
/// The first header cell mentioning a weekday starts its block; the block
/// runs right through every following blank (or whitespace-only) cell.
pub fn detect_day_blocks(grid: &Grid, vocab: &Vocabulary) -> Vec<DayBlock> {
    let header = grid.header();
    let mut blocks = Vec::new();

    for day in Weekday::ALL {
        let Some(start) = header
            .iter()
            .position(|cell| vocab.weekday_of(cell) == Some(day))
        else {
            continue;
        };

        let mut end = start + 1;
        while end < header.len() && header[end].trim().is_empty() {
            end += 1;
        }

        blocks.push(DayBlock {
            day,
            start_column: start,
            end_column: end,
        });
    }

    blocks
}

/// Reduce free-form header text such as `"Monday - chest & biceps"` to its
/// weekday. Tries every built-in vocabulary.
pub fn normalize_day_name(text: &str) -> Option<Weekday> {
    [Vocabulary::english(), Vocabulary::russian()]
        .iter()
        .find_map(|vocab| vocab.weekday_of(text))
}
