//! Layout inference: turn a free-form workout grid into a plan and a
//! position index.
//!
//! The grid has no schema. Row 0 holds weekday headers, column 0 holds
//! row labels ("Exercise", "Reps", "Weight", ...), and each weekday owns
//! the columns from its header cell up to the next non-empty header cell.
//! All coordinates are 0-based; A1 conversion happens in [`crate::sheets`].

pub mod days;
pub mod exercises;
pub mod positions;
pub mod types;

use tracing::info;

pub use days::{detect_day_blocks, normalize_day_name};
pub use types::{
    CellSpan, DayBlock, ExerciseRecord, InferredLayout, LayoutError, PositionIndex, RepsRange,
    Vocabulary, Weekday, WeekdayParseError, WorkoutPlan,
};

use crate::grid::Grid;

/// Infer the plan, position index and day blocks of `grid`.
///
/// Fails only when there is no data row below the header. A grid without
/// any recognizable weekday yields an all-rest plan and an empty index.
pub fn infer(grid: &Grid, vocab: &Vocabulary) -> Result<InferredLayout, LayoutError> {
    if grid.len() < 2 {
        return Err(LayoutError::InsufficientData { rows: grid.len() });
    }

    let day_blocks = detect_day_blocks(grid, vocab);
    let plan = exercises::scan_exercises(grid, &day_blocks, vocab);
    let positions = positions::build_position_index(grid, &day_blocks, vocab);

    info!(
        grid_id = %grid.id(),
        vocabulary = vocab.name,
        days = day_blocks.len(),
        exercises = plan.exercise_count(),
        positions = positions.len(),
        "layout inferred"
    );

    Ok(InferredLayout {
        plan,
        positions,
        day_blocks,
    })
}
