use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthError, AuthFailure};
use crate::grid::Grid;
use crate::layout::{PositionIndex, Weekday};
use crate::sheets::CellAddress;

/// Result of one set as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetResult {
    /// 1-based.
    pub set_number: u32,
    pub weight: String,
    #[serde(default)]
    pub reps: Option<String>,
    pub completed: bool,
}

/// Completed sets of one exercise on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub exercise_name: String,
    pub day: Weekday,
    pub sets: Vec<SetResult>,
}

/// Everything a write needs to know about the document it targets.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub document_id: String,
    /// Fetch identifier of the grid the plan was inferred from.
    pub grid_id: Uuid,
    pub positions: Option<Arc<PositionIndex>>,
    /// Sheet to qualify addresses with; `None` targets the first sheet.
    pub sheet_name: Option<String>,
    /// Sheet cell that grid cell `(0, 0)` was fetched from.
    pub origin: CellAddress,
}

impl PlanContext {
    pub fn new(document_id: impl Into<String>, grid: &Grid, positions: Option<Arc<PositionIndex>>) -> Self {
        Self {
            document_id: document_id.into(),
            grid_id: grid.id(),
            positions,
            sheet_name: None,
            origin: CellAddress::new(0, 0),
        }
    }

    /// Offset every write by the top-left cell of the fetched range.
    pub fn with_origin(mut self, origin: CellAddress) -> Self {
        self.origin = CellAddress::new(origin.row, origin.column);
        self
    }

    pub fn with_sheet_name(mut self, sheet: Option<String>) -> Self {
        self.sheet_name = sheet.filter(|s| !s.is_empty());
        self
    }
}

/// A single cell write derived from a completed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellUpdate {
    /// 0-based sheet row, origin applied.
    pub row: usize,
    /// 0-based sheet column, origin applied.
    pub column: usize,
    pub value: String,
    pub exercise_name: String,
    pub set_number: u32,
    pub day: Weekday,
}

impl CellUpdate {
    pub fn address(&self, sheet: Option<&str>) -> CellAddress {
        CellAddress::new(self.row, self.column).on_sheet(sheet)
    }

    /// `B3: Squat (set 1) = 50`
    pub fn instruction(&self) -> String {
        format!(
            "{}: {} (set {}) = {}",
            CellAddress::new(self.row, self.column).a1(),
            self.exercise_name,
            self.set_number,
            self.value
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteResult {
    /// Every update landed. `positions` are the A1 addresses written.
    Written { positions: Vec<String> },
    /// Some updates failed; the ones that landed are not rolled back.
    PartiallyFailed {
        failed: Vec<String>,
        attempted: usize,
        message: String,
    },
    /// Authorization did not produce a token; nothing was written.
    Unauthorized(AuthFailure),
    /// Degraded result: the user copies these values by hand.
    Manual { instructions: Vec<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("plan is stale: no position index for the current document snapshot; fetch it again")]
    StalePlan,

    #[error("no position for {exercise:?} on {day}")]
    PositionNotFound { exercise: String, day: Weekday },

    #[error(transparent)]
    Auth(#[from] AuthError),
}
