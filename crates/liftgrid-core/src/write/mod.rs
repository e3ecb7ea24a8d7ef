//! Writing completed sets back into the originating cells.

pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

pub use types::{CellUpdate, PlanContext, ProgressEntry, SetResult, WriteError, WriteResult};

use crate::auth::{AuthResult, CredentialManager};
use crate::layout::PositionIndex;
use crate::sheets::CellWriter;

/// Resolve the index for `context`, rejecting missing or foreign indexes.
fn positions(context: &PlanContext) -> Result<&PositionIndex, WriteError> {
    match context.positions.as_deref() {
        Some(index) if index.grid_id() == context.grid_id => Ok(index),
        _ => Err(WriteError::StalePlan),
    }
}

/// Cell updates for the completed, non-empty sets of `entry`.
///
/// Set `k` goes to column `start + k - 1`, shifted by the context origin;
/// sets that fall past the end of the exercise's span are dropped. When a
/// set number repeats, the last entry wins so each cell is written once.
pub fn plan_updates(context: &PlanContext, entry: &ProgressEntry) -> Result<Vec<CellUpdate>, WriteError> {
    let index = positions(context)?;
    let span = index
        .get(&entry.exercise_name, entry.day)
        .ok_or_else(|| WriteError::PositionNotFound {
            exercise: entry.exercise_name.clone(),
            day: entry.day,
        })?;

    let mut by_set = BTreeMap::new();
    for set in entry
        .sets
        .iter()
        .filter(|set| set.completed && !set.weight.trim().is_empty())
    {
        let Some(column) = span.column_for_set(set.set_number) else {
            continue;
        };
        by_set.insert(
            set.set_number,
            CellUpdate {
                row: context.origin.row + span.row,
                column: context.origin.column + column,
                value: set.weight.trim().to_owned(),
                exercise_name: entry.exercise_name.clone(),
                set_number: set.set_number,
                day: entry.day,
            },
        );
    }

    Ok(by_set.into_values().collect())
}

/// The degraded result: one `"B3: Squat (set 1) = 50"` line per update.
pub fn manual_instructions(context: &PlanContext, entry: &ProgressEntry) -> Result<WriteResult, WriteError> {
    let instructions = plan_updates(context, entry)?
        .iter()
        .map(CellUpdate::instruction)
        .collect();
    Ok(WriteResult::Manual { instructions })
}

/// Writes progress entries through an authorized [`CellWriter`].
pub struct WriteCoordinator {
    auth: Arc<CredentialManager>,
    writer: Arc<dyn CellWriter>,
}

impl WriteCoordinator {
    pub fn new(auth: Arc<CredentialManager>, writer: Arc<dyn CellWriter>) -> Self {
        Self { auth, writer }
    }

    /// Write the completed sets of `entry` into the document.
    ///
    /// Authorization happens only when there is something to write, and all
    /// cells are written concurrently once a token is in hand.
    pub async fn write_progress(
        &self,
        context: &PlanContext,
        entry: &ProgressEntry,
    ) -> Result<WriteResult, WriteError> {
        let updates = plan_updates(context, entry)?;
        if updates.is_empty() {
            info!(exercise = %entry.exercise_name, day = %entry.day, "no completed sets to write");
            return Ok(WriteResult::Written {
                positions: Vec::new(),
            });
        }

        let token = match self.auth.authenticate().await? {
            AuthResult::Authorized { token, .. } => token,
            AuthResult::Failed(failure) => {
                warn!(code = failure.code(), "write skipped, not authorized");
                return Ok(WriteResult::Unauthorized(failure));
            }
        };

        let sheet = context.sheet_name.as_deref();
        let addresses: Vec<String> = updates
            .iter()
            .map(|u| u.address(sheet).to_string())
            .collect();

        let writes = updates.iter().zip(&addresses).map(|(update, address)| {
            self.writer
                .update_cell(&context.document_id, address, &update.value, &token)
        });
        let outcomes = join_all(writes).await;

        let mut failed = Vec::new();
        let mut first_error = None;
        for (address, outcome) in addresses.iter().zip(outcomes) {
            if let Err(e) = outcome {
                warn!(document_id = %context.document_id, address = %address, error = %e, "cell update failed");
                first_error.get_or_insert_with(|| e.to_string());
                failed.push(address.clone());
            }
        }

        if failed.is_empty() {
            info!(
                document_id = %context.document_id,
                exercise = %entry.exercise_name,
                day = %entry.day,
                cells = addresses.len(),
                "progress written"
            );
            return Ok(WriteResult::Written {
                positions: addresses,
            });
        }

        Ok(WriteResult::PartiallyFailed {
            message: format!(
                "{} of {} cell updates failed: {}",
                failed.len(),
                addresses.len(),
                first_error.unwrap_or_default()
            ),
            failed,
            attempted: addresses.len(),
        })
    }
}
