//! Planning module.
//!
//! This module holds the plan document model and the diff engine that
//! classifies planned changes against a state.

mod diff;
mod plan;

pub use diff::{DiffEngine, DiffResult, DiffType, ResourceDiff};
pub use plan::{Action, ChangeDetail, PlanDocument, PlannedChange, ResourceChange};
