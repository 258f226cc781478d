//! Runner coordinating one statefix invocation.
//!
//! A run loads the plan, the state and the optional change file, applies the
//! change file to the state, normalizes it, diffs the plan against it and
//! finally writes the corrected state. Nothing is written unless every
//! earlier step succeeded.

use serde::Serialize;
use tracing::{debug, info};

use crate::change::{ChangeEngine, ChangeReport, ValidationWarning};
use crate::config::RunConfig;
use crate::documents::DocumentStore;
use crate::error::Result;
use crate::planner::{DiffEngine, DiffResult};

/// Runner for a single plan/state/change invocation.
pub struct Runner<'a, S: DocumentStore> {
    /// Run configuration.
    config: &'a RunConfig,
    /// Document store.
    store: &'a S,
    /// Change engine.
    change_engine: ChangeEngine,
    /// Diff engine.
    diff_engine: DiffEngine,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Plan classified against the corrected state.
    pub diff: DiffResult,
    /// What the change file did, if one was given.
    pub change: Option<ChangeReport>,
    /// Serial of the corrected state.
    pub serial: u64,
    /// Whether the corrected state was written.
    pub state_written: bool,
}

impl<'a, S: DocumentStore> Runner<'a, S> {
    /// Creates a new runner.
    #[must_use]
    pub const fn new(config: &'a RunConfig, store: &'a S) -> Self {
        Self {
            config,
            store,
            change_engine: ChangeEngine::new(),
            diff_engine: DiffEngine::new(),
        }
    }

    /// Performs the run.
    ///
    /// # Errors
    ///
    /// Returns an error if a required path is missing, a document cannot be
    /// loaded, a change operation fails or the corrected state cannot be
    /// written. The output file is untouched in every failure case except
    /// the last.
    pub async fn run(&self) -> Result<RunReport> {
        self.config.validate()?;
        let plan_path = self.config.plan_path()?;
        let state_path = self.config.state_path()?;

        info!(
            "Starting run with {} backend: plan {}, state {}",
            self.store.backend_type(),
            plan_path.display(),
            state_path.display()
        );

        let plan = self.store.load_plan(plan_path).await?;
        let mut state = self.store.load_state(state_path).await?;
        debug!(
            "State holds {} resource(s), {} instance(s)",
            state.resources.len(),
            state.instance_count()
        );

        let change_file = match self.config.change.as_deref() {
            Some(path) => Some(self.store.load_change(path).await?),
            None => None,
        };

        let change = match &change_file {
            Some(change_file) => {
                let report = self.change_engine.apply(&mut state, change_file)?;
                state.serial += 1;
                info!(
                    "Applied {} operation(s), {} skipped, serial now {}",
                    report.operations.len(),
                    report.skipped,
                    state.serial
                );
                Some(report)
            }
            None => {
                debug!("No change file, state left as loaded");
                None
            }
        };

        state.normalize();

        let diff = self.diff_engine.compute_diff(&plan, &state);
        if diff.has_changes() {
            info!(
                "Plan: {} change(s), {} to add, {} to remove, {} update(s), {} replacement(s)",
                diff.total_changes(),
                diff.additions,
                diff.removals,
                diff.updates,
                diff.replacements.len()
            );
        } else {
            info!(
                "Plan agrees with the state, {} replacement(s)",
                diff.replacements.len()
            );
        }

        let state_written = match self.config.out.as_deref() {
            Some(out) => {
                self.store.save_state(out, &state).await?;
                true
            }
            None => false,
        };

        Ok(RunReport {
            diff,
            change,
            serial: state.serial,
            state_written,
        })
    }
}

impl RunReport {
    /// Returns the validation warnings raised while applying the change file.
    #[must_use]
    pub fn warnings(&self) -> &[ValidationWarning] {
        self.change.as_ref().map_or(&[][..], |c| c.warnings.as_slice())
    }
}
