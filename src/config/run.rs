//! Run configuration.
//!
//! The parameter bundle handed from the command line to the runner: where
//! the documents live and how the diff is reported.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{InputError, Result};

/// Paths and switches for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Plan document (required).
    pub plan: Option<PathBuf>,
    /// State document (required).
    pub state: Option<PathBuf>,
    /// Change file to apply before diffing.
    pub change: Option<PathBuf>,
    /// Where to write the corrected state.
    pub out: Option<PathBuf>,
    /// Leave anomalous update lines out of the report.
    pub hide_updates: bool,
}

impl RunConfig {
    /// Creates a configuration for a plan and a state.
    #[must_use]
    pub fn new(plan: impl Into<PathBuf>, state: impl Into<PathBuf>) -> Self {
        Self {
            plan: Some(plan.into()),
            state: Some(state.into()),
            ..Self::default()
        }
    }

    /// Sets the change file.
    #[must_use]
    pub fn with_change(mut self, path: impl Into<PathBuf>) -> Self {
        self.change = Some(path.into());
        self
    }

    /// Sets the output path.
    #[must_use]
    pub fn with_out(mut self, path: impl Into<PathBuf>) -> Self {
        self.out = Some(path.into());
        self
    }

    /// Sets whether updates are hidden.
    #[must_use]
    pub const fn with_hide_updates(mut self, hide_updates: bool) -> Self {
        self.hide_updates = hide_updates;
        self
    }

    /// Makes every relative path absolute against `cwd`.
    ///
    /// Empty paths are treated as not given.
    #[must_use]
    pub fn resolve(self, cwd: &Path) -> Self {
        let absolute = |path: Option<PathBuf>| {
            path.filter(|p| !p.as_os_str().is_empty()).map(|p| {
                if p.is_absolute() {
                    p
                } else {
                    let joined = cwd.join(&p);
                    debug!("Resolved {} to {}", p.display(), joined.display());
                    joined
                }
            })
        };

        Self {
            plan: absolute(self.plan),
            state: absolute(self.state),
            change: absolute(self.change),
            out: absolute(self.out),
            hide_updates: self.hide_updates,
        }
    }

    /// Resolves relative paths against the process working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be determined.
    pub fn resolve_current(self) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(self.resolve(&cwd))
    }

    /// Checks that the required paths are present.
    ///
    /// # Errors
    ///
    /// Returns `MissingPath` for the first required document without a path.
    pub fn validate(&self) -> Result<()> {
        self.plan_path()?;
        self.state_path()?;
        Ok(())
    }

    /// Returns the plan path.
    ///
    /// # Errors
    ///
    /// Returns `MissingPath` if no plan path was given.
    pub fn plan_path(&self) -> Result<&Path> {
        required(self.plan.as_deref(), "plan")
    }

    /// Returns the state path.
    ///
    /// # Errors
    ///
    /// Returns `MissingPath` if no state path was given.
    pub fn state_path(&self) -> Result<&Path> {
        required(self.state.as_deref(), "state")
    }
}

fn required<'a>(path: Option<&'a Path>, kind: &str) -> Result<&'a Path> {
    path.filter(|p| !p.as_os_str().is_empty()).ok_or_else(|| {
        InputError::MissingPath {
            kind: kind.to_string(),
        }
        .into()
    })
}
