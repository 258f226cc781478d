//! Document store trait definition.
//!
//! This module defines the common interface for document storage backends.

use std::path::Path;

use async_trait::async_trait;

use crate::change::ChangeFile;
use crate::error::Result;
use crate::planner::PlanDocument;
use crate::state::State;

use super::parser;

/// The kinds of document a run reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    /// Plan document.
    Plan,
    /// State document.
    State,
    /// Change file.
    Change,
}

/// Trait for document storage backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document's raw contents.
    async fn read_document(&self, document: Document, path: &Path) -> Result<String>;

    /// Writes raw contents to `path`, replacing whatever is there.
    async fn write_document(&self, path: &Path, contents: &str) -> Result<()>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;

    /// Loads and parses a plan document.
    async fn load_plan(&self, path: &Path) -> Result<PlanDocument> {
        let content = self.read_document(Document::Plan, path).await?;
        parser::parse_plan(&content, Some(path))
    }

    /// Loads and parses a state document.
    async fn load_state(&self, path: &Path) -> Result<State> {
        let content = self.read_document(Document::State, path).await?;
        parser::parse_state(&content, Some(path))
    }

    /// Loads and parses a change file.
    async fn load_change(&self, path: &Path) -> Result<ChangeFile> {
        let content = self.read_document(Document::Change, path).await?;
        parser::parse_change(&content, Some(path))
    }

    /// Renders and saves a state document.
    async fn save_state(&self, path: &Path, state: &State) -> Result<()> {
        let content = parser::render_state(state)?;
        self.write_document(path, &content).await
    }
}

impl Document {
    /// Returns the document name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::State => "state",
            Self::Change => "change",
        }
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
