//! In-memory document store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{InputError, Result, StatefixError};

use super::store::{Document, DocumentStore};

/// Keeps documents in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document.
    #[must_use]
    pub fn with_document(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(path.into(), contents.into());
        }
        self
    }

    /// Returns the contents stored at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<String> {
        self.documents.lock().ok()?.get(path).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read_document(&self, document: Document, path: &Path) -> Result<String> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| StatefixError::internal("document store lock poisoned"))?;
        documents.get(path).cloned().ok_or_else(|| {
            InputError::FileNotFound {
                document: document.to_string(),
                path: path.to_path_buf(),
            }
            .into()
        })
    }

    async fn write_document(&self, path: &Path, contents: &str) -> Result<()> {
        self.documents
            .lock()
            .map_err(|_| StatefixError::internal("document store lock poisoned"))?
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
