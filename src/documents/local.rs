//! Local file-based document store.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{InputError, Result};

use super::store::{Document, DocumentStore};

/// Reads and writes documents on the local filesystem.
#[derive(Debug, Default)]
pub struct LocalDocumentStore;

impl LocalDocumentStore {
    /// Creates a new local document store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the temporary sibling a write goes through.
    fn temp_path(path: &Path) -> Result<PathBuf> {
        let mut name: OsString = path
            .file_name()
            .ok_or_else(|| InputError::WriteFailed {
                path: path.to_path_buf(),
                message: String::from("path has no file name"),
            })?
            .to_os_string();
        name.push(".tmp");
        Ok(path.with_file_name(name))
    }

    /// Ensures the parent directory of `path` exists.
    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                debug!("Creating directory: {}", parent.display());
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| write_failed(path, &format!("failed to create directory: {e}")))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn read_document(&self, document: Document, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(InputError::FileNotFound {
                document: document.to_string(),
                path: path.to_path_buf(),
            }
            .into());
        }

        info!("Loading {document} from: {}", path.display());

        let content = fs::read_to_string(path).await.map_err(|e| InputError::ReadFailed {
            document: document.to_string(),
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(content)
    }

    async fn write_document(&self, path: &Path, contents: &str) -> Result<()> {
        Self::ensure_parent(path).await?;

        info!("Saving state to: {}", path.display());

        // Write to a temporary file first, then rename for atomicity
        let temp_path = Self::temp_path(path)?;

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| write_failed(path, &format!("failed to create temp file: {e}")))?;

        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| write_failed(path, &e.to_string()))?;

        file.sync_all()
            .await
            .map_err(|e| write_failed(path, &format!("failed to sync: {e}")))?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| write_failed(path, &format!("failed to rename temp file: {e}")))?;

        debug!("State saved successfully");
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

fn write_failed(path: &Path, message: &str) -> InputError {
    InputError::WriteFailed {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatefixError;
    use crate::state::State;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load_state() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("out").join("state.json");
        let store = LocalDocumentStore::new();

        let state = State {
            serial: 7,
            lineage: String::from("lineage"),
            ..State::default()
        };
        store.save_state(&path, &state).await.expect("Failed to save state");

        let loaded = store.load_state(&path).await.expect("Failed to load state");
        assert_eq!(loaded, state);
        assert!(!path.with_file_name("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = LocalDocumentStore::new();

        let err = store
            .load_plan(&temp.path().join("plan.json"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StatefixError::Input(InputError::FileNotFound { ref document, .. }) if document == "plan"
        ));
    }

    #[tokio::test]
    async fn test_load_change_file() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("change.yaml");
        std::fs::write(
            &path,
            "operations:\n  - operation: upgrade_terraform\n    terraform_version: 1.6.0\n",
        )
        .expect("Failed to write change file");

        let change = LocalDocumentStore::new()
            .load_change(&path)
            .await
            .expect("Failed to load change file");
        assert_eq!(change.operations[0].kind(), "upgrade_terraform");
    }

    #[tokio::test]
    async fn test_save_replaces_existing_file() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("state.json");
        std::fs::write(&path, "old").expect("Failed to write file");

        LocalDocumentStore::new()
            .write_document(&path, "new")
            .await
            .expect("Failed to write document");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
