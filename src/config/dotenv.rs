//! `.env` loading.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{InputError, Result};

/// Loads `<dir>/.env` into the process environment if it exists.
///
/// Variables already set in the environment win. Returns whether a file
/// was loaded.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_dotenv(dir: &Path) -> Result<bool> {
    let env_path = dir.join(".env");

    if !env_path.exists() {
        debug!(".env file not found at: {}", env_path.display());
        return Ok(false);
    }

    info!("Loading environment from: {}", env_path.display());
    dotenvy::from_path(&env_path).map_err(|e| {
        InputError::parse(
            ".env",
            format!("failed to load .env file: {e}"),
            Some(env_path.display().to_string()),
        )
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dotenv_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!load_dotenv(dir.path()).unwrap());
    }

    #[test]
    fn test_malformed_dotenv() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), "STATEFIX_TEST='unterminated\n").unwrap();
        let err = load_dotenv(dir.path()).unwrap_err();
        assert!(err.is_input_error());
    }
}
