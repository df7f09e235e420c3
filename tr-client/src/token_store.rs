//! Loads and atomically persists the `{session, refresh}` token pair.

use std::io::Write;
use std::path::{Path, PathBuf};

use tr_types::TokenPair;

use crate::error::StorageError;

/// A scoped key-value blob at a fixed filesystem path.
///
/// `load` treats a missing file as an absent token pair, not an error; `save` replaces
/// the file atomically (write-temp-then-rename) so a crash mid-write never leaves a
/// partial file that `load` could misparse.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Scopes the store to `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the persisted token pair, or `None` if no file exists yet.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Option<TokenPair>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let tokens = serde_json::from_slice(&bytes)?;
                Ok(Some(tokens))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no token file yet");
                Ok(None)
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Atomically replaces the persisted token pair.
    #[tracing::instrument(skip(self, tokens), fields(path = %self.path.display()))]
    pub fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        let bytes = serde_json::to_vec(tokens)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&self.path)?;
        tracing::debug!("persisted token pair");
        Ok(())
    }
}
