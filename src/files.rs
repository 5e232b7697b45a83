//! Attachment storage.
//!
//! The services hand a file name and its bytes to a [`FileStorage`] and persist
//! the stored name it returns. [`LocalFileStorage`] writes into a directory that
//! is also served statically under `/uploads`.

use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

lazy_static! {
    // Anything outside this set is replaced in stored names.
    static ref UNSAFE_NAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]").unwrap();
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File name is not usable: {0:?}")]
    InvalidName(String),

    #[error("File storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores `bytes` for the todo `owner_record` and returns the stored name.
    async fn save(
        &self,
        owner_record: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError>;

    /// Removes a previously stored file. Missing files are not an error.
    async fn remove(&self, stored_name: &str) -> Result<(), StorageError>;
}

/// Reduces a client-supplied file name to a safe base name.
///
/// Directory components are dropped and unusual characters replaced, so the
/// result can never escape the upload directory.
pub fn sanitize_file_name(original_name: &str) -> Result<String, StorageError> {
    let base = original_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned = UNSAFE_NAME_CHARS.replace_all(base, "_").to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(StorageError::InvalidName(original_name.to_string()));
    }
    Ok(cleaned)
}

/// Stores files as `<unix-millis>-<random>-<base name>` under a root directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn unique_name(base: &str) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", Utc::now().timestamp_millis(), &nonce[..8], base)
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(
        &self,
        owner_record: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let stored_name = Self::unique_name(&sanitize_file_name(original_name)?);
        let destination = self.root.join(&stored_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        log::info!(
            "stored attachment {} ({} bytes) for todo {}",
            stored_name,
            bytes.len(),
            owner_record
        );
        Ok(stored_name)
    }

    async fn remove(&self, stored_name: &str) -> Result<(), StorageError> {
        let base = sanitize_file_name(stored_name)?;
        match tokio::fs::remove_file(self.root.join(base)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
