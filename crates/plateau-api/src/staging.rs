//! # Upload Staging
//!
//! Streams an uploaded multipart file to a uniquely named file in the
//! staging directory. The staged file is removed when its handle drops,
//! unless the archive writer has already consumed it.

use std::io;
use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    bytes: u64,
}

impl StagedUpload {
    /// Write `field`'s body to `{staging_dir}/{uuid}.upload`.
    pub async fn from_field(staging_dir: &Path, mut field: Field<'_>) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(staging_dir)
            .await
            .map_err(|e| staging_failed(staging_dir, e))?;

        let path = staging_dir.join(format!("{}.upload", Uuid::new_v4()));
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| staging_failed(&path, e))?;
        let mut staged = Self { path, bytes: 0 };

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| staging_failed(&staged.path, e))?;
            staged.bytes += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| staging_failed(&staged.path, e))?;

        tracing::debug!(path = %staged.path.display(), bytes = staged.bytes, "upload staged");
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staged upload");
            }
        }
    }
}

fn staging_failed(path: &Path, e: io::Error) -> AppError {
    AppError::Unprocessable(format!("staging upload at {}: {e}", path.display()))
}
