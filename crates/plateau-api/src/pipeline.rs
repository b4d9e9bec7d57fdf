//! # Asset Pipeline
//!
//! Service layer between the HTTP handlers and the archive engine. Each
//! operation validates its inputs, runs the blocking archive work on the
//! blocking pool under the configured request deadline, records metrics,
//! and keeps the record store consistent with the archives.
//!
//! Record changes that follow an archive change happen under that
//! archive's write lock:
//!
//! - a record is stored right after its archive commits, so the surviving
//!   record always describes the archive on disk;
//! - a record is removed right before its archive is deleted, and only if
//!   it still owns the archive.
//!
//! A deadline stops the request from waiting but does not cancel the
//! blocking task already running. An upload that finishes late is still
//! recorded. Scoped handles returned by a task that finishes late are
//! dropped, which removes their files.

use plateau_archive::{probe, sniff_content_type, ArchiveError, ExtractedFile};
use plateau_core::{AssetKey, Purpose, Timestamp};
use uuid::Uuid;

use crate::error::AppError;
use crate::records::{AssetRecord, RecordPatch};
use crate::staging::StagedUpload;
use crate::state::AppState;

/// A staged upload with its form fields.
#[derive(Debug)]
pub struct Ingest {
    pub subject_name: String,
    pub purpose_tag: String,
    pub role: Option<String>,
    pub upload: StagedUpload,
}

/// An extracted asset ready to be streamed. The file is removed when this
/// value (or the body that takes over `file`) is dropped.
#[derive(Debug)]
pub struct ServedAsset {
    pub record: AssetRecord,
    pub content_type: &'static str,
    pub file: ExtractedFile,
}

/// Probe, archive, and record an upload.
pub async fn ingest(state: &AppState, request: Ingest) -> Result<AssetRecord, AppError> {
    let Ingest {
        subject_name,
        purpose_tag,
        role,
        upload,
    } = request;

    let purpose: Purpose = purpose_tag.trim().parse()?;
    let key = AssetKey::derive(&subject_name)?;

    let archives = state.archives.clone();
    let records = state.records.clone();
    let (archived, record, displaced) = run_blocking(state, "archive", move || {
        let report = probe(upload.path())?;
        let (archived, (record, displaced)) =
            archives.archive_then(upload.path(), &key, purpose, |_| {
                let now = Timestamp::now();
                let record = AssetRecord {
                    id: Uuid::new_v4(),
                    subject_name,
                    purpose,
                    file_link: key.clone(),
                    role: role.filter(|r| !r.trim().is_empty()),
                    content_type: report.content_type.to_string(),
                    width: report.dimensions.width,
                    height: report.dimensions.height,
                    created_at: now,
                    updated_at: now,
                };
                let displaced = records.store(record.clone());
                (record, displaced)
            })?;
        Ok((archived, record, displaced))
    })
    .await?;
    state.metrics.record_archive_written(archived.source_bytes);

    for old in displaced {
        tracing::info!(id = %old.id, replaced_by = %record.id, "record displaced by new upload");
    }
    tracing::info!(
        id = %record.id,
        key = %record.file_link,
        purpose = %record.purpose,
        width = record.width,
        height = record.height,
        "asset ingested"
    );
    Ok(record)
}

/// Extract the asset behind record `id` for serving.
pub async fn open(state: &AppState, id: Uuid) -> Result<ServedAsset, AppError> {
    let record = find(state, id)?;

    let archives = state.archives.clone();
    let key = record.file_link.clone();
    let purpose = record.purpose;
    let (file, content_type) = run_blocking(state, "extract", move || {
        let file = archives.extract(&key, purpose)?;
        let content_type = sniff_content_type(file.path())?;
        Ok((file, content_type))
    })
    .await?;
    state.metrics.record_extraction();

    Ok(ServedAsset {
        record,
        content_type,
        file,
    })
}

/// Look up record `id`.
pub fn find(state: &AppState, id: Uuid) -> Result<AssetRecord, AppError> {
    state
        .records
        .get_by_id(&id)
        .ok_or_else(|| AppError::NotFound(format!("image {id} not found")))
}

/// Apply `patch` to record `id`.
pub fn update(state: &AppState, id: Uuid, patch: &RecordPatch) -> Result<AssetRecord, AppError> {
    state
        .records
        .update_by_id(&id, patch)
        .ok_or_else(|| AppError::NotFound(format!("image {id} not found")))
}

/// Delete record `id` and the archive it owns.
///
/// If a newer upload displaced the record after it was looked up, the
/// newer upload's archive is left alone and the record is reported missing.
pub async fn remove(state: &AppState, id: Uuid) -> Result<AssetRecord, AppError> {
    let record = find(state, id)?;

    let archives = state.archives.clone();
    let records = state.records.clone();
    let removed = run_blocking(state, "remove", move || {
        archives.remove_if(&record.file_link, record.purpose, || {
            records.remove_by_id(&id)
        })
    })
    .await?;

    match removed {
        Some((record, existed)) => {
            if !existed {
                tracing::warn!(%id, "record had no archive");
            }
            Ok(record)
        }
        None => Err(AppError::NotFound(format!("image {id} not found"))),
    }
}

/// Run `work` on the blocking pool, bounded by the request deadline.
async fn run_blocking<T, F>(state: &AppState, operation: &'static str, work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ArchiveError> + Send + 'static,
{
    let deadline = state.config.request_timeout();
    let task = tokio::task::spawn_blocking(work);

    match tokio::time::timeout(deadline, task).await {
        Err(_) => {
            state.metrics.record_pipeline_failure(operation, "timeout");
            Err(AppError::Timeout(format!(
                "{operation} did not finish within {}s",
                deadline.as_secs()
            )))
        }
        Ok(Err(join)) => {
            state.metrics.record_pipeline_failure(operation, "panic");
            Err(AppError::Internal(format!("{operation} task failed: {join}")))
        }
        Ok(Ok(Err(e))) => {
            state.metrics.record_pipeline_failure(operation, e.kind());
            Err(e.into())
        }
        Ok(Ok(Ok(value))) => Ok(value),
    }
}
