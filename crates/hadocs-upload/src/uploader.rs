//! Batch submission of the approved files.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::DocumentBackend;
use crate::error::{UploadError, UploadResult};
use crate::model::{DroppedFile, UploadOutcome, UploadPlan};

/// Boundary line and part headers added around each file.
pub const MULTIPART_PART_OVERHEAD: u64 = 192;
/// Closing boundary of a multipart body.
pub const MULTIPART_CLOSING_OVERHEAD: u64 = 72;

/// Upper estimate of the multipart body carrying `files`.
#[must_use]
pub fn multipart_body_estimate(files: &[DroppedFile]) -> u64 {
    files.iter().fold(MULTIPART_CLOSING_OVERHEAD, |total, file| {
        let name = u64::try_from(file.name().len()).unwrap_or(u64::MAX);
        total
            .saturating_add(file.size())
            .saturating_add(MULTIPART_PART_OVERHEAD)
            .saturating_add(name)
    })
}

/// Sends an [`UploadPlan`] as one multipart request and merges the bookkeeping.
#[derive(Clone)]
pub struct BatchUploader {
    backend: Arc<dyn DocumentBackend>,
    max_upload_bytes: u64,
}

impl BatchUploader {
    /// Build an uploader enforcing `max_upload_bytes` per file and per batch.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>, max_upload_bytes: u64) -> Self {
        Self {
            backend,
            max_upload_bytes,
        }
    }

    /// Submit the plan.
    ///
    /// An empty upload set short-circuits to a synthetic success without any
    /// network call. A reply the server marks `success: false` is returned as
    /// an outcome with that flag so its per-file report is kept.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::PayloadTooLarge`] before sending when the
    /// estimated request body exceeds the ceiling, and any transport or status
    /// error from the backend.
    pub async fn submit(&self, plan: UploadPlan) -> UploadResult<UploadOutcome> {
        let uploaded = plan.upload_names();
        let (to_upload, to_skip) = plan.into_parts();
        if to_upload.is_empty() {
            debug!(skipped = to_skip.len(), "nothing to upload");
            return Ok(UploadOutcome::nothing_uploaded(to_skip));
        }

        self.enforce_limit(&to_upload)?;

        let response = self.backend.upload_documents(&to_upload).await?;
        let outcome = UploadOutcome::merge(response, uploaded, to_skip);
        if outcome.success {
            info!(
                uploaded = outcome.uploaded_files.len(),
                skipped = outcome.skipped_files.len(),
                "document batch uploaded"
            );
        } else {
            warn!(message = %outcome.message, "server reported the batch as failed");
        }
        Ok(outcome)
    }

    fn enforce_limit(&self, files: &[DroppedFile]) -> UploadResult<()> {
        let limit = self.max_upload_bytes;
        for file in files {
            let size = file.size();
            if size > limit {
                return Err(UploadError::PayloadTooLarge {
                    filename: Some(file.name().to_string()),
                    size,
                    limit,
                });
            }
        }
        let total = multipart_body_estimate(files);
        if total > limit {
            return Err(UploadError::PayloadTooLarge {
                filename: None,
                size: total,
                limit,
            });
        }
        Ok(())
    }
}
