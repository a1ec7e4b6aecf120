//! Reconcile + submit, the single entry point used by drop surfaces.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::DocumentBackend;
use crate::config::UploadConfig;
use crate::engine::ReconciliationEngine;
use crate::error::UploadResult;
use crate::model::{CycleState, CycleTracker, DroppedBatch, UploadOutcome, UploadPlan};
use crate::probe::ExistenceProber;
use crate::resolver::ConflictHandler;
use crate::uploader::BatchUploader;

/// Full reconciliation + upload cycle over one backend.
#[derive(Clone)]
pub struct UploadPipeline {
    engine: ReconciliationEngine,
    uploader: BatchUploader,
    tracker: CycleTracker,
}

impl UploadPipeline {
    /// Wire prober, engine, and uploader around `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>, config: &UploadConfig) -> Self {
        let prober = ExistenceProber::new(Arc::clone(&backend), config.probe_timeout);
        Self {
            engine: ReconciliationEngine::new(prober),
            uploader: BatchUploader::new(backend, config.max_upload_bytes),
            tracker: CycleTracker::new(),
        }
    }

    /// Observe cycle transitions (probing, resolving, uploading, done, failed).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.tracker.subscribe()
    }

    /// Current cycle state.
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.tracker.current()
    }

    /// Reconcile only; useful for previews.
    pub async fn reconcile(
        &self,
        batch: &DroppedBatch,
        handler: &dyn ConflictHandler,
    ) -> UploadPlan {
        self.engine.reconcile(batch, handler, &self.tracker).await
    }

    /// Submit a plan produced by [`Self::reconcile`].
    ///
    /// # Errors
    ///
    /// Propagates [`BatchUploader::submit`] failures.
    pub async fn submit(&self, plan: UploadPlan) -> UploadResult<UploadOutcome> {
        self.uploader.submit(plan).await
    }

    /// Run a complete cycle for `batch`, asking `handler` about each conflict.
    ///
    /// An empty batch returns a "nothing to do" outcome without any probe,
    /// prompt, or upload.
    ///
    /// # Errors
    ///
    /// Returns the submission error when the final upload fails; the whole
    /// batch is then considered not uploaded.
    pub async fn upload_with_confirmation(
        &self,
        batch: &DroppedBatch,
        handler: &dyn ConflictHandler,
    ) -> UploadResult<UploadOutcome> {
        if batch.is_empty() {
            return Ok(UploadOutcome::nothing_uploaded(Vec::new()));
        }

        let plan = self.reconcile(batch, handler).await;
        if !plan.to_upload().is_empty() {
            self.tracker.set(CycleState::Uploading {
                files: plan.to_upload().len(),
            });
        }

        match self.submit(plan).await {
            Ok(outcome) if !outcome.success => {
                self.tracker.set(CycleState::Failed {
                    message: outcome.message.clone(),
                });
                warn!(message = %outcome.message, "upload cycle reported as failed by the server");
                Ok(outcome)
            }
            Ok(outcome) => {
                self.tracker.set(CycleState::Done {
                    uploaded: outcome.uploaded_files.len(),
                    skipped: outcome.skipped_files.len(),
                });
                info!(summary = %outcome.summary(), "upload cycle finished");
                Ok(outcome)
            }
            Err(err) => {
                self.tracker.set(CycleState::Failed {
                    message: err.to_string(),
                });
                warn!(error = %err, "upload cycle failed");
                Err(err)
            }
        }
    }
}
