//! Sequential reconciliation of a dropped batch into an upload plan.

use tracing::{debug, info};

use crate::model::{ConflictDecision, CycleState, CycleTracker, DroppedBatch, UploadPlan};
use crate::probe::ExistenceProber;
use crate::resolver::ConflictHandler;

/// Walks a batch in drop order, probing each file and resolving conflicts.
///
/// Files are handled one at a time so that at most one conflict is ever
/// waiting on the user, and every answer belongs to exactly one file.
#[derive(Clone)]
pub struct ReconciliationEngine {
    prober: ExistenceProber,
}

impl ReconciliationEngine {
    /// Build an engine around an existence prober.
    #[must_use]
    pub const fn new(prober: ExistenceProber) -> Self {
        Self { prober }
    }

    /// Partition `batch` into files to upload and names to skip.
    ///
    /// Probe failures never stop the loop: the prober reports them as
    /// "absent", so the file is uploaded rather than silently dropped.
    pub async fn reconcile(
        &self,
        batch: &DroppedBatch,
        handler: &dyn ConflictHandler,
        tracker: &CycleTracker,
    ) -> UploadPlan {
        let mut plan = UploadPlan::default();
        for (index, file) in batch.iter().enumerate() {
            let filename = file.name();
            tracker.set(CycleState::Probing {
                index,
                filename: filename.to_string(),
            });
            let verdict = self.prober.probe(filename).await;
            if !verdict.exists {
                debug!(filename, "new document queued for upload");
                plan.push_upload(file.clone());
                continue;
            }

            tracker.set(CycleState::Resolving {
                index,
                filename: filename.to_string(),
            });
            info!(filename, "document already exists; awaiting decision");
            match handler.decide(filename).await {
                ConflictDecision::Replace => {
                    info!(filename, "existing document will be replaced");
                    plan.push_upload(file.clone());
                }
                ConflictDecision::Skip => {
                    info!(filename, "existing document kept; file skipped");
                    plan.push_skip(filename);
                }
            }
        }
        plan
    }
}
