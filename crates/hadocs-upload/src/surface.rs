//! Drop surface: one registered listener feeding dropped batches into the pipeline.
//!
//! The surface tracks nested drag enter/leave events to drive an overlay and
//! serialises cycles, so a second drop waits for the first to finish instead
//! of interleaving with it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Mutex, watch};
use tracing::debug;

use crate::error::{SurfaceError, UploadResult};
use crate::model::{CycleState, DroppedBatch, UploadOutcome};
use crate::pipeline::UploadPipeline;
use crate::resolver::ConflictHandler;

/// Process-wide drop target with an explicit attach/detach lifecycle.
#[derive(Clone)]
pub struct DropSurface {
    pipeline: UploadPipeline,
    handler: Arc<dyn ConflictHandler>,
    inner: Arc<SurfaceInner>,
}

struct SurfaceInner {
    attached: AtomicBool,
    drag_depth: AtomicUsize,
    drag_active: watch::Sender<bool>,
    cycle: Mutex<()>,
}

impl SurfaceInner {
    fn reset_drag(&self) {
        self.drag_depth.store(0, Ordering::SeqCst);
        self.drag_active.send_replace(false);
    }
}

impl DropSurface {
    /// Build a detached surface answering conflicts through `handler`.
    #[must_use]
    pub fn new(pipeline: UploadPipeline, handler: Arc<dyn ConflictHandler>) -> Self {
        let (drag_active, _) = watch::channel(false);
        Self {
            pipeline,
            handler,
            inner: Arc::new(SurfaceInner {
                attached: AtomicBool::new(false),
                drag_depth: AtomicUsize::new(0),
                drag_active,
                cycle: Mutex::new(()),
            }),
        }
    }

    /// Register the listener. Dropping the returned guard detaches it.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::AlreadyAttached`] when a registration is live.
    pub fn attach(&self) -> Result<SurfaceRegistration, SurfaceError> {
        self.inner
            .attached
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SurfaceError::AlreadyAttached)?;
        debug!("drop surface attached");
        Ok(SurfaceRegistration {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Whether a registration is live.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::SeqCst)
    }

    /// A drag entered the surface (or one of its children).
    pub fn drag_enter(&self) {
        if !self.is_attached() {
            return;
        }
        self.inner.drag_depth.fetch_add(1, Ordering::SeqCst);
        self.inner.drag_active.send_replace(true);
    }

    /// A drag left the surface (or one of its children).
    pub fn drag_leave(&self) {
        if !self.is_attached() {
            return;
        }
        let previous = self
            .inner
            .drag_depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| {
                Some(depth.saturating_sub(1))
            })
            .unwrap_or(0);
        if previous <= 1 {
            self.inner.drag_active.send_replace(false);
        }
    }

    /// Whether the drag-active overlay should be shown.
    #[must_use]
    pub fn drag_active(&self) -> bool {
        *self.inner.drag_active.borrow()
    }

    /// Observe overlay visibility.
    #[must_use]
    pub fn subscribe_drag(&self) -> watch::Receiver<bool> {
        self.inner.drag_active.subscribe()
    }

    /// Observe cycle transitions for the conflict dialog and progress display.
    #[must_use]
    pub fn subscribe_cycle(&self) -> watch::Receiver<CycleState> {
        self.pipeline.subscribe()
    }

    /// Handle a drop gesture.
    ///
    /// Returns `None` when the surface is detached or the gesture carried no
    /// files; otherwise runs a full cycle after any cycle already in progress.
    pub async fn drop_files(&self, batch: DroppedBatch) -> Option<UploadResult<UploadOutcome>> {
        self.inner.reset_drag();
        if !self.is_attached() {
            debug!(files = batch.len(), "drop ignored; surface detached");
            return None;
        }
        if batch.is_empty() {
            return None;
        }

        let _cycle = self.inner.cycle.lock().await;
        Some(
            self.pipeline
                .upload_with_confirmation(&batch, self.handler.as_ref())
                .await,
        )
    }
}

/// Live listener registration; detaches on drop.
#[must_use = "dropping the registration detaches the surface"]
pub struct SurfaceRegistration {
    inner: Arc<SurfaceInner>,
}

impl SurfaceRegistration {
    /// Detach explicitly.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for SurfaceRegistration {
    fn drop(&mut self) {
        self.inner.reset_drag();
        self.inner.attached.store(false, Ordering::SeqCst);
        debug!("drop surface detached");
    }
}
