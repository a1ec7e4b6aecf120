//! Single-flight bridge between the reconciliation loop and a human.
//!
//! The loop holds a cloneable [`ConflictResolver`]; the surface that renders
//! dialogs owns the matching [`ConflictQueue`]. Each request carries its own
//! completion channel, and a FIFO gate keeps at most one request outstanding
//! across every batch sharing the resolver.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, warn};

use crate::model::ConflictDecision;

/// Only one request is ever in flight, so the queue never needs more room.
const REQUEST_BUFFER: usize = 1;

/// Decides what to do with a file that already exists on the server.
#[async_trait]
pub trait ConflictHandler: Send + Sync {
    /// Answer the conflict for `filename`. Must eventually return.
    async fn decide(&self, filename: &str) -> ConflictDecision;
}

/// Non-interactive handler answering every conflict the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Overwrite every existing document.
    Replace,
    /// Keep every existing document.
    Skip,
}

#[async_trait]
impl ConflictHandler for ConflictPolicy {
    async fn decide(&self, _filename: &str) -> ConflictDecision {
        match self {
            Self::Replace => ConflictDecision::Replace,
            Self::Skip => ConflictDecision::Skip,
        }
    }
}

/// One conflict waiting to be presented.
#[derive(Debug)]
struct ConflictRequest {
    filename: String,
    respond_to: oneshot::Sender<ConflictDecision>,
}

/// Requesting side: suspends the caller until the user answers.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    requests: mpsc::Sender<ConflictRequest>,
    gate: Arc<Mutex<()>>,
}

impl ConflictResolver {
    /// Create a connected resolver/queue pair.
    #[must_use]
    pub fn channel() -> (Self, ConflictQueue) {
        let (requests, rx) = mpsc::channel(REQUEST_BUFFER);
        (
            Self {
                requests,
                gate: Arc::new(Mutex::new(())),
            },
            ConflictQueue { requests: rx },
        )
    }

    /// Present `filename` and wait for the answer.
    ///
    /// Queues behind any outstanding request. Resolves to
    /// [`ConflictDecision::Skip`] when the dialog is dismissed without a
    /// choice or when no surface is consuming the queue.
    pub async fn resolve(&self, filename: &str) -> ConflictDecision {
        let _turn = self.gate.lock().await;
        let (respond_to, answer) = oneshot::channel();
        let request = ConflictRequest {
            filename: filename.to_string(),
            respond_to,
        };
        if self.requests.send(request).await.is_err() {
            warn!(filename, "no conflict surface attached; skipping file");
            return ConflictDecision::Skip;
        }
        answer.await.unwrap_or_else(|_| {
            debug!(filename, "conflict dismissed without a choice; skipping file");
            ConflictDecision::Skip
        })
    }

    /// Whether a conflict is currently being presented.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}

#[async_trait]
impl ConflictHandler for ConflictResolver {
    async fn decide(&self, filename: &str) -> ConflictDecision {
        self.resolve(filename).await
    }
}

/// Presenting side, owned by whatever renders the conflict dialog.
#[derive(Debug)]
pub struct ConflictQueue {
    requests: mpsc::Receiver<ConflictRequest>,
}

impl ConflictQueue {
    /// Wait for the next conflict. Returns `None` once every resolver is gone.
    pub async fn next(&mut self) -> Option<PendingConflict> {
        self.requests.recv().await.map(|request| PendingConflict {
            filename: request.filename,
            respond_to: Some(request.respond_to),
        })
    }
}

/// A conflict on screen. Dropping it unanswered answers "skip".
#[derive(Debug)]
pub struct PendingConflict {
    filename: String,
    respond_to: Option<oneshot::Sender<ConflictDecision>>,
}

impl PendingConflict {
    /// File the dialog is about.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Deliver the user's choice.
    pub fn answer(mut self, decision: ConflictDecision) {
        self.send(decision);
    }

    /// Answer "replace".
    pub fn replace(self) {
        self.answer(ConflictDecision::Replace);
    }

    /// Answer "skip".
    pub fn skip(self) {
        self.answer(ConflictDecision::Skip);
    }

    fn send(&mut self, decision: ConflictDecision) {
        if let Some(respond_to) = self.respond_to.take()
            && respond_to.send(decision).is_err()
        {
            debug!(filename = %self.filename, "conflict requester went away before the answer");
        }
    }
}

impl Drop for PendingConflict {
    fn drop(&mut self) {
        self.send(ConflictDecision::Skip);
    }
}
