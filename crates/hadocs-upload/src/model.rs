//! Ephemeral values scoped to a single drop gesture.

use std::path::Path;
use std::slice;
use std::sync::Arc;

use bytes::Bytes;
use hadocs_api_models::{FileExistsResponse, UploadDocsResponse};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{UploadError, UploadResult};

/// A file captured at drop time: name plus raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    name: String,
    content: Bytes,
}

impl DroppedFile {
    /// Build a dropped file from a name and its bytes.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, naming it after the final path component.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Io`] when the path has no file name or cannot be read.
    pub async fn load(path: &Path) -> UploadResult<Self> {
        let display = path.display().to_string();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::Io {
                path: display.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            })?;
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::Io {
                path: display,
                source,
            })?;
        Ok(Self::new(name, content))
    }

    /// File name as dropped.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::try_from(self.content.len()).unwrap_or(u64::MAX)
    }

    /// Raw content.
    #[must_use]
    pub const fn content(&self) -> &Bytes {
        &self.content
    }
}

/// Ordered, immutable set of files captured by one drop gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DroppedBatch {
    files: Arc<[DroppedFile]>,
}

impl DroppedBatch {
    /// Capture a batch; order is preserved.
    #[must_use]
    pub fn new(files: Vec<DroppedFile>) -> Self {
        Self {
            files: files.into(),
        }
    }

    /// Files in drop order.
    #[must_use]
    pub fn files(&self) -> &[DroppedFile] {
        &self.files
    }

    /// Iterate files in drop order.
    pub fn iter(&self) -> slice::Iter<'_, DroppedFile> {
        self.files.iter()
    }

    /// Number of files in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the gesture carried no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File names in drop order.
    #[must_use]
    pub fn filenames(&self) -> Vec<String> {
        self.files.iter().map(|file| file.name.clone()).collect()
    }
}

impl From<Vec<DroppedFile>> for DroppedBatch {
    fn from(files: Vec<DroppedFile>) -> Self {
        Self::new(files)
    }
}

impl<'a> IntoIterator for &'a DroppedBatch {
    type Item = &'a DroppedFile;
    type IntoIter = slice::Iter<'a, DroppedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Result of probing one filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExistenceVerdict {
    /// Whether the server already stores a document of that name.
    pub exists: bool,
}

impl ExistenceVerdict {
    /// Verdict used when the server does not know the file, or could not be asked.
    #[must_use]
    pub const fn absent() -> Self {
        Self { exists: false }
    }
}

impl From<FileExistsResponse> for ExistenceVerdict {
    fn from(value: FileExistsResponse) -> Self {
        Self {
            exists: value.exists,
        }
    }
}

/// The user's answer to one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDecision {
    /// Overwrite the stored document.
    Replace,
    /// Leave the stored document alone and drop this file from the batch.
    Skip,
}

impl ConflictDecision {
    /// Whether the file should be uploaded.
    #[must_use]
    pub const fn is_replace(self) -> bool {
        matches!(self, Self::Replace)
    }
}

impl From<bool> for ConflictDecision {
    fn from(replace: bool) -> Self {
        if replace { Self::Replace } else { Self::Skip }
    }
}

/// Partition of a batch into files to send and names to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPlan {
    to_upload: Vec<DroppedFile>,
    to_skip: Vec<String>,
}

impl UploadPlan {
    pub(crate) fn push_upload(&mut self, file: DroppedFile) {
        self.to_upload.push(file);
    }

    pub(crate) fn push_skip(&mut self, filename: &str) {
        self.to_skip.push(filename.to_string());
    }

    /// Files to upload, in drop order.
    #[must_use]
    pub fn to_upload(&self) -> &[DroppedFile] {
        &self.to_upload
    }

    /// Names the user chose not to replace.
    #[must_use]
    pub fn to_skip(&self) -> &[String] {
        &self.to_skip
    }

    /// Names of the files to upload, in drop order.
    #[must_use]
    pub fn upload_names(&self) -> Vec<String> {
        self.to_upload
            .iter()
            .map(|file| file.name().to_string())
            .collect()
    }

    /// Whether nothing was dropped at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_skip.is_empty()
    }

    /// Split into `(to_upload, to_skip)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<DroppedFile>, Vec<String>) {
        (self.to_upload, self.to_skip)
    }
}

const UPLOADED_FILES_KEY: &str = "uploadedFiles";
const SKIPPED_FILES_KEY: &str = "skippedFiles";

/// Consolidated result of one reconciliation + upload cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    /// Server verdict for the batch; `false` when a 2xx reply declared failure.
    pub success: bool,
    /// Summary message (server-provided when available).
    pub message: String,
    /// Per-file status reported by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Value>>,
    /// Other fields returned by the server.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Files included in the submission, in drop order.
    pub uploaded_files: Vec<String>,
    /// Files the user chose to skip.
    pub skipped_files: Vec<String>,
}

impl UploadOutcome {
    /// Outcome for a cycle that had nothing to send.
    #[must_use]
    pub fn nothing_uploaded(skipped_files: Vec<String>) -> Self {
        let message = if skipped_files.is_empty() {
            "no files to upload".to_string()
        } else {
            "all files were skipped".to_string()
        };
        Self {
            success: true,
            message,
            files: None,
            extra: Map::new(),
            uploaded_files: Vec::new(),
            skipped_files,
        }
    }

    /// Merge the server's response with the locally known partition.
    #[must_use]
    pub fn merge(
        response: UploadDocsResponse,
        uploaded_files: Vec<String>,
        skipped_files: Vec<String>,
    ) -> Self {
        let message = response
            .message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| summarize(uploaded_files.len(), skipped_files.len()));
        let mut extra = response.extra;
        extra.remove(UPLOADED_FILES_KEY);
        extra.remove(SKIPPED_FILES_KEY);
        Self {
            success: response.success,
            message,
            files: response.files,
            extra,
            uploaded_files,
            skipped_files,
        }
    }

    /// One-line description distinguishing partial uploads from all-skipped cycles.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.uploaded_files.is_empty() && !self.skipped_files.is_empty() {
            format!("all {} file(s) skipped", self.skipped_files.len())
        } else {
            summarize(self.uploaded_files.len(), self.skipped_files.len())
        }
    }
}

fn summarize(uploaded: usize, skipped: usize) -> String {
    format!("uploaded {uploaded} file(s), skipped {skipped}")
}

/// Position of one reconciliation + upload cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CycleState {
    /// No cycle running.
    #[default]
    Idle,
    /// Checking whether the file at `index` exists.
    Probing {
        /// Position in the batch.
        index: usize,
        /// File being probed.
        filename: String,
    },
    /// Waiting for the user to answer a conflict.
    Resolving {
        /// Position in the batch.
        index: usize,
        /// Conflicting file.
        filename: String,
    },
    /// Submitting the approved files.
    Uploading {
        /// Number of files in the submission.
        files: usize,
    },
    /// Cycle finished with an outcome.
    Done {
        /// Files sent.
        uploaded: usize,
        /// Files skipped.
        skipped: usize,
    },
    /// Cycle aborted by a submission failure.
    Failed {
        /// Error description.
        message: String,
    },
}

impl CycleState {
    /// Whether the cycle has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }
}

/// Publishes [`CycleState`] transitions to any number of observers.
#[derive(Debug, Clone)]
pub struct CycleTracker {
    state: Arc<watch::Sender<CycleState>>,
}

impl CycleTracker {
    /// Start in [`CycleState::Idle`].
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(CycleState::Idle);
        Self {
            state: Arc::new(state),
        }
    }

    /// Record a transition.
    pub fn set(&self, next: CycleState) {
        self.state.send_replace(next);
    }

    /// Current state.
    #[must_use]
    pub fn current(&self) -> CycleState {
        self.state.borrow().clone()
    }

    /// Observe future transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }
}

impl Default for CycleTracker {
    fn default() -> Self {
        Self::new()
    }
}
