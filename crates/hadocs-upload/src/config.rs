//! Tunables for the upload workflow.

use std::time::Duration;

/// Bound applied to each existence probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side ceiling for a single upload request body (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Workflow configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    /// Probes running longer than this count as failed (and therefore "absent").
    pub probe_timeout: Duration,
    /// Largest file, and largest combined batch, accepted for submission.
    pub max_upload_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}
