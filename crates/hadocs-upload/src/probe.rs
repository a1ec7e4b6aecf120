//! Fail-open existence checks.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::DocumentBackend;
use crate::error::ProbeError;
use crate::model::ExistenceVerdict;

/// Asks the backend whether a filename is taken, treating any failure as "absent".
#[derive(Clone)]
pub struct ExistenceProber {
    backend: Arc<dyn DocumentBackend>,
    timeout: Duration,
}

impl ExistenceProber {
    /// Build a prober bounded by `timeout` per call.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Probe `filename`; never fails.
    pub async fn probe(&self, filename: &str) -> ExistenceVerdict {
        match self.try_probe(filename).await {
            Ok(verdict) => {
                debug!(filename, exists = verdict.exists, "existence probe completed");
                verdict
            }
            Err(err) => {
                warn!(filename, error = %err, "existence probe failed; treating file as new");
                ExistenceVerdict::absent()
            }
        }
    }

    /// Probe `filename`, reporting failures instead of absorbing them.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Backend`] when the backend call fails and
    /// [`ProbeError::TimedOut`] when it exceeds the configured bound.
    pub async fn try_probe(&self, filename: &str) -> Result<ExistenceVerdict, ProbeError> {
        match tokio::time::timeout(self.timeout, self.backend.file_exists(filename)).await {
            Ok(Ok(exists)) => Ok(ExistenceVerdict { exists }),
            Ok(Err(source)) => Err(ProbeError::Backend(source)),
            Err(_) => Err(ProbeError::TimedOut {
                after: self.timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{UploadError, UploadResult};
    use crate::model::DroppedFile;
    use async_trait::async_trait;
    use hadocs_api_models::UploadDocsResponse;

    enum Answer {
        Exists(bool),
        Fail,
        Hang,
    }

    struct StubBackend(Answer);

    #[async_trait]
    impl DocumentBackend for StubBackend {
        async fn file_exists(&self, _filename: &str) -> UploadResult<bool> {
            match self.0 {
                Answer::Exists(exists) => Ok(exists),
                Answer::Fail => Err(UploadError::Status {
                    operation: "check-file-exists",
                    status: 500,
                    message: "boom".into(),
                }),
                Answer::Hang => {
                    std::future::pending::<()>().await;
                    Ok(true)
                }
            }
        }

        async fn upload_documents(
            &self,
            _files: &[DroppedFile],
        ) -> UploadResult<UploadDocsResponse> {
            Ok(UploadDocsResponse::default())
        }
    }

    fn prober(answer: Answer) -> ExistenceProber {
        ExistenceProber::new(Arc::new(StubBackend(answer)), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn probe_reports_server_knowledge() {
        assert!(prober(Answer::Exists(true)).probe("a.pdf").await.exists);
        assert!(!prober(Answer::Exists(false)).probe("a.pdf").await.exists);
    }

    #[tokio::test]
    async fn probe_fails_open_on_backend_error() {
        let prober = prober(Answer::Fail);
        assert!(matches!(
            prober.try_probe("a.pdf").await,
            Err(ProbeError::Backend(_))
        ));
        assert_eq!(prober.probe("a.pdf").await, ExistenceVerdict::absent());
    }

    #[tokio::test]
    async fn probe_fails_open_on_timeout() {
        let prober = prober(Answer::Hang);
        assert!(matches!(
            prober.try_probe("slow.pdf").await,
            Err(ProbeError::TimedOut { .. })
        ));
        assert!(!prober.probe("slow.pdf").await.exists);
    }
}
