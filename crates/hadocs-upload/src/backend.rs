//! Transport seam between the workflow and the records service.

use std::sync::Arc;

use async_trait::async_trait;
use hadocs_api_models::UploadDocsResponse;

use crate::error::UploadResult;
use crate::model::DroppedFile;

/// Document endpoints the upload workflow depends on.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Ask whether a document named `filename` is already stored.
    async fn file_exists(&self, filename: &str) -> UploadResult<bool>;

    /// Submit `files` as a single multipart request.
    async fn upload_documents(&self, files: &[DroppedFile]) -> UploadResult<UploadDocsResponse>;
}

#[async_trait]
impl<T> DocumentBackend for Arc<T>
where
    T: DocumentBackend + ?Sized,
{
    async fn file_exists(&self, filename: &str) -> UploadResult<bool> {
        (**self).file_exists(filename).await
    }

    async fn upload_documents(&self, files: &[DroppedFile]) -> UploadResult<UploadDocsResponse> {
        (**self).upload_documents(files).await
    }
}
