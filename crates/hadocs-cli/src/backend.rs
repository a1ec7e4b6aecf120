//! reqwest-backed document backend used by the upload pipeline.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use hadocs_api_models::{FileExistsResponse, UPLOAD_FIELD, UploadDocsResponse};
use hadocs_upload::{DocumentBackend, DroppedFile, UploadError, UploadResult};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, Url};
use tracing::debug;

use crate::client::{api_url, encode_segment, problem_message};

const OP_CHECK: &str = "check-file-exists";
const OP_UPLOAD: &str = "upload-ha-docs";
const OP_FETCH: &str = "ha-docs";

/// Talks to the `/api/v1/ha` document endpoints.
#[derive(Clone)]
pub(crate) struct HttpDocumentBackend {
    client: Client,
    base_url: Url,
}

impl HttpDocumentBackend {
    pub(crate) const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Public location of a stored document.
    pub(crate) fn document_url(&self, filename: &str) -> UploadResult<Url> {
        self.url(OP_FETCH, &format!("ha-docs/{}", encode_segment(filename)))
    }

    /// Download a stored document.
    pub(crate) async fn fetch_document(&self, filename: &str) -> UploadResult<Bytes> {
        let url = self.document_url(filename)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| UploadError::transport(OP_FETCH, err))?;
        let response = ensure_success(OP_FETCH, response).await?;
        response
            .bytes()
            .await
            .map_err(|err| UploadError::decode(OP_FETCH, err))
    }

    fn url(&self, operation: &'static str, path: &str) -> UploadResult<Url> {
        api_url(&self.base_url, path).map_err(|err| UploadError::transport(operation, err))
    }
}

#[async_trait]
impl DocumentBackend for HttpDocumentBackend {
    async fn file_exists(&self, filename: &str) -> UploadResult<bool> {
        let url = self.url(
            OP_CHECK,
            &format!("check-file-exists/{}", encode_segment(filename)),
        )?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| UploadError::transport(OP_CHECK, err))?;
        let response = ensure_success(OP_CHECK, response).await?;
        let body = response
            .json::<FileExistsResponse>()
            .await
            .map_err(|err| UploadError::decode(OP_CHECK, err))?;
        Ok(body.exists)
    }

    async fn upload_documents(&self, files: &[DroppedFile]) -> UploadResult<UploadDocsResponse> {
        let url = self.url(OP_UPLOAD, "upload-ha-docs")?;
        let mut form = Form::new();
        for file in files {
            let part = Part::stream_with_length(Body::from(file.content().clone()), file.size())
                .file_name(file.name().to_string())
                .mime_str(mime_for(file.name()))
                .map_err(|err| UploadError::transport(OP_UPLOAD, err))?;
            form = form.part(UPLOAD_FIELD, part);
        }
        debug!(files = files.len(), "sending multipart upload");

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::transport(OP_UPLOAD, err))?;
        let response = ensure_success(OP_UPLOAD, response).await?;
        response
            .json::<UploadDocsResponse>()
            .await
            .map_err(|err| UploadError::decode(OP_UPLOAD, err))
    }
}

async fn ensure_success(operation: &'static str, response: Response) -> UploadResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let bytes = response.bytes().await.unwrap_or_default();
    Err(UploadError::Status {
        operation,
        status: status.as_u16(),
        message: problem_message(status, &bytes),
    })
}

fn mime_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    fn backend_for(server: &MockServer) -> Result<HttpDocumentBackend> {
        Ok(HttpDocumentBackend::new(
            Client::new(),
            server.base_url().parse()?,
        ))
    }

    #[tokio::test]
    async fn file_exists_reads_verdict() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/ha/check-file-exists/001_NguyenA.pdf");
            then.status(200).json_body(json!({"exists": true}));
        });

        let backend = backend_for(&server)?;
        assert!(backend.file_exists("001_NguyenA.pdf").await?);
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn file_exists_surfaces_status_errors() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path_includes("/check-file-exists/");
            then.status(500).json_body(json!({"message": "db offline"}));
        });

        let backend = backend_for(&server)?;
        match backend.file_exists("a.pdf").await {
            Err(UploadError::Status {
                status, message, ..
            }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "db offline");
            }
            other => return Err(anyhow!("unexpected result: {other:?}")),
        }
        Ok(())
    }

    #[tokio::test]
    async fn upload_repeats_files_field_per_document() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/ha/upload-ha-docs")
                .header_exists("content-type")
                .body_includes("name=\"files\"; filename=\"001_a.pdf\"")
                .body_includes("name=\"files\"; filename=\"002_b.pdf\"")
                .body_includes("first-body")
                .body_includes("second-body");
            then.status(200)
                .json_body(json!({"success": true, "message": "2 files stored"}));
        });

        let backend = backend_for(&server)?;
        let response = backend
            .upload_documents(&[
                DroppedFile::new("001_a.pdf", "first-body"),
                DroppedFile::new("002_b.pdf", "second-body"),
            ])
            .await?;
        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("2 files stored"));
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn fetch_document_returns_bytes() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/ha/ha-docs/001_a.pdf");
            then.status(200).body("%PDF-1.7");
        });

        let backend = backend_for(&server)?;
        let bytes = backend.fetch_document("001_a.pdf").await?;
        assert_eq!(bytes.as_ref(), b"%PDF-1.7");
        Ok(())
    }

    #[test]
    fn document_url_is_percent_encoded() -> Result<()> {
        let backend = HttpDocumentBackend::new(Client::new(), "http://10.0.0.5:3000".parse()?);
        let url = backend.document_url("kết quả.pdf")?;
        assert_eq!(
            url.as_str(),
            "http://10.0.0.5:3000/api/v1/ha/ha-docs/k%E1%BA%BFt%20qu%E1%BA%A3.pdf"
        );
        Ok(())
    }

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(mime_for("001.PDF"), "application/pdf");
        assert_eq!(mime_for("scan.jpeg"), "image/jpeg");
        assert_eq!(mime_for("notes"), "application/octet-stream");
    }
}
