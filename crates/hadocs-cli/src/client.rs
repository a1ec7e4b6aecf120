//! Shared client utilities, error types, and telemetry wiring for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use hadocs_api_models::{API_PREFIX, ApiEnvelope, ErrorBody};
use hadocs_upload::{UploadConfig, UploadError};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cli::Cli;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const TELEMETRY_ENDPOINT_ENV: &str = "HADOCS_TELEMETRY_ENDPOINT";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    /// Map a workflow error; client-side and request-shape problems count as validation.
    pub(crate) fn from_upload(error: UploadError) -> Self {
        match &error {
            UploadError::PayloadTooLarge { .. } | UploadError::Io { .. } => {
                Self::validation(format!("{:#}", anyhow::Error::new(error)))
            }
            UploadError::Status { status, .. } if is_validation_status(*status) => {
                Self::validation(error.to_string())
            }
            _ => Self::failure(error),
        }
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Dependencies constructed from environment flags and CLI options.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
    pub(crate) telemetry: Option<TelemetryEmitter>,
}

impl CliDependencies {
    /// Construct a configured HTTP client and optional telemetry emitter.
    pub(crate) fn from_env(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(cli.timeout))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            telemetry: TelemetryEmitter::from_env(),
        })
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) upload: UploadConfig,
}

impl AppContext {
    /// Resolve `path` (relative to the `/api/v1/ha` prefix) against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> CliResult<Url> {
        api_url(&self.base_url, path)
            .map_err(|err| CliError::failure(anyhow!("invalid base URL: {err}")))
    }
}

/// Join `path` under the API prefix, keeping any percent-encoding intact.
pub(crate) fn api_url(base_url: &Url, path: &str) -> Result<Url, url::ParseError> {
    base_url.join(&format!("{API_PREFIX}/{}", path.trim_start_matches('/')))
}

/// Percent-encode a filename for use as a single path segment.
#[must_use]
pub(crate) fn encode_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Telemetry emitter used to forward CLI outcomes.
#[derive(Clone)]
pub(crate) struct TelemetryEmitter {
    pub(crate) client: Client,
    pub(crate) endpoint: Url,
}

impl TelemetryEmitter {
    #[must_use]
    pub(crate) fn from_env() -> Option<Self> {
        let endpoint = std::env::var(TELEMETRY_ENDPOINT_ENV).ok()?;
        let endpoint = endpoint.parse().ok()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .ok()?;
        Some(Self { client, endpoint })
    }

    pub(crate) async fn emit(
        &self,
        trace_id: &str,
        command: &str,
        outcome: &str,
        exit_code: i32,
        message: Option<&str>,
    ) {
        let event = TelemetryEvent {
            command,
            outcome,
            trace_id,
            exit_code,
            message,
            timestamp_ms: timestamp_now_ms(),
        };

        if let Err(err) = self
            .client
            .post(self.endpoint.clone())
            .json(&event)
            .send()
            .await
        {
            tracing::debug!(error = %err, "telemetry emit failed");
        }
    }
}

#[derive(Serialize)]
struct TelemetryEvent<'a> {
    command: &'a str,
    outcome: &'a str,
    trace_id: &'a str,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    timestamp_ms: u64,
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Millisecond timestamp helper for telemetry.
#[must_use]
pub(crate) fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

const fn is_validation_status(status: u16) -> bool {
    matches!(status, 400 | 404 | 409 | 413 | 422)
}

/// Extract a human-readable message from an error response body.
pub(crate) fn problem_message(status: StatusCode, bytes: &[u8]) -> String {
    let body_text = String::from_utf8_lossy(bytes).trim().to_string();
    serde_json::from_slice::<ErrorBody>(bytes)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            if body_text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body_text
            }
        })
}

/// Classify an HTTP response into a CLI error.
pub(crate) async fn classify_problem(response: reqwest::Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let message = problem_message(status, &bytes);

    if is_validation_status(status.as_u16()) {
        CliError::validation(message)
    } else {
        CliError::failure(anyhow!("{message} (status {status})"))
    }
}

/// Decode a `{ success, message, data }` envelope, treating `success: false` as an error.
pub(crate) async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> CliResult<T> {
    let envelope = response
        .json::<ApiEnvelope<T>>()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to parse {what}: {err}")))?;
    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| format!("server could not load {what}"));
        return Err(CliError::failure(anyhow!(message)));
    }
    envelope
        .data
        .ok_or_else(|| CliError::failure(anyhow!("{what} response carried no data")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;

    #[test]
    fn api_url_joins_under_prefix_and_keeps_encoding() -> Result<()> {
        let base: Url = "http://127.0.0.1:3000".parse()?;
        let url = api_url(
            &base,
            &format!("check-file-exists/{}", encode_segment("12 345#a.pdf")),
        )?;
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3000/api/v1/ha/check-file-exists/12%20345%23a.pdf"
        );
        Ok(())
    }

    #[test]
    fn problem_message_prefers_json_message_then_text() {
        assert_eq!(
            problem_message(StatusCode::BAD_REQUEST, br#"{"message":"bad name"}"#),
            "bad name"
        );
        assert_eq!(
            problem_message(StatusCode::BAD_REQUEST, br#"{"error":"nope"}"#),
            "nope"
        );
        assert_eq!(
            problem_message(StatusCode::BAD_GATEWAY, b"  upstream down \n"),
            "upstream down"
        );
        assert_eq!(
            problem_message(StatusCode::NOT_FOUND, b""),
            "Not Found"
        );
    }

    #[test]
    fn upload_errors_map_to_exit_codes() {
        let too_large = CliError::from_upload(UploadError::PayloadTooLarge {
            filename: Some("big.pdf".into()),
            size: 11,
            limit: 10,
        });
        assert_eq!(too_large.exit_code(), 2);
        assert!(too_large.display_message().contains("big.pdf"));

        let server = CliError::from_upload(UploadError::Status {
            operation: "upload-ha-docs",
            status: 500,
            message: "boom".into(),
        });
        assert_eq!(server.exit_code(), 3);

        let rejected = CliError::from_upload(UploadError::Status {
            operation: "upload-ha-docs",
            status: 422,
            message: "bad".into(),
        });
        assert_eq!(rejected.exit_code(), 2);
    }

    #[tokio::test]
    async fn classify_problem_distinguishes_validation_and_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/conflict");
            then.status(409).json_body(serde_json::json!({"message": "taken"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(503).body("maintenance");
        });

        let client = Client::new();
        let conflict = client.get(server.url("/conflict")).send().await?;
        match classify_problem(conflict).await {
            CliError::Validation(message) => assert_eq!(message, "taken"),
            CliError::Failure(err) => panic!("unexpected failure: {err}"),
        }

        let broken = client.get(server.url("/broken")).send().await?;
        let err = classify_problem(broken).await;
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("maintenance"));
        Ok(())
    }

    #[tokio::test]
    async fn read_envelope_rejects_unsuccessful_payloads() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200)
                .json_body(serde_json::json!({"success": true, "data": [1, 2]}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/failed");
            then.status(200)
                .json_body(serde_json::json!({"success": false, "message": "no access"}));
        });

        let client = Client::new();
        let ok = client.get(server.url("/ok")).send().await?;
        let values: Vec<i64> = read_envelope(ok, "numbers")
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(values, vec![1, 2]);

        let failed = client.get(server.url("/failed")).send().await?;
        let err = read_envelope::<Vec<i64>>(failed, "numbers")
            .await
            .err()
            .ok_or_else(|| anyhow!("expected an error"))?;
        assert_eq!(err.display_message(), "no access");
        Ok(())
    }

    #[tokio::test]
    async fn telemetry_emitter_emits_event() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/telemetry");
            then.status(200);
        });

        let emitter = TelemetryEmitter {
            client: Client::new(),
            endpoint: format!("{}/telemetry", server.base_url())
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid URL"))?,
        };

        emitter
            .emit("trace", "docs_upload", "success", 0, Some("message"))
            .await;

        mock.assert();
        Ok(())
    }
}
