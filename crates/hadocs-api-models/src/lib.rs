#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
//! Shared HTTP DTOs for the health-examination records API.
//!
//! The server speaks `PascalCase` JSON for its record types and wraps list and
//! detail responses in a `{ success, message, data }` envelope. The document
//! endpoints use lowercase keys (`exists`, `success`, `message`, `files`).
//! These types are shared by the upload core and the CLI so both encode the
//! contract the same way.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Base path shared by every endpoint of the records API.
pub const API_PREFIX: &str = "/api/v1/ha";

/// Multipart field name repeated once per uploaded document.
pub const UPLOAD_FIELD: &str = "files";

/// Response of `GET /api/v1/ha/check-file-exists/{filename}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FileExistsResponse {
    /// Whether a document with the probed name is already stored.
    #[serde(default)]
    pub exists: bool,
}

/// Response of `POST /api/v1/ha/upload-ha-docs`.
///
/// Only `success` and `message` are relied upon; anything else the server
/// reports is kept verbatim in `extra` so callers can surface it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadDocsResponse {
    /// Server-side verdict for the whole batch.
    #[serde(default = "default_true")]
    pub success: bool,
    /// Human-readable summary produced by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Per-file status entries, when the server reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Value>>,
    /// Remaining fields returned by the server.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_true() -> bool {
    true
}

impl Default for UploadDocsResponse {
    fn default() -> Self {
        Self {
            success: true,
            message: None,
            files: None,
            extra: Map::new(),
        }
    }
}

/// Envelope wrapping record responses: `{ success, message, data }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEnvelope<T> {
    /// Whether the server considered the request successful.
    #[serde(default)]
    pub success: bool,
    /// Optional diagnostic message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload, absent on failure.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ErrorBody {
    /// Error summary, when provided.
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

/// Scalar identifier or code that the server emits either as a number or a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum Scalar {
    /// Integer representation.
    Int(i64),
    /// Textual representation.
    Text(String),
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Client organization whose employees were examined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Company {
    /// Record identifier (`DataId` for patient lookups).
    pub id: Scalar,
    /// Organization display name.
    #[serde(default)]
    pub org_name: Option<String>,
    /// Operator that created the record.
    #[serde(default)]
    pub creator: Option<String>,
    /// Examination campaign start.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Examination campaign end.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Record creation timestamp.
    #[serde(default)]
    pub created_date: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Number of examination results attached to the organization.
    #[serde(default)]
    pub result_count: Option<i64>,
}

/// Examined patient together with their current conclusion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Patient {
    /// Result-detail identifier.
    pub id: Scalar,
    /// Family name.
    #[serde(default)]
    pub sur_name: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Sample/item number; uploaded documents are named after it.
    #[serde(default)]
    pub item_num: Option<Scalar>,
    /// Paper file number.
    #[serde(default)]
    pub file_num: Option<Scalar>,
    /// Sex as recorded by the examination service.
    #[serde(default)]
    pub sex: Option<Scalar>,
    /// Health classification.
    #[serde(default)]
    pub health_type: Option<String>,
    /// Examination conclusion.
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Follow-up suggestion.
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Date the conclusion was issued.
    #[serde(default)]
    pub conclusion_date: Option<String>,
    /// Concluding doctor.
    #[serde(default)]
    pub conclusion_doctor: Option<String>,
    /// Name of the attached result document.
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Patient {
    /// Full name in `SurName FirstName` order, trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        let sur = self.sur_name.as_deref().unwrap_or_default();
        let first = self.first_name.as_deref().unwrap_or_default();
        format!("{sur} {first}").trim().to_string()
    }
}

/// Conclusion fields written by the result create/update endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct HealthResultPayload {
    /// Health classification.
    pub health_type: String,
    /// Examination conclusion.
    pub conclusion: String,
    /// Follow-up suggestion.
    #[serde(default)]
    pub suggestion: String,
    /// Conclusion date (ISO-8601), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion_date: Option<String>,
    /// Attached document name.
    #[serde(default)]
    pub file_name: String,
    /// Concluding doctor.
    pub conclusion_doctor: String,
}

/// Body of `POST /api/v1/ha/result-detail`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateHealthResultRequest {
    /// Organization the new result belongs to.
    #[serde(rename = "DataId")]
    pub data_id: Scalar,
    /// Conclusion fields.
    #[serde(flatten)]
    pub result: HealthResultPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn upload_response_keeps_unknown_fields() -> Result<()> {
        let parsed: UploadDocsResponse = serde_json::from_value(json!({
            "success": true,
            "message": "stored",
            "files": [{"name": "a.pdf", "status": "saved"}],
            "count": 1
        }))?;
        assert!(parsed.success);
        assert_eq!(parsed.message.as_deref(), Some("stored"));
        assert_eq!(parsed.files.as_ref().map(Vec::len), Some(1));
        assert_eq!(parsed.extra.get("count"), Some(&json!(1)));
        Ok(())
    }

    #[test]
    fn upload_response_defaults_to_success_when_flag_missing() -> Result<()> {
        let parsed: UploadDocsResponse = serde_json::from_value(json!({}))?;
        assert!(parsed.success);
        assert!(parsed.message.is_none());
        assert_eq!(parsed, UploadDocsResponse::default());
        Ok(())
    }

    #[test]
    fn scalar_accepts_numbers_and_strings() -> Result<()> {
        let company: Company = serde_json::from_value(json!({"Id": 7, "OrgName": "Acme"}))?;
        assert_eq!(company.id, Scalar::Int(7));
        let company: Company = serde_json::from_value(json!({"Id": "C-9"}))?;
        assert_eq!(company.id.to_string(), "C-9");
        Ok(())
    }

    #[test]
    fn create_request_flattens_payload_next_to_data_id() -> Result<()> {
        let request = CreateHealthResultRequest {
            data_id: Scalar::Int(3),
            result: HealthResultPayload {
                health_type: "I".into(),
                conclusion: "fit".into(),
                conclusion_doctor: "Dr. Lan".into(),
                ..HealthResultPayload::default()
            },
        };
        let value = serde_json::to_value(&request)?;
        assert_eq!(value["DataId"], json!(3));
        assert_eq!(value["HealthType"], json!("I"));
        assert_eq!(value["ConclusionDoctor"], json!("Dr. Lan"));
        assert!(value.get("ConclusionDate").is_none());
        Ok(())
    }

    #[test]
    fn patient_full_name_skips_missing_parts() -> Result<()> {
        let patient: Patient =
            serde_json::from_value(json!({"Id": 1, "FirstName": "An", "ItemNum": "0042"}))?;
        assert_eq!(patient.full_name(), "An");
        assert_eq!(patient.item_num, Some(Scalar::Text("0042".into())));
        Ok(())
    }
}
