use anyhow::anyhow;
use hadocs_api_models::{CreateHealthResultRequest, HealthResultPayload, Scalar};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::cli::{OutputFormat, ResultCreateArgs, ResultFields, ResultUpdateArgs};
use crate::client::{AppContext, CliError, CliResult, classify_problem, encode_segment};
use crate::output::render_ack;

pub(crate) async fn handle_result_update(
    ctx: &AppContext,
    args: ResultUpdateArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let id = required("patient record id", &args.id)?;
    let payload = build_payload(args.fields);
    let url = ctx.endpoint(&format!("result-detail/{}", encode_segment(id)))?;
    let response = ctx
        .client
        .put(url)
        .json(&payload)
        .send()
        .await
        .map_err(|err| {
            CliError::failure(anyhow!("request to /result-detail/{id} failed: {err}"))
        })?;

    let body = read_ack(response).await?;
    render_ack(&body, "result updated", output)
}

pub(crate) async fn handle_result_create(
    ctx: &AppContext,
    args: ResultCreateArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let company_id = required("organization id", &args.company_id)?;
    let request = CreateHealthResultRequest {
        data_id: scalar_from_arg(company_id),
        result: build_payload(args.fields),
    };
    let url = ctx.endpoint("result-detail")?;
    let response = ctx
        .client
        .post(url)
        .json(&request)
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to /result-detail failed: {err}")))?;

    let body = read_ack(response).await?;
    render_ack(&body, "result created", output)
}

fn required<'a>(label: &str, value: &'a str) -> CliResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CliError::validation(format!("{label} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

/// Trim and NFC-compose the conclusion fields; a blank date is omitted from the payload.
pub(crate) fn build_payload(fields: ResultFields) -> HealthResultPayload {
    HealthResultPayload {
        health_type: clean(&fields.health_type),
        conclusion: clean(&fields.conclusion),
        suggestion: clean(&fields.suggestion),
        conclusion_date: fields
            .conclusion_date
            .map(|date| clean(&date))
            .filter(|date| !date.is_empty()),
        file_name: clean(&fields.file_name),
        conclusion_doctor: clean(&fields.conclusion_doctor),
    }
}

/// Composed (NFC) form so decomposed Vietnamese input matches stored text.
fn clean(value: &str) -> String {
    value.trim().nfc().collect()
}

/// Numeric identifiers go over the wire as numbers, anything else as text.
pub(crate) fn scalar_from_arg(value: &str) -> Scalar {
    value
        .parse::<i64>()
        .map_or_else(|_| Scalar::from(value), Scalar::from)
}

async fn read_ack(response: reqwest::Response) -> CliResult<Value> {
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }
    let body = response
        .json::<Value>()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to parse result response: {err}")))?;
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("server could not save the result");
        return Err(CliError::failure(anyhow!(message.to_string())));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with;
    use httpmock::prelude::*;
    use serde_json::json;

    fn fields() -> ResultFields {
        ResultFields {
            health_type: " I ".into(),
            conclusion: "Healthy".into(),
            suggestion: String::new(),
            conclusion_date: Some("2024-05-01".into()),
            conclusion_doctor: "Dr. Lan".into(),
            file_name: "001_a.pdf".into(),
        }
    }

    #[test]
    fn payload_trims_fields_and_drops_blank_date() {
        let payload = build_payload(fields());
        assert_eq!(payload.health_type, "I");
        assert_eq!(payload.conclusion_date.as_deref(), Some("2024-05-01"));

        let mut undated = fields();
        undated.conclusion_date = Some("  ".into());
        assert!(build_payload(undated).conclusion_date.is_none());
    }

    #[test]
    fn payload_composes_decomposed_vietnamese_text() {
        let mut decomposed = fields();
        decomposed.conclusion = "NGUYE\u{302}\u{303}N".into();
        decomposed.conclusion_doctor = " Tra\u{300}n Thi\u{323} Lan ".into();

        let payload = build_payload(decomposed);
        assert_eq!(payload.conclusion, "NGUY\u{1EC4}N");
        assert_eq!(payload.conclusion.len(), 8);
        assert_eq!(payload.conclusion_doctor, "Tr\u{E0}n Th\u{1ECB} Lan");
    }

    #[test]
    fn numeric_ids_become_numbers() {
        assert_eq!(scalar_from_arg("17"), Scalar::Int(17));
        assert_eq!(scalar_from_arg("ORG-17"), Scalar::Text("ORG-17".into()));
    }

    #[tokio::test]
    async fn update_puts_payload_to_patient_record() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/v1/ha/result-detail/42")
                .json_body(json!({
                    "HealthType": "I",
                    "Conclusion": "Healthy",
                    "Suggestion": "",
                    "ConclusionDate": "2024-05-01",
                    "FileName": "001_a.pdf",
                    "ConclusionDoctor": "Dr. Lan"
                }));
            then.status(200)
                .json_body(json!({"success": true, "message": "updated"}));
        });

        let ctx = context_with(&server);
        handle_result_update(
            &ctx,
            ResultUpdateArgs {
                id: "42".into(),
                fields: fields(),
            },
            OutputFormat::Table,
        )
        .await
        .expect("update should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn create_posts_data_id_with_fields() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/ha/result-detail")
                .json_body_includes(r#"{"DataId": 17, "ConclusionDoctor": "Dr. Lan"}"#);
            then.status(201)
                .json_body(json!({"success": true, "data": {"Id": 99}}));
        });

        let ctx = context_with(&server);
        handle_result_create(
            &ctx,
            ResultCreateArgs {
                company_id: "17".into(),
                fields: fields(),
            },
            OutputFormat::Json,
        )
        .await
        .expect("create should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn create_reports_server_side_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/ha/result-detail");
            then.status(200)
                .json_body(json!({"success": false, "message": "duplicate record"}));
        });

        let ctx = context_with(&server);
        let err = handle_result_create(
            &ctx,
            ResultCreateArgs {
                company_id: "17".into(),
                fields: fields(),
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("create should fail");
        assert_eq!(err.display_message(), "duplicate record");
    }
}
