//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use hadocs_api_models::{Company, Patient};
use hadocs_upload::UploadOutcome;
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_outcome(outcome: &UploadOutcome, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(outcome)?,
        OutputFormat::Table => {
            println!("{}", outcome.message);
            for name in &outcome.uploaded_files {
                println!("  uploaded  {name}");
            }
            for name in &outcome.skipped_files {
                println!("  skipped   {name}");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_exists(filename: &str, exists: bool, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "filename": filename, "exists": exists }))?,
        OutputFormat::Table => {
            let state = if exists { "exists" } else { "missing" };
            println!("{filename}: {state}");
        }
    }
    Ok(())
}

pub(crate) fn render_company_list(companies: &[Company], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(companies)?,
        OutputFormat::Table => {
            println!("{:<8} {:<12} {:<12} {:>7} NAME", "ID", "START", "END", "RESULTS");
            for company in companies {
                println!(
                    "{:<8} {:<12} {:<12} {:>7} {}",
                    company.id.to_string(),
                    short_date(company.start_date.as_deref()),
                    short_date(company.end_date.as_deref()),
                    company
                        .result_count
                        .map_or_else(|| "-".to_string(), |count| count.to_string()),
                    company.org_name.as_deref().unwrap_or("<unnamed>")
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_company(company: &Company, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(company)?,
        OutputFormat::Table => {
            println!("id: {}", company.id);
            println!(
                "name: {}",
                company.org_name.as_deref().unwrap_or("<unnamed>")
            );
            if let Some(creator) = &company.creator {
                println!("creator: {creator}");
            }
            println!(
                "period: {} .. {}",
                short_date(company.start_date.as_deref()),
                short_date(company.end_date.as_deref())
            );
            if let Some(created) = &company.created_date {
                println!("created: {created}");
            }
            if let Some(count) = company.result_count {
                println!("results: {count}");
            }
            if let Some(notes) = company.notes.as_deref().filter(|notes| !notes.is_empty()) {
                println!("notes: {notes}");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_patient_list(patients: &[Patient], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(patients)?,
        OutputFormat::Table => {
            println!(
                "{:<8} {:<10} {:<28} {:<10} {:<12} FILE",
                "ID", "ITEM", "NAME", "TYPE", "CONCLUDED"
            );
            for patient in patients {
                println!(
                    "{:<8} {:<10} {:<28} {:<10} {:<12} {}",
                    patient.id.to_string(),
                    patient
                        .item_num
                        .as_ref()
                        .map_or_else(|| "N/A".to_string(), ToString::to_string),
                    patient.full_name(),
                    patient.health_type.as_deref().unwrap_or("-"),
                    short_date(patient.conclusion_date.as_deref()),
                    patient.file_name.as_deref().unwrap_or("-")
                );
            }
            println!("{} patient(s)", patients.len());
        }
    }
    Ok(())
}

/// Render the server's acknowledgement of a result write.
pub(crate) fn render_ack(
    body: &serde_json::Value,
    fallback: &str,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(body)?,
        OutputFormat::Table => {
            let message = body
                .get("message")
                .and_then(serde_json::Value::as_str)
                .filter(|message| !message.trim().is_empty())
                .unwrap_or(fallback);
            println!("{message}");
        }
    }
    Ok(())
}

/// Date part of an ISO-8601 timestamp, or `-`.
#[must_use]
pub(crate) fn short_date(value: Option<&str>) -> &str {
    value
        .map(|raw| raw.split('T').next().unwrap_or(raw))
        .filter(|raw| !raw.is_empty())
        .unwrap_or("-")
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2_048), "2.00 KiB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
    }

    #[test]
    fn short_date_trims_time_component() {
        assert_eq!(short_date(Some("2024-05-01T08:00:00.000Z")), "2024-05-01");
        assert_eq!(short_date(Some("2024-05-01")), "2024-05-01");
        assert_eq!(short_date(Some("")), "-");
        assert_eq!(short_date(None), "-");
    }
}
