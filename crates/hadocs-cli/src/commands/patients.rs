use anyhow::anyhow;
use hadocs_api_models::Patient;

use crate::cli::{OutputFormat, PatientListArgs};
use crate::client::{AppContext, CliError, CliResult, classify_problem, encode_segment, read_envelope};
use crate::output::render_patient_list;

pub(crate) async fn handle_patient_list(
    ctx: &AppContext,
    args: PatientListArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let company_id = args.company_id.trim();
    if company_id.is_empty() {
        return Err(CliError::validation("organization id must not be empty"));
    }
    let url = ctx.endpoint(&format!("result-detail/{}", encode_segment(company_id)))?;
    let response = ctx.client.get(url).send().await.map_err(|err| {
        CliError::failure(anyhow!(
            "request to /result-detail/{company_id} failed: {err}"
        ))
    })?;

    if response.status().is_success() {
        let patients = read_envelope::<Vec<Patient>>(response, "patient list").await?;
        render_patient_list(&patients, output)
    } else {
        Err(classify_problem(response).await)
    }
}
