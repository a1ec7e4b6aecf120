use anyhow::anyhow;
use hadocs_api_models::Company;

use crate::cli::{CompanyShowArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, classify_problem, encode_segment, read_envelope};
use crate::output::{render_company, render_company_list};

pub(crate) async fn handle_company_list(ctx: &AppContext, output: OutputFormat) -> CliResult<()> {
    let url = ctx.endpoint("all-data")?;
    let response = ctx
        .client
        .get(url)
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to /all-data failed: {err}")))?;

    if response.status().is_success() {
        let companies = read_envelope::<Vec<Company>>(response, "organization list").await?;
        render_company_list(&companies, output)
    } else {
        Err(classify_problem(response).await)
    }
}

pub(crate) async fn handle_company_show(
    ctx: &AppContext,
    args: CompanyShowArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let id = args.id.trim();
    if id.is_empty() {
        return Err(CliError::validation("organization id must not be empty"));
    }
    let url = ctx.endpoint(&format!("all-data/{}", encode_segment(id)))?;
    let response = ctx
        .client
        .get(url)
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to /all-data/{id} failed: {err}")))?;

    if response.status().is_success() {
        let company = read_envelope::<Company>(response, "organization").await?;
        render_company(&company, output)
    } else {
        Err(classify_problem(response).await)
    }
}
