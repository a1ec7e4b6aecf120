//! Argument parsing and command dispatch.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hadocs_telemetry::{
    DEFAULT_LOG_LEVEL, GlobalContextGuard, LogFormat, LoggingConfig, init_logging,
    log_format_from_env,
};
use hadocs_upload::{MAX_UPLOAD_BYTES, UploadConfig};
use reqwest::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliDependencies, CliResult, parse_url};
use crate::commands::companies::{handle_company_list, handle_company_show};
use crate::commands::docs::{
    handle_docs_check, handle_docs_fetch, handle_docs_upload, handle_docs_url,
};
use crate::commands::patients::handle_patient_list;
use crate::commands::results::{handle_result_create, handle_result_update};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

/// Parses CLI arguments, executes the requested command, and handles
/// user-facing telemetry emission. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let format = cli.log_format.unwrap_or_else(log_format_from_env);
    let logging = LoggingConfig {
        level: &cli.log_level,
        format,
        build_sha: option_env!("HADOCS_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let command_name = command_label(&cli.command);
    let _context = GlobalContextGuard::new(command_name);
    let trace_id = Uuid::new_v4().to_string();
    let deps = match CliDependencies::from_env(&cli, &trace_id) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let telemetry = deps.telemetry.clone();

    let result = dispatch(cli, &deps).await;

    let (exit_code, message, outcome) = match result {
        Ok(()) => (0, None, "success"),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error")
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(
                &trace_id,
                command_name,
                outcome,
                exit_code,
                message.as_deref(),
            )
            .await;
    }

    exit_code
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let ctx = AppContext {
        client: deps.client.clone(),
        base_url: cli.api_url,
        upload: UploadConfig {
            probe_timeout: Duration::from_secs(cli.timeout),
            max_upload_bytes: cli.max_upload_bytes,
        },
    };

    match cli.command {
        Command::Docs(docs) => match docs {
            DocsCommand::Upload(args) => handle_docs_upload(&ctx, args, cli.output).await,
            DocsCommand::Check(args) => handle_docs_check(&ctx, args, cli.output).await,
            DocsCommand::Fetch(args) => handle_docs_fetch(&ctx, args).await,
            DocsCommand::Url(args) => handle_docs_url(&ctx, &args),
        },
        Command::Companies(companies) => match companies {
            CompanyCommand::Ls => handle_company_list(&ctx, cli.output).await,
            CompanyCommand::Show(args) => handle_company_show(&ctx, args, cli.output).await,
        },
        Command::Patients(patients) => match patients {
            PatientCommand::Ls(args) => handle_patient_list(&ctx, args, cli.output).await,
        },
        Command::Result(result) => match result {
            ResultCommand::Update(args) => handle_result_update(&ctx, args, cli.output).await,
            ResultCommand::Create(args) => handle_result_create(&ctx, args, cli.output).await,
        },
    }
}

#[derive(Parser)]
#[command(
    name = "hadocs",
    about = "Upload and review health-examination result documents"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "HADOCS_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "HADOCS_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "HADOCS_MAX_UPLOAD_BYTES",
        default_value_t = MAX_UPLOAD_BYTES,
        help = "Client-side ceiling for each file and for the whole upload batch"
    )]
    pub(crate) max_upload_bytes: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        value_parser = parse_log_format,
        help = "Log format on stderr: json or pretty (defaults to HADOCS_LOG_FORMAT)"
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[arg(
        long,
        global = true,
        env = "HADOCS_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Upload, check, and download result documents.
    #[command(subcommand)]
    Docs(DocsCommand),
    /// Browse examined organizations.
    #[command(subcommand)]
    Companies(CompanyCommand),
    /// Browse patients of an organization.
    #[command(subcommand)]
    Patients(PatientCommand),
    /// Write examination conclusions.
    #[command(subcommand)]
    Result(ResultCommand),
}

#[derive(Subcommand)]
pub(crate) enum DocsCommand {
    /// Upload files, asking before replacing documents that already exist.
    Upload(DocsUploadArgs),
    /// Report whether a document is stored.
    Check(DocNameArgs),
    /// Download a stored document.
    Fetch(DocsFetchArgs),
    /// Print the public URL of a stored document.
    Url(DocNameArgs),
}

#[derive(Subcommand)]
pub(crate) enum CompanyCommand {
    /// List organizations.
    Ls,
    /// Show one organization.
    Show(CompanyShowArgs),
}

#[derive(Subcommand)]
pub(crate) enum PatientCommand {
    /// List the patients examined for an organization.
    Ls(PatientListArgs),
}

#[derive(Subcommand)]
pub(crate) enum ResultCommand {
    /// Update the conclusion of an existing patient record.
    Update(ResultUpdateArgs),
    /// Create a conclusion record under an organization.
    Create(ResultCreateArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OnConflict {
    /// Prompt on the terminal for every existing document.
    #[default]
    Ask,
    /// Replace every existing document.
    Replace,
    /// Keep every existing document.
    Skip,
}

#[derive(Args)]
pub(crate) struct DocsUploadArgs {
    #[arg(required = true, help = "Files to upload; names should start with the ItemNum")]
    pub(crate) paths: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = OnConflict::Ask)]
    pub(crate) on_conflict: OnConflict,
}

#[derive(Args)]
pub(crate) struct DocNameArgs {
    #[arg(help = "Stored document name")]
    pub(crate) filename: String,
}

#[derive(Args)]
pub(crate) struct DocsFetchArgs {
    #[arg(help = "Stored document name")]
    pub(crate) filename: String,
    #[arg(long, help = "Destination path (defaults to the document name)")]
    pub(crate) out: Option<PathBuf>,
    #[arg(long, help = "Overwrite the destination if it exists")]
    pub(crate) force: bool,
}

#[derive(Args)]
pub(crate) struct CompanyShowArgs {
    #[arg(help = "Organization identifier")]
    pub(crate) id: String,
}

#[derive(Args)]
pub(crate) struct PatientListArgs {
    #[arg(help = "Organization identifier (DataId)")]
    pub(crate) company_id: String,
}

#[derive(Args, Clone, Default)]
pub(crate) struct ResultFields {
    #[arg(long)]
    pub(crate) health_type: String,
    #[arg(long)]
    pub(crate) conclusion: String,
    #[arg(long, default_value = "")]
    pub(crate) suggestion: String,
    #[arg(long, help = "Conclusion date (YYYY-MM-DD)")]
    pub(crate) conclusion_date: Option<String>,
    #[arg(long = "doctor")]
    pub(crate) conclusion_doctor: String,
    #[arg(long, default_value = "", help = "Attached document name")]
    pub(crate) file_name: String,
}

#[derive(Args)]
pub(crate) struct ResultUpdateArgs {
    #[arg(help = "Patient record identifier")]
    pub(crate) id: String,
    #[command(flatten)]
    pub(crate) fields: ResultFields,
}

#[derive(Args)]
pub(crate) struct ResultCreateArgs {
    #[arg(help = "Organization identifier (DataId)")]
    pub(crate) company_id: String,
    #[command(flatten)]
    pub(crate) fields: ResultFields,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse()
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Docs(DocsCommand::Upload(_)) => "docs_upload",
        Command::Docs(DocsCommand::Check(_)) => "docs_check",
        Command::Docs(DocsCommand::Fetch(_)) => "docs_fetch",
        Command::Docs(DocsCommand::Url(_)) => "docs_url",
        Command::Companies(CompanyCommand::Ls) => "companies_ls",
        Command::Companies(CompanyCommand::Show(_)) => "companies_show",
        Command::Patients(PatientCommand::Ls(_)) => "patients_ls",
        Command::Result(ResultCommand::Update(_)) => "result_update",
        Command::Result(ResultCommand::Create(_)) => "result_create",
    }
}
