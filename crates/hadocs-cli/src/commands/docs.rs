use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use hadocs_upload::{
    ConflictHandler, ConflictPolicy, ConflictResolver, CycleState, DocumentBackend, DropSurface,
    DroppedBatch, DroppedFile, UploadOutcome, UploadPipeline,
};
use tokio::io::BufReader;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::HttpDocumentBackend;
use crate::cli::{DocNameArgs, DocsFetchArgs, DocsUploadArgs, OnConflict, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{format_bytes, render_exists, render_outcome};
use crate::prompt::render_conflicts;

fn backend(ctx: &AppContext) -> HttpDocumentBackend {
    HttpDocumentBackend::new(ctx.client.clone(), ctx.base_url.clone())
}

pub(crate) async fn handle_docs_upload(
    ctx: &AppContext,
    args: DocsUploadArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let batch = load_batch(&args.paths).await?;
    for file in &batch {
        if let Some(hint) = item_num_hint(file.name()) {
            eprintln!("hint: {hint}");
        }
    }

    let outcome = upload_batch(ctx, batch, args.on_conflict).await?;
    render_outcome(&outcome, output)?;
    if outcome.success {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(
            "server reported the upload as failed: {}",
            outcome.message
        )))
    }
}

/// Run one upload cycle through a freshly attached drop surface.
pub(crate) async fn upload_batch(
    ctx: &AppContext,
    batch: DroppedBatch,
    on_conflict: OnConflict,
) -> CliResult<UploadOutcome> {
    let pipeline = UploadPipeline::new(Arc::new(backend(ctx)), &ctx.upload);
    let (handler, renderer): (Arc<dyn ConflictHandler>, Option<JoinHandle<_>>) =
        match on_conflict {
            OnConflict::Ask => {
                let (resolver, queue) = ConflictResolver::channel();
                let renderer = tokio::spawn(render_conflicts(
                    queue,
                    BufReader::new(tokio::io::stdin()),
                    tokio::io::stderr(),
                ));
                (Arc::new(resolver), Some(renderer))
            }
            OnConflict::Replace => (Arc::new(ConflictPolicy::Replace), None),
            OnConflict::Skip => (Arc::new(ConflictPolicy::Skip), None),
        };

    let surface = DropSurface::new(pipeline, handler);
    let registration = surface
        .attach()
        .map_err(|err| CliError::failure(anyhow!(err)))?;
    let progress = tokio::spawn(log_progress(surface.subscribe_cycle()));

    let result = surface.drop_files(batch).await;

    registration.detach();
    drop(surface);
    progress.abort();
    if let Some(renderer) = renderer {
        match renderer.await {
            Ok(Ok(shown)) => debug!(shown, "conflict prompts finished"),
            Ok(Err(err)) => warn!(error = %err, "conflict prompt failed; remaining files skipped"),
            Err(err) => warn!(error = %err, "conflict prompt task aborted"),
        }
    }

    match result {
        Some(result) => result.map_err(CliError::from_upload),
        None => Ok(UploadOutcome::nothing_uploaded(Vec::new())),
    }
}

async fn load_batch(paths: &[PathBuf]) -> CliResult<DroppedBatch> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(DroppedFile::load(path).await.map_err(CliError::from_upload)?);
    }
    Ok(DroppedBatch::new(files))
}

async fn log_progress(mut states: watch::Receiver<CycleState>) {
    while states.changed().await.is_ok() {
        let state = states.borrow_and_update().clone();
        match state {
            CycleState::Probing { index, filename } => {
                debug!(index, filename = %filename, "checking for existing document");
            }
            CycleState::Resolving { filename, .. } => {
                debug!(filename = %filename, "waiting for conflict answer");
            }
            CycleState::Uploading { files } => info!(files, "uploading documents"),
            CycleState::Done { .. } | CycleState::Failed { .. } | CycleState::Idle => {}
        }
    }
}

/// Advice printed when a filename does not look like `<ItemNum><separator>...`.
///
/// The server links documents to patients by the leading item number; the
/// upload still proceeds when the hint fires.
#[must_use]
pub(crate) fn item_num_hint(filename: &str) -> Option<String> {
    let prefix = filename
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .next()
        .unwrap_or_default();
    let has_separator = filename.len() > prefix.len();
    if !prefix.is_empty() && has_separator && prefix.chars().any(|ch| ch.is_ascii_digit()) {
        None
    } else {
        Some(format!(
            "'{filename}' does not start with an ItemNum; it may not be linked to a patient"
        ))
    }
}

pub(crate) async fn handle_docs_check(
    ctx: &AppContext,
    args: DocNameArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let exists = backend(ctx)
        .file_exists(&args.filename)
        .await
        .map_err(CliError::from_upload)?;
    render_exists(&args.filename, exists, output)
}

pub(crate) async fn handle_docs_fetch(ctx: &AppContext, args: DocsFetchArgs) -> CliResult<()> {
    let destination = match args.out {
        Some(path) => path,
        None => default_destination(&args.filename)?,
    };
    if !args.force && tokio::fs::try_exists(&destination).await.unwrap_or(false) {
        return Err(CliError::validation(format!(
            "'{}' already exists (pass --force to overwrite)",
            destination.display()
        )));
    }

    let bytes = backend(ctx)
        .fetch_document(&args.filename)
        .await
        .map_err(CliError::from_upload)?;
    tokio::fs::write(&destination, &bytes).await.map_err(|err| {
        CliError::failure(anyhow!(
            "failed to write '{}': {err}",
            destination.display()
        ))
    })?;
    let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    println!(
        "saved {} ({})",
        destination.display(),
        format_bytes(size)
    );
    Ok(())
}

fn default_destination(filename: &str) -> CliResult<PathBuf> {
    Path::new(filename)
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| CliError::validation("document name has no file component; pass --out"))
}

pub(crate) fn handle_docs_url(ctx: &AppContext, args: &DocNameArgs) -> CliResult<()> {
    let url = backend(ctx)
        .document_url(&args.filename)
        .map_err(CliError::from_upload)?;
    println!("{url}");
    Ok(())
}
