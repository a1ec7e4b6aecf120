//! Terminal renderer for replace/skip conflicts raised during an upload.

use hadocs_upload::{ConflictDecision, ConflictQueue};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Answer queued conflicts one at a time from `input`, echoing prompts to `out`.
///
/// End of input and blank lines answer skip. Returns the number of conflicts
/// shown once every resolver handle has been dropped.
pub(crate) async fn render_conflicts<R, W>(
    mut queue: ConflictQueue,
    input: R,
    mut out: W,
) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut shown = 0;
    while let Some(pending) = queue.next().await {
        shown += 1;
        out.write_all(
            format!(
                "'{}' already exists on the server. [r]eplace / [s]kip (default skip): ",
                pending.filename()
            )
            .as_bytes(),
        )
        .await?;
        out.flush().await?;

        let decision = match lines.next_line().await? {
            Some(line) => parse_answer(&line),
            None => {
                out.write_all(b"\n").await?;
                ConflictDecision::Skip
            }
        };
        pending.answer(decision);
    }
    Ok(shown)
}

/// Interpret one line typed at the prompt.
#[must_use]
pub(crate) fn parse_answer(line: &str) -> ConflictDecision {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "replace" | "y" | "yes" => ConflictDecision::Replace,
        _ => ConflictDecision::Skip,
    }
}
