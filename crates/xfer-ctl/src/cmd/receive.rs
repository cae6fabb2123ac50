//! Receiver side: feed scanned payloads into one session and save the result.
//!
//! Payloads are read on a separate task and handed over a channel, so the
//! session only ever sees one payload at a time regardless of how the input
//! is produced.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use xfer_core::config::XferConfig;
use xfer_core::{Progress, SessionState, TransferOutcome, TransferSession};

const DEFAULT_OUTPUT_NAME: &str = "received.bin";

/// Scanned payloads waiting to be applied.
const SCAN_QUEUE_DEPTH: usize = 256;

pub async fn cmd_receive(
    config: &XferConfig,
    input: Option<&str>,
    output_name: Option<&str>,
    json: bool,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<String>(SCAN_QUEUE_DEPTH);

    let reader = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open input: {}", path))?;
            tokio::spawn(read_scans(BufReader::new(file), tx))
        }
        None => tokio::spawn(read_scans(BufReader::new(tokio::io::stdin()), tx)),
    };

    let session = TransferSession::with_digest(Box::new(config.digest.algorithm))
        .with_max_chunks(config.receiver.max_chunks);
    let name = output_name.unwrap_or(DEFAULT_OUTPUT_NAME);
    let output_dir = config.receiver.output_dir.clone();

    let outcome = apply_scans(session, rx, |progress, outcome| {
        if json {
            match serde_json::to_string(progress) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to serialize progress"),
            }
        } else {
            print_progress(progress);
        }
        if let Some(outcome) = outcome {
            if let Some(data) = &outcome.data {
                match save_output(&output_dir, name, outcome.verified, data) {
                    Ok(path) => eprintln!("Saved {} bytes → {}", data.len(), path.display()),
                    Err(e) => eprintln!("Failed to save output: {e:#}"),
                }
            }
        }
    })
    .await;

    let verified = outcome.as_ref().is_some_and(|o| o.verified);
    finish_reader(reader, verified).await?;

    match outcome {
        Some(outcome) if outcome.verified => Ok(()),
        Some(outcome) => bail!(
            "transfer failed: {}",
            outcome
                .failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown".into())
        ),
        None => bail!("input ended before the transfer finished"),
    }
}

/// Read one payload per line, dropping blank lines.
async fn read_scans<R>(reader: R, tx: mpsc::Sender<String>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if tx.send(line.to_string()).await.is_err() {
            // Receiver finished; remaining input is irrelevant.
            break;
        }
    }
    Ok(())
}

/// Join the reader task. After a verified transfer the input may still be
/// open (a live scanner pipe), so the reader is stopped instead.
async fn finish_reader(reader: JoinHandle<Result<()>>, verified: bool) -> Result<()> {
    if verified {
        reader.abort();
        return Ok(());
    }
    reader
        .await
        .context("scan reader task panicked")?
        .context("failed to read scanned payloads")
}

/// Apply payloads from `rx` one at a time until a verified transfer
/// completes or the channel closes.
///
/// `on_update` sees every progress change, plus the outcome each time the
/// session reaches a terminal state. Returns the last terminal outcome.
async fn apply_scans<F>(
    mut session: TransferSession,
    mut rx: mpsc::Receiver<String>,
    mut on_update: F,
) -> Option<TransferOutcome>
where
    F: FnMut(&Progress, Option<&TransferOutcome>),
{
    let mut last = session.progress();
    let mut finished: Option<TransferOutcome> = None;

    while let Some(text) = rx.recv().await {
        let progress = session.feed(&text);
        if progress == last {
            continue;
        }

        let outcome = if progress.state.is_terminal() && !last.state.is_terminal() {
            session.final_result().cloned()
        } else {
            None
        };
        on_update(&progress, outcome.as_ref());
        last = progress;

        if let Some(outcome) = outcome {
            let done = outcome.verified;
            finished = Some(outcome);
            if done {
                break;
            }
            // A failed transfer may still be resent; keep listening.
            tracing::warn!("transfer failed, waiting for the sender to restart");
        }
    }
    finished
}

fn print_progress(progress: &Progress) {
    let total = progress
        .total_chunks
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".into());
    match progress.state {
        SessionState::Idle => println!("  waiting for begin marker"),
        SessionState::HeaderCollect => println!("  reading header (LEN {total})"),
        SessionState::Transferring => {
            let next_gap = progress
                .missing_chunks
                .first()
                .map(|s| format!(", next gap #{s}"))
                .unwrap_or_default();
            println!(
                "  {}/{} chunks ({:.0}%), {} missing{}",
                progress.received_chunks,
                total,
                progress.fraction() * 100.0,
                progress.missing_chunks.len(),
                next_gap
            );
        }
        SessionState::Completed => {
            println!("═══════════════════════════════════════");
            println!("  Transfer complete, digest verified");
            println!("═══════════════════════════════════════");
        }
        SessionState::Failed => {
            println!("═══════════════════════════════════════");
            println!(
                "  Transfer failed: {}",
                progress.failure.as_deref().unwrap_or("unknown")
            );
            if !progress.missing_chunks.is_empty() {
                println!("  Missing chunks: {:?}", progress.missing_chunks);
            }
            println!("═══════════════════════════════════════");
        }
    }
}

/// Write a reconstructed buffer under `dir`. Unverified buffers get an
/// `.unverified` suffix so they are never mistaken for a good transfer.
fn save_output(dir: &Path, name: &str, verified: bool, data: &[u8]) -> Result<PathBuf> {
    let file_name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_OUTPUT_NAME);
    let file_name = if verified {
        file_name.to_string()
    } else {
        format!("{file_name}.unverified")
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let path = dir.join(file_name);
    std::fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = data.len(), verified, "output saved");
    Ok(path)
}
