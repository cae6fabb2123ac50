//! Sender side: frame a file into payloads for display.

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

use xfer_core::config::XferConfig;
use xfer_core::framer::Framer;

pub async fn cmd_send(config: &XferConfig, path: &str, out: Option<&str>) -> Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read file: {}", path))?;

    let framer = Framer::with_digest(
        config.framer.chunk_size,
        Box::new(config.digest.algorithm),
    );
    let messages = framer
        .frame(&data)
        .with_context(|| format!("failed to frame {}", path))?;

    let mut text = messages.join("\n");
    text.push('\n');

    match out {
        Some(out_path) => {
            tokio::fs::write(out_path, text)
                .await
                .with_context(|| format!("failed to write {}", out_path))?;
            eprintln!(
                "Framed {} ({} bytes) into {} payloads → {}",
                path,
                data.len(),
                messages.len(),
                out_path
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    tracing::info!(
        path,
        bytes = data.len(),
        payloads = messages.len(),
        chunk_size = framer.chunk_size(),
        "send sequence written"
    );
    Ok(())
}
