//! Diagnostics: payload classification, digests, resolved config.

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use xfer_core::config::XferConfig;
use xfer_core::wire::{classify, Message};

pub fn cmd_classify(text: &str) {
    let message = classify(text);
    println!("kind : {}", message.kind());
    match &message {
        Message::HeaderField { field, value } => {
            println!("field: {}", field.prefix().trim_end_matches(':'));
            println!("value: {}", value);
        }
        Message::DataChunk(chunk) => {
            println!("seq  : {}", chunk.sequence);
            println!("chars: {}", chunk.payload.len());
        }
        _ => {}
    }
}

pub async fn cmd_digest(config: &XferConfig, path: &str) -> Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open file: {}", path))?;

    let mut hasher = config.digest.algorithm.hasher();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .with_context(|| format!("failed to read file: {}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    println!("{}  {}", hasher.finalize_hex(), path);
    Ok(())
}

pub fn cmd_config(config: &XferConfig) -> Result<()> {
    println!("# {}", XferConfig::file_path().display());
    print!("{}", config.to_toml()?);
    Ok(())
}
