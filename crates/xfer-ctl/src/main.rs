//! xfer-ctl — command-line driver for the xfer transfer engine.
//!
//! The sender side prints the payload sequence (one payload per line) for a
//! QR renderer to display. The receiver side reads scanned payloads, one per
//! line, from stdin or a file and writes the reconstructed buffer to disk.

use anyhow::{Context, Result};

use xfer_core::config::XferConfig;

mod cmd;

fn print_usage() {
    println!("Usage: xfer-ctl <command> [options]");
    println!();
    println!("Commands:");
    println!("  send <file> [--chunk-size N] [--out <path>]");
    println!("                      Print the payload sequence for <file>, one per line");
    println!("  receive [--input <path>] [--output <name>] [--json]");
    println!("                      Feed scanned payloads (stdin by default) and save the result");
    println!("  classify <text>     Show how a single payload is classified");
    println!("  digest <file>       Print the digest of <file> with the configured algorithm");
    println!("  config              Print the resolved configuration");
    println!();
    println!("Environment:");
    println!("  XFER_CONFIG                  Config file path");
    println!("  XFER_FRAMER__CHUNK_SIZE      Bytes per chunk");
    println!("  XFER_DIGEST__ALGORITHM       sha1 | blake3");
    println!("  XFER_RECEIVER__OUTPUT_DIR    Where received files are written");
    println!("  XFER_RECEIVER__MAX_CHUNKS    Largest LEN a receiver accepts");
    println!("  RUST_LOG                     Log filter (logs go to stderr)");
}

/// Pull `--flag <value>` out of `args`, returning the value.
fn take_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    args.remove(pos);
    if pos >= args.len() {
        anyhow::bail!("{flag} requires a value");
    }
    Ok(Some(args.remove(pos)))
}

/// Pull a bare `--flag` out of `args`.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = XferConfig::load().context("failed to load configuration")?;

    if let Some(size) = take_option(&mut args, "--chunk-size")? {
        config.framer.chunk_size = size.parse().context("--chunk-size must be a number")?;
    }
    let out = take_option(&mut args, "--out")?;
    let input = take_option(&mut args, "--input")?;
    let output_name = take_option(&mut args, "--output")?;
    let json = take_flag(&mut args, "--json");

    let remaining: Vec<&str> = args.iter().map(String::as_str).collect();
    match remaining.as_slice() {
        ["send", file] => cmd::send::cmd_send(&config, file, out.as_deref()).await,
        ["receive"] => {
            cmd::receive::cmd_receive(&config, input.as_deref(), output_name.as_deref(), json).await
        }
        ["classify", text] => {
            cmd::inspect::cmd_classify(text);
            Ok(())
        }
        ["digest", file] => cmd::inspect::cmd_digest(&config, file).await,
        ["config"] => cmd::inspect::cmd_config(&config),
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
