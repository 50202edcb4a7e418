//! CLI entry point for the mdpdf image fetcher.

use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};
use clap::Parser;
use mdpdf_core::pipeline::{MarkdownWriter, Renderer, convert_document, format_failure_summary};
use mdpdf_core::ImageProcessor;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so stdout carries only the rewritten markdown
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let input_text = if let Some(path) = &args.input {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        info!("No input provided. Pass a markdown file or pipe one via stdin.");
        info!("Example: mdpdf README.md -o README.local.md");
        return Ok(());
    };

    let config = args.fetch_config()?;
    let processor = ImageProcessor::new(config, &args.work_dir)?;
    let writer = match &args.output {
        Some(path) => MarkdownWriter::to_file(path),
        None => MarkdownWriter::to_stdout(),
    };

    if args.cleanup {
        let report = convert_document(&processor, &writer, &input_text).await?;
        info!(
            downloaded = report.downloaded.len(),
            failed = report.failures.len(),
            removed = report.cleanup.removed_files,
            "Done (images removed)"
        );
        return Ok(());
    }

    let rewritten = processor.process_document(&input_text).await?;
    if let Some(summary) = format_failure_summary(&processor.failures()) {
        warn!("{summary}");
    }
    writer.render(&rewritten).await?;

    info!(
        downloaded = processor.downloaded().len(),
        failed = processor.failures().len(),
        work_dir = %processor.work_dir().display(),
        "Done"
    );

    Ok(())
}
