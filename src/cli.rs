//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use mdpdf_core::{ConfigError, FetchConfig};

/// Default working directory for fetched images.
pub const DEFAULT_WORK_DIR: &str = ".mdpdf-images";

/// Fetch the remote images of a markdown document for PDF conversion.
///
/// Reads a markdown file (or stdin), downloads every remote image into a
/// working directory and writes the markdown back with local image paths.
/// Images that cannot be fetched keep their original URL.
#[derive(Parser, Debug)]
#[command(name = "mdpdf")]
#[command(author, version, about)]
pub struct Args {
    /// Markdown file to process (reads stdin when omitted)
    pub input: Option<PathBuf>,

    /// Write the rewritten markdown here instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Directory that receives fetched images
    #[arg(short = 'w', long, default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    /// JSON config file with fetch limits (flags override its values)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum concurrent image fetches (1-100) [default: 5]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Maximum attempts per image, the first one included [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds (1-3600) [default: 10]
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Largest accepted image in bytes [default: 104857600]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_image_bytes: Option<u64>,

    /// Largest accepted total of fetched bytes [default: 524288000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_session_bytes: Option<u64>,

    /// Remove fetched images once the output is written
    #[arg(long)]
    pub cleanup: bool,
}

impl Args {
    /// Builds the fetch config: defaults, then `--config`, then flags.
    pub fn fetch_config(&self) -> Result<FetchConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => FetchConfig::from_json_file(path)?,
            None => FetchConfig::default(),
        };

        if let Some(concurrency) = self.concurrency {
            config = config.with_max_concurrent_downloads(usize::from(concurrency));
        }
        if let Some(max_retries) = self.max_retries {
            config = config.with_max_retries(max_retries);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_request_timeout_secs(timeout);
        }
        if let Some(bytes) = self.max_image_bytes {
            config = config.with_max_bytes_per_image(bytes);
        }
        if let Some(bytes) = self.max_session_bytes {
            config = config.with_max_bytes_per_session(bytes);
        }

        config.validate()?;
        Ok(config)
    }
}
