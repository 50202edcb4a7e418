//! mdpdf Core Library
//!
//! Remote image acquisition for markdown-to-PDF conversion: the remote
//! images a markdown document references are downloaded into a working
//! directory and the document is rewritten to point at the local copies, so
//! a PDF renderer never has to touch the network.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`markdown`] - Remote image extraction and URL rewriting
//! - [`download`] - Concurrent fetching with retries, byte quotas and cleanup
//! - [`config`] - Fetch limits, with JSON file loading and validation
//! - [`pipeline`] - Renderer seam and the end-to-end conversion driver

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod markdown;
pub mod pipeline;
#[cfg(test)]
pub(crate) mod test_support;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, FetchConfig};
pub use download::{
    ByteQuota, CleanupReport, FetchError, FetchStats, HttpClient, ImageProcessor, ProcessError,
    QuotaExceeded, RetryPolicy, SessionState,
};
pub use markdown::{extract_remote_image_urls, rewrite_image_urls};
pub use pipeline::{
    ConversionReport, ConvertError, MarkdownWriter, RenderError, Renderer, convert_document,
    format_failure_summary,
};
