//! Deterministic file naming for fetched images.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Number of hash bytes kept in a file name (16 hex characters).
const HASH_BYTES: usize = 8;

/// Extension used when the image subtype is not recognised.
const FALLBACK_EXTENSION: &str = ".img";

/// Returns the lowercased base MIME type, without parameters.
pub(crate) fn base_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Returns true for `image/*` content types, ignoring case and parameters.
pub(crate) fn is_image_content_type(content_type: &str) -> bool {
    base_mime_type(content_type)
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

/// Maps an image Content-Type to a file extension (including the dot).
pub(crate) fn extension_from_content_type(content_type: &str) -> &'static str {
    match base_mime_type(content_type).as_str() {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/bmp" | "image/x-ms-bmp" => ".bmp",
        "image/tiff" => ".tiff",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "image/avif" => ".avif",
        _ => FALLBACK_EXTENSION,
    }
}

/// Builds the file name for `url`: a short hex digest of the URL plus an
/// extension derived from `content_type`.
///
/// The same URL always yields the same name.
pub(crate) fn image_filename(url: &str, content_type: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut name = String::with_capacity(HASH_BYTES * 2 + 6);
    for byte in &digest[..HASH_BYTES] {
        let _ = write!(name, "{byte:02x}");
    }
    name.push_str(extension_from_content_type(content_type));
    name
}

/// Full path of the image file for `url` under `dir`.
pub(crate) fn image_path(dir: &Path, url: &str, content_type: &str) -> PathBuf {
    dir.join(image_filename(url, content_type))
}
