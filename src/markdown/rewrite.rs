//! Rewriting of fetched image URLs to local paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::extract::{IMAGE_PATTERN, remote_target};

/// Replaces remote image URLs found in `downloaded` with their local paths.
///
/// Uses the same matcher as
/// [`extract_remote_image_urls`](super::extract_remote_image_urls). Only the
/// target of a matching reference changes; alt text, title and every other
/// byte of `text` are preserved. References whose URL is not in `downloaded`
/// are left untouched. Running the rewrite again on its own output changes
/// nothing.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use std::path::PathBuf;
/// use mdpdf_core::markdown::rewrite_image_urls;
///
/// let mut downloaded = HashMap::new();
/// downloaded.insert("https://x.org/1.png".to_string(), PathBuf::from("/tmp/a1.png"));
///
/// let out = rewrite_image_urls("![a](https://x.org/1.png)", &downloaded);
/// assert_eq!(out, "![a](/tmp/a1.png)");
/// ```
#[must_use]
pub fn rewrite_image_urls<S: std::hash::BuildHasher>(
    text: &str,
    downloaded: &HashMap<String, PathBuf, S>,
) -> String {
    if downloaded.is_empty() {
        return text.to_string();
    }

    let mut output = String::with_capacity(text.len());
    let mut last_end = 0;

    for captures in IMAGE_PATTERN.captures_iter(text) {
        let Some((range, url)) = remote_target(&captures) else {
            continue;
        };
        let Some(path) = downloaded.get(url) else {
            continue;
        };
        output.push_str(&text[last_end..range.start]);
        output.push_str(&markdown_target(path));
        last_end = range.end;
    }

    output.push_str(&text[last_end..]);
    output
}

/// Formats a local path as a markdown link target.
///
/// Paths containing whitespace are wrapped in angle brackets.
fn markdown_target(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if rendered.chars().any(char::is_whitespace) {
        format!("<{rendered}>")
    } else {
        rendered.into_owned()
    }
}
