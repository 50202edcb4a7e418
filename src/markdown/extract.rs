//! Remote image reference extraction from markdown text.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

/// Regex pattern for markdown image references.
///
/// Captures the alt text (group 1) and the target (group 2). An optional
/// quoted title may follow the target and is not captured.
#[allow(clippy::expect_used)]
pub(crate) static IMAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#)
        .expect("image regex is valid") // Static pattern, safe to panic
});

/// Returns true when `target` starts with `http://` or `https://`, in any case.
pub(crate) fn is_remote_target(target: &str) -> bool {
    let has_prefix = |prefix: &str| {
        target
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    has_prefix("http://") || has_prefix("https://")
}

/// Byte range and text of the target of an image match, when it is remote.
pub(crate) fn remote_target<'t>(captures: &Captures<'t>) -> Option<(Range<usize>, &'t str)> {
    let target = captures.get(2)?;
    is_remote_target(target.as_str()).then(|| (target.range(), target.as_str()))
}

/// Extracts remote image URLs from markdown text.
///
/// Only `![alt](target)` references whose target starts with `http://` or
/// `https://` (scheme matched case-insensitively) are returned. The result
/// keeps first-seen order and drops exact duplicates. Malformed references
/// are skipped silently.
///
/// # Examples
///
/// ```
/// use mdpdf_core::markdown::extract_remote_image_urls;
///
/// let text = "![a](https://x.org/1.png) ![b](local.png) ![c](https://x.org/1.png)";
/// assert_eq!(extract_remote_image_urls(text), vec!["https://x.org/1.png"]);
/// ```
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
#[must_use]
pub fn extract_remote_image_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for captures in IMAGE_PATTERN.captures_iter(text) {
        let Some((_, url)) = remote_target(&captures) else {
            continue;
        };
        if seen.insert(url) {
            trace!(url, "found remote image");
            urls.push(url.to_string());
        }
    }

    urls
}
