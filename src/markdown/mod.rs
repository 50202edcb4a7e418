//! Markdown image reference handling.
//!
//! - [`extract_remote_image_urls`] finds the remote images of a document
//! - [`rewrite_image_urls`] points fetched images at their local copies
//!
//! Both use the same matcher for `![alt](target)` references, so a URL is
//! rewritten exactly when it would have been extracted.

mod extract;
mod rewrite;

pub use extract::extract_remote_image_urls;
pub use rewrite::rewrite_image_urls;
