//! User-Agent string for image fetch requests.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/mdpdf";

/// Default User-Agent for image fetch requests (identifies the tool).
#[must_use]
pub(crate) fn default_fetch_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("mdpdf/{version} (markdown-image-fetcher; +{PROJECT_UA_URL})")
}
