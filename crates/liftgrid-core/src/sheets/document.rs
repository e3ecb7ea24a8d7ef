use std::sync::LazyLock;

use regex::Regex;

static DOCUMENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("regex for document ids")
});

#[derive(Debug, thiserror::Error)]
pub enum DocumentUrlError {
    #[error("not a spreadsheet URL (no /d/<id> segment): {url}")]
    Invalid { url: String },
}

/// Pull the document id out of a share URL.
///
/// Matches both `/spreadsheets/d/<id>` and a bare `/d/<id>` segment.
pub fn extract_document_id(url: &str) -> Option<String> {
    DOCUMENT_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Like [`extract_document_id`], but an error when no id is present.
pub fn parse_document_url(url: &str) -> Result<String, DocumentUrlError> {
    extract_document_id(url.trim()).ok_or_else(|| DocumentUrlError::Invalid {
        url: url.to_owned(),
    })
}
