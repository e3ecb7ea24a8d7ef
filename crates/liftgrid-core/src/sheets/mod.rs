//! Transport adapters for the spreadsheet service.
//!
//! - [`document`]: document id extraction from share URLs
//! - [`address`]: 0-based coordinates to A1 notation
//! - [`fetch`]: grid download through the CSV export
//! - [`values`]: single-cell writes through the values API

pub mod address;
pub mod document;
pub mod fetch;
pub mod values;

use std::time::Duration;

pub use address::{AddressParseError, CellAddress, column_letters, range_origin};
pub use document::{DocumentUrlError, extract_document_id, parse_document_url};
pub use fetch::{CsvExportFetcher, FetchError, GridFetcher};
pub use values::{CellWriteError, CellWriter, SheetsValuesWriter};

/// Public endpoint of the values API.
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
/// Public host serving document exports.
pub const DEFAULT_EXPORT_BASE: &str = "https://docs.google.com";
/// Export range used when none is configured.
pub const DEFAULT_RANGE: &str = "A1:Z1000";

const USER_AGENT: &str = concat!("liftgrid/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client for every adapter.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}
