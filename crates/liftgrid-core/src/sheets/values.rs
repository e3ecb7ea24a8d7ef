use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::DEFAULT_API_BASE;
use crate::auth::AccessToken;

#[derive(Debug, thiserror::Error)]
pub enum CellWriteError {
    #[error("cell update rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("cell update request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid API base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Writes single cell values into a document.
#[async_trait]
pub trait CellWriter: Send + Sync {
    /// Overwrite the cell at `address` (A1 notation, optionally
    /// sheet-qualified) with `value`.
    async fn update_cell(
        &self,
        document_id: &str,
        address: &str,
        value: &str,
        token: &AccessToken,
    ) -> Result<(), CellWriteError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn CellWriter) {}
};

/// [`CellWriter`] over the spreadsheet values API, one PUT per cell.
pub struct SheetsValuesWriter {
    http: reqwest::Client,
    api_base: String,
}

impl SheetsValuesWriter {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            api_base: DEFAULT_API_BASE.to_owned(),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}?valueInputOption=RAW`
    pub fn update_url(&self, document_id: &str, range: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.api_base)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", document_id, "values", range]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        Ok(url)
    }
}

#[async_trait]
impl CellWriter for SheetsValuesWriter {
    async fn update_cell(
        &self,
        document_id: &str,
        address: &str,
        value: &str,
        token: &AccessToken,
    ) -> Result<(), CellWriteError> {
        let url = self.update_url(document_id, address)?;
        let body = json!({
            "range": address,
            "values": [[value]],
        });

        let response = self
            .http
            .put(url)
            .bearer_auth(token.secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
                .unwrap_or(text);
            return Err(CellWriteError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(document_id, address, "cell updated");
        Ok(())
    }
}
