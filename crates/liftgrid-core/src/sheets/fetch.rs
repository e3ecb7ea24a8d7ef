use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::{DEFAULT_EXPORT_BASE, DEFAULT_RANGE};
use crate::grid::Grid;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("document export returned HTTP {status}")]
    Transport { status: u16 },

    #[error("document export request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("document export is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid export base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Source of raw grids.
#[async_trait]
pub trait GridFetcher: Send + Sync {
    /// Download the current contents of `document_id` as a fresh [`Grid`].
    async fn fetch_grid(&self, document_id: &str) -> Result<Grid, FetchError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn GridFetcher) {}
};

/// Reads a sheet through the public CSV export (`gviz/tq?tqx=out:csv`).
///
/// Needs the document to be shared for reading; no token is sent.
pub struct CsvExportFetcher {
    http: reqwest::Client,
    export_base: String,
    sheet_name: Option<String>,
    range: String,
}

impl CsvExportFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            export_base: DEFAULT_EXPORT_BASE.to_owned(),
            sheet_name: None,
            range: DEFAULT_RANGE.to_owned(),
        }
    }

    pub fn with_export_base(mut self, base: impl Into<String>) -> Self {
        self.export_base = base.into();
        self
    }

    pub fn with_sheet_name(mut self, sheet: Option<String>) -> Self {
        self.sheet_name = sheet.filter(|s| !s.is_empty());
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    /// `{base}/spreadsheets/d/{id}/gviz/tq?tqx=out:csv&range=..[&sheet=..]`
    pub fn export_url(&self, document_id: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.export_base)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["spreadsheets", "d", document_id, "gviz", "tq"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("tqx", "out:csv");
            query.append_pair("range", &self.range);
            if let Some(sheet) = &self.sheet_name {
                query.append_pair("sheet", sheet);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl GridFetcher for CsvExportFetcher {
    async fn fetch_grid(&self, document_id: &str) -> Result<Grid, FetchError> {
        let url = self.export_url(document_id)?;
        debug!(document_id, url = %url, "fetching document export");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let rows = parse_csv(&body)?;
        let grid = Grid::new(rows);
        info!(document_id, grid_id = %grid.id(), rows = grid.len(), "document fetched");
        Ok(grid)
    }
}

/// Parse CSV into rows of cells. Rows may have different lengths.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_owned).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_handles_quotes_and_ragged_rows() {
        let rows = parse_csv(b"\"\",\"Monday, legs\",\"\"\nExercise,Squat\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["", "Monday, legs", ""]);
        assert_eq!(rows[1], vec!["Exercise", "Squat"]);
    }

    #[test]
    fn export_url_carries_range_and_sheet() {
        let fetcher = CsvExportFetcher::new(reqwest::Client::new())
            .with_export_base("http://127.0.0.1:9999/")
            .with_sheet_name(Some("Week 1".into()));
        let url = fetcher.export_url("ABC123").unwrap();
        assert_eq!(url.path(), "/spreadsheets/d/ABC123/gviz/tq");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("tqx".into(), "out:csv".into())));
        assert!(pairs.contains(&("range".into(), DEFAULT_RANGE.into())));
        assert!(pairs.contains(&("sheet".into(), "Week 1".into())));
    }

    #[test]
    fn empty_sheet_name_is_ignored() {
        let fetcher =
            CsvExportFetcher::new(reqwest::Client::new()).with_sheet_name(Some(String::new()));
        let url = fetcher.export_url("X").unwrap();
        assert!(url.query_pairs().all(|(k, _)| k != "sheet"));
    }
}
