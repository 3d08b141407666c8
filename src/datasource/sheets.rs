//! Spreadsheet sources: the Google Sheets values API and a local CSV export.

use super::http::{build_client, get_json};
use super::{DataSourceError, SheetSource};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SHEETS_API_URL: &str = "https://sheets.googleapis.com";

/// Read-only access to one spreadsheet through the v4 values API.
#[derive(Debug, Clone)]
pub struct GoogleSheetsSource {
    client: Client,
    base_url: String,
    sheet_id: String,
    api_key: String,
}

impl GoogleSheetsSource {
    pub fn new(
        sheet_id: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, DataSourceError> {
        Self::with_base_url(DEFAULT_SHEETS_API_URL.to_string(), sheet_id, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: String,
        sheet_id: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, DataSourceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            sheet_id,
            api_key,
        })
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, DataSourceError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.sheet_id, range
        );
        let response = get_json(&self.client, &url, None, &[("key", self.api_key.clone())]).await?;
        Ok(values_to_rows(&response))
    }
}

/// Flatten a values API response into string cells. Missing `values` means
/// an empty range.
fn values_to_rows(response: &Value) -> Vec<Vec<String>> {
    let Some(rows) = response.get("values").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            row.as_array()
                .map(|cells| cells.iter().map(cell_text).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A local CSV export of the cost sheet. The header row is skipped and the
/// requested range is ignored: the file is the range.
#[derive(Debug, Clone)]
pub struct CsvFileSheet {
    path: PathBuf,
}

impl CsvFileSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, DataSourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DataSourceError::ParseError(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }
}

#[async_trait]
impl SheetSource for CsvFileSheet {
    async fn read_range(&self, _range: &str) -> Result<Vec<Vec<String>>, DataSourceError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            DataSourceError::Other(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        Self::parse_csv(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_to_rows_stringifies_cells() {
        let rows = values_to_rows(&json!({
            "range": "Comparador!A2:M",
            "values": [["MLA1", 12, null], [], "junk"]
        }));
        assert_eq!(
            rows,
            vec![
                vec!["MLA1".to_string(), "12".to_string(), String::new()],
                vec![],
                vec![],
            ]
        );
        assert!(values_to_rows(&json!({"range": "Tokens!A2"})).is_empty());
    }

    #[test]
    fn test_parse_csv_skips_header_and_allows_ragged_rows() {
        let csv = "id,a,b\nMLA1,x,\"1.234,5\"\nMLA2\n";
        let rows = CsvFileSheet::parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["MLA1", "x", "1.234,5"]);
        assert_eq!(rows[1], vec!["MLA2"]);
    }

    #[tokio::test]
    async fn test_csv_file_sheet_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costs.csv");
        std::fs::write(&path, "id,cost\nMLA9,100\n").unwrap();
        let rows = CsvFileSheet::new(&path).read_range("ignored").await.unwrap();
        assert_eq!(rows, vec![vec!["MLA9".to_string(), "100".to_string()]]);

        let missing = CsvFileSheet::new(dir.path().join("nope.csv"));
        assert!(missing.read_range("ignored").await.is_err());
    }
}
