//! Rows from the Hugging Face datasets server, mapped to (primary, secondary) pairs.


use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::config::DatasetConfig;
use crate::http::HttpTransport;
use crate::{RagError, Result};

/// Largest page the rows endpoint serves.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct RowsResponse {
    #[serde(default)]
    rows: Vec<RowEntry>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceDatasets {
    base_url: Url,
    transport: HttpTransport,
}

impl HuggingFaceDatasets {
    #[inline]
    pub fn new(base_url: &str, transport: HttpTransport) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RagError::Config(format!("Invalid dataset server URL {base_url}: {e}")))?;
        Ok(Self {
            base_url,
            transport,
        })
    }

    /// Fetch up to `limit` rows of a split, page by page, in dataset order.
    pub fn load(
        &self,
        dataset_id: &str,
        config: &str,
        split: &str,
        limit: usize,
    ) -> Result<Vec<Map<String, Value>>> {
        let mut rows = Vec::with_capacity(limit.min(1024));

        while rows.len() < limit {
            let offset = rows.len();
            let length = (limit - offset).min(MAX_PAGE_SIZE);
            let url = self.rows_url(dataset_id, config, split, offset, length)?;

            let body = self.transport.get(url.as_str()).map_err(|e| match e {
                RagError::HttpStatus { status: 404, .. } => {
                    RagError::Dataset(format!("dataset {dataset_id} ({config}/{split}) not found"))
                }
                other => other,
            })?;
            let page: RowsResponse = serde_json::from_str(&body)
                .map_err(|e| RagError::Dataset(format!("Failed to parse rows page: {e}")))?;

            let received = page.rows.len();
            debug!("Fetched {} rows at offset {}", received, offset);
            rows.extend(page.rows.into_iter().map(|entry| entry.row));

            if received < length {
                break;
            }
        }

        info!("Loaded {} rows from {} [{}]", rows.len(), dataset_id, split);
        Ok(rows)
    }

    fn rows_url(
        &self,
        dataset_id: &str,
        config: &str,
        split: &str,
        offset: usize,
        length: usize,
    ) -> Result<Url> {
        let mut url = self
            .base_url
            .join("/rows")
            .map_err(|e| RagError::Config(format!("Failed to build rows URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("dataset", dataset_id)
            .append_pair("config", config)
            .append_pair("split", split)
            .append_pair("offset", &offset.to_string())
            .append_pair("length", &length.to_string());
        Ok(url)
    }
}

/// Which row fields become a record's primary and secondary text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMapping {
    pub primary_field: String,
    pub secondary_field: Option<String>,
    /// Used when the row lacks the secondary field.
    pub secondary_default: Option<String>,
}

impl DatasetMapping {
    #[inline]
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            primary_field: config.primary_field.clone(),
            secondary_field: config.secondary_field.clone(),
            secondary_default: config.secondary_default.clone(),
        }
    }

    /// Trimmed `(primary, secondary)` for one row, `None` if either ends up empty.
    pub fn pair(&self, row: &Map<String, Value>) -> Option<(String, String)> {
        let text = |field: &str| {
            row.get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let primary = text(&self.primary_field)?;
        let secondary = self
            .secondary_field
            .as_deref()
            .and_then(text)
            .or_else(|| {
                self.secondary_default
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })?;

        Some((primary, secondary))
    }

    pub fn pairs(&self, rows: &[Map<String, Value>]) -> Vec<(String, String)> {
        rows.iter().filter_map(|row| self.pair(row)).collect()
    }
}
