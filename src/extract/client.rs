use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Works returned per page; the default endpoint requests `rows=200`.
pub const PAGE_SIZE: usize = 200;

/// One fetched works page: the full payload (staged verbatim) and the number
/// of items it carries.
#[derive(Debug)]
pub struct WorksPage {
    pub payload: Value,
    pub item_count: usize,
}

/// Thin client for the paginated CrossRef works endpoint.
pub struct CrossrefClient {
    http: Client,
    endpoint: String,
}

impl CrossrefClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }

    /// Fetch one page at the given offset.
    ///
    /// Returns `None` when the response carries no `message.items` or the
    /// items array is empty, which signals the end of pagination.
    pub async fn fetch_page(&self, offset: usize) -> Result<Option<WorksPage>> {
        let url = format!("{}&offset={}", self.endpoint, offset);
        debug!("Fetching page with offset {}: {}", offset, url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Request failed for offset {}", offset))?
            .error_for_status()
            .with_context(|| format!("HTTP error for offset {}", offset))?;

        let payload: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to decode JSON for offset {}", offset))?;

        let item_count = match payload
            .get("message")
            .and_then(|message| message.get("items"))
            .and_then(Value::as_array)
        {
            Some(items) if !items.is_empty() => items.len(),
            _ => return Ok(None),
        };

        Ok(Some(WorksPage {
            payload,
            item_count,
        }))
    }
}
