//! Materials Project summary endpoint client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::RecordSource;
use crate::error::SourceError;
use crate::models::{MaterialRecord, SourceConfig};

const API_KEY_HEADER: &str = "X-API-KEY";

#[derive(Debug, Deserialize)]
struct SummaryPage {
    #[serde(default)]
    data: Vec<MaterialRecord>,
}

/// Pages through the summary endpoint with `_skip`/`_limit`.
#[derive(Debug, Clone)]
pub struct MaterialsProjectClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    page_size: u32,
    max_pages: u32,
}

impl MaterialsProjectClient {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::builder().build()?,
            url: config.url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            page_size: config.page_size.max(1),
            max_pages: config.max_pages.max(1),
        })
    }

    fn page_query(&self, page: u32) -> [(&'static str, String); 3] {
        [
            ("_all_fields", "true".to_string()),
            ("_limit", self.page_size.to_string()),
            ("_skip", (u64::from(page) * u64::from(self.page_size)).to_string()),
        ]
    }

    async fn fetch_page(&self, api_key: &str, page: u32) -> Result<Vec<MaterialRecord>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .header(API_KEY_HEADER, api_key)
            .query(&self.page_query(page))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ServerError { status, body });
        }

        let page: SummaryPage = response
            .json()
            .await
            .map_err(|e| SourceError::ParseError(e.to_string()))?;
        Ok(page.data)
    }
}

#[async_trait]
impl RecordSource for MaterialsProjectClient {
    fn name(&self) -> &str {
        "materials-project"
    }

    async fn fetch(&self) -> Result<Vec<MaterialRecord>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::MissingApiKey(self.url.clone()))?;

        let mut records = Vec::new();
        for page in 0..self.max_pages {
            let batch = self.fetch_page(api_key, page).await?;
            let received = batch.len();
            debug!(page, received, "fetched summary page");
            records.extend(batch);

            // A short page means the listing is exhausted
            if received < self.page_size as usize {
                break;
            }
        }

        info!(records = records.len(), "fetched material records");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key: Option<&str>) -> MaterialsProjectClient {
        MaterialsProjectClient::new(&SourceConfig {
            api_key: api_key.map(String::from),
            page_size: 250,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_page_query() {
        let query = client(Some("key")).page_query(2);
        assert_eq!(query[0], ("_all_fields", "true".to_string()));
        assert_eq!(query[1], ("_limit", "250".to_string()));
        assert_eq!(query[2], ("_skip", "500".to_string()));
    }

    #[test]
    fn test_page_query_skip_beyond_u32() {
        let query = client(Some("key")).page_query(u32::MAX);
        assert_eq!(query[2], ("_skip", "1073741823750".to_string()));
    }

    #[test]
    fn test_parse_summary_page() {
        let body = r#"{"data": [{"material_id": "mp-149"}, {"material_id": "mp-13"}], "meta": {}}"#;
        let page: SummaryPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[1].material_id(), Some("mp-13"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        for key in [None, Some("  ")] {
            let err = client(key).fetch().await.unwrap_err();
            assert!(matches!(err, SourceError::MissingApiKey(_)));
        }
    }
}
