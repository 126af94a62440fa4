use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::fetcher::traits::ListingSource;
use crate::filters::Query;
use crate::models::{Listing, ListingPage};

/// Listing backend reached over HTTP (`GET {api}/cars?...`)
pub struct HttpListingSource {
    client: Client,
    endpoint: String,
}

/// Accepted response bodies: a bare array, or an object with count metadata
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingsResponse {
    Bare(Vec<Listing>),
    Wrapped {
        #[serde(alias = "cars", alias = "data")]
        listings: Vec<Listing>,
        #[serde(default, alias = "count")]
        total: Option<u64>,
    },
}

impl HttpListingSource {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("car-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/cars", config.api_base_url),
        })
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch(&self, query: &Query) -> Result<ListingPage, FetchError> {
        debug!("GET {} with {}", self.endpoint, query.cache_key());

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Listing backend returned status: {}", status);
            return Err(FetchError::Status(status.as_u16()));
        }

        let header_total = response
            .headers()
            .get("x-total-count")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let body = response.text().await?;
        debug!("Downloaded {} bytes of listings", body.len());

        parse_listings(&body, header_total)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Decode a response body; a count in the body wins over the header
fn parse_listings(body: &str, header_total: Option<u64>) -> Result<ListingPage, FetchError> {
    let response: ListingsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let page = match response {
        ListingsResponse::Bare(listings) => ListingPage::new(listings, header_total),
        ListingsResponse::Wrapped { listings, total } => {
            ListingPage::new(listings, total.or(header_total))
        }
    };
    Ok(page)
}
