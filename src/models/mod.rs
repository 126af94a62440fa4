use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One used-car listing as returned by the inventory backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(alias = "_id")]
    pub id: String,
    pub brand: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub fuel: Option<String>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Asking price in lakh
    pub price: f64,
    #[serde(default, alias = "km_driven")]
    pub km_driven: Option<u64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, alias = "created_at")]
    pub listed_at: Option<DateTime<Utc>>,
}

/// One page of results plus whatever count metadata the backend sent
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    pub total: Option<u64>,
    pub fetched_at: DateTime<Utc>,
}

impl ListingPage {
    pub fn new(listings: Vec<Listing>, total: Option<u64>) -> Self {
        Self {
            listings,
            total,
            fetched_at: Utc::now(),
        }
    }

    /// `None` when the backend did not report a total
    pub fn total_pages(&self, page_size: u32) -> Option<u32> {
        let page_size = u64::from(page_size.max(1));
        self.total
            .map(|total| total.div_ceil(page_size).min(u64::from(u32::MAX)) as u32)
    }
}
