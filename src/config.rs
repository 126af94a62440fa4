use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use crate::filters::PriceDomain;

/// Runtime configuration, read from the environment (and `.env` if present)
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the listing backend
    pub api_base_url: String,
    /// Listings per page
    pub page_size: u32,
    /// Bounds for the price slider (lakh)
    pub price_domain: PriceDomain,
    pub request_timeout: Duration,
    /// Location parameter that scopes the listing universe
    pub context_param: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            page_size: 8,
            price_domain: PriceDomain::default(),
            request_timeout: Duration::from_secs(30),
            context_param: "city".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("CAR_SCOUT_API_URL").unwrap_or(defaults.api_base_url);
        let page_size: u32 = read(&lookup, "CAR_SCOUT_PAGE_SIZE")?.unwrap_or(defaults.page_size);
        if page_size == 0 {
            anyhow::bail!("CAR_SCOUT_PAGE_SIZE must be at least 1");
        }

        let lower = read(&lookup, "CAR_SCOUT_PRICE_MIN")?.unwrap_or(defaults.price_domain.lower);
        let upper = read(&lookup, "CAR_SCOUT_PRICE_MAX")?.unwrap_or(defaults.price_domain.upper);
        let price_domain = PriceDomain::new(lower, upper)
            .context("CAR_SCOUT_PRICE_MIN/CAR_SCOUT_PRICE_MAX do not form a range")?;

        let timeout_secs: u64 = read(&lookup, "CAR_SCOUT_TIMEOUT_SECS")?
            .unwrap_or(defaults.request_timeout.as_secs());
        let context_param = lookup("CAR_SCOUT_CONTEXT_PARAM").unwrap_or(defaults.context_param);

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            page_size,
            price_domain,
            request_timeout: Duration::from_secs(timeout_secs),
            context_param,
        })
    }
}

fn read<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.page_size, 8);
        assert_eq!(config.price_domain, PriceDomain::new(1.0, 50.0).unwrap());
        assert_eq!(config.context_param, "city");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CAR_SCOUT_API_URL", "https://api.example.com/"),
            ("CAR_SCOUT_PAGE_SIZE", "12"),
            ("CAR_SCOUT_PRICE_MAX", "100"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.page_size, 12);
        assert_eq!(config.price_domain.upper, 100.0);
    }

    #[test]
    fn test_malformed_values_fail() {
        assert!(Config::from_lookup(lookup_from(&[("CAR_SCOUT_PAGE_SIZE", "eight")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("CAR_SCOUT_PAGE_SIZE", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[
            ("CAR_SCOUT_PRICE_MIN", "60"),
            ("CAR_SCOUT_PRICE_MAX", "50"),
        ]))
        .is_err());
    }
}
