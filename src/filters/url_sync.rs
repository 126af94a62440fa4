use tracing::{debug, warn};
use url::{Position, Url};

use super::query::{Query, TRANSPORT_ONLY};
use super::state::{FilterState, PaginationState, PriceDomain, PriceRange};
use crate::error::ParseError;

/// Parameters the synchronizer owns in the address bar (besides the context one)
const MANAGED: [&str; 9] = [
    "brand",
    "fuel",
    "year",
    "transmission",
    "owner",
    "minPrice",
    "maxPrice",
    "verified",
    "page",
];

/// The browser location: one global, history-backed resource.
///
/// `href` is the path plus query string, e.g. `/used-cars?brand=Honda`.
pub trait AddressBar {
    fn href(&self) -> String;

    /// Overwrite the current history entry
    fn replace(&mut self, href: &str);
}

/// In-memory location with a history stack, used by the CLI and tests
#[derive(Debug, Clone)]
pub struct MemoryAddressBar {
    history: Vec<String>,
    replacements: usize,
}

impl MemoryAddressBar {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            history: vec![href.into()],
            replacements: 0,
        }
    }

    /// Entries a back button could walk through
    #[cfg(test)]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// How many times the current entry was overwritten
    #[cfg(test)]
    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl AddressBar for MemoryAddressBar {
    fn href(&self) -> String {
        self.history.last().cloned().unwrap_or_else(|| "/".to_string())
    }

    fn replace(&mut self, href: &str) {
        match self.history.last_mut() {
            Some(current) => *current = href.to_string(),
            None => self.history.push(href.to_string()),
        }
        self.replacements += 1;
    }
}

/// State recovered from the location at mount time
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSeed {
    pub state: FilterState,
    pub context_key: String,
}

/// Sole writer of the address bar
pub struct UrlSynchronizer<B: AddressBar> {
    bar: B,
    context_param: String,
}

impl<B: AddressBar> UrlSynchronizer<B> {
    pub fn new(bar: B, context_param: impl Into<String>) -> Self {
        Self {
            bar,
            context_param: context_param.into(),
        }
    }

    #[cfg(test)]
    pub fn address_bar(&self) -> &B {
        &self.bar
    }

    pub fn href(&self) -> String {
        self.bar.href()
    }

    /// Rebuild filter state from the current location. Never fails:
    /// anything malformed falls back to its default.
    pub fn parse_from_location(&self, domain: PriceDomain, page_size: u32) -> LocationSeed {
        let mut state = FilterState::new(domain, page_size);
        let Some(url) = resolve(&self.bar.href()) else {
            return LocationSeed {
                state,
                context_key: String::new(),
            };
        };
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        state.set_brand(text_param(&pairs, "brand"));
        state.set_fuel(text_param(&pairs, "fuel"));
        state.set_year(text_param(&pairs, "year"));
        state.set_transmission(text_param(&pairs, "transmission"));
        state.set_owner(text_param(&pairs, "owner"));

        let min = recover(price_param(&pairs, "minPrice")).unwrap_or(domain.lower);
        let max = recover(price_param(&pairs, "maxPrice")).unwrap_or(domain.upper);
        let range = PriceRange::normalized(min, max, &domain);
        state.set_price_range(range.min(), range.max());

        state.set_verified_only(first(&pairs, "verified") == Some("true"));
        let max_page = PaginationState::max_page(page_size);
        state.set_page(recover(page_param(&pairs, max_page)).unwrap_or(1));

        let context_key = text_param(&pairs, &self.context_param).unwrap_or_default();

        debug!(
            "Parsed location {} (page {}, context {:?})",
            url.path(),
            state.page(),
            context_key
        );

        LocationSeed { state, context_key }
    }

    /// Replace the location's query string with `query` plus `page`.
    ///
    /// Returns `false` when the location already matched and nothing was written.
    pub fn push_to_location(&mut self, query: &Query, page: u32) -> bool {
        let current = self.bar.href();
        let Some(url) = resolve(&current) else {
            warn!("Current location {:?} is not a valid URL, not pushing", current);
            return false;
        };

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .into_owned()
            .filter(|(name, _)| !self.is_managed(name))
            .collect();
        pairs.extend(
            query
                .url_params()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value)),
        );
        pairs.push(("page".to_string(), page.to_string()));

        let next = compose(&location_prefix(&current, &url), &pairs);
        self.write(&current, next)
    }

    /// Drop the whole query string
    pub fn clear(&mut self) -> bool {
        let current = self.bar.href();
        let prefix = resolve(&current)
            .map(|url| location_prefix(&current, &url))
            .unwrap_or_else(|| "/".to_string());
        self.write(&current, prefix)
    }

    fn write(&mut self, current: &str, next: String) -> bool {
        if next == current {
            debug!("Location already at {}, skipping replace", next);
            return false;
        }
        debug!("Replacing location with {}", next);
        self.bar.replace(&next);
        true
    }

    fn is_managed(&self, name: &str) -> bool {
        MANAGED.contains(&name) || TRANSPORT_ONLY.contains(&name) || name == self.context_param
    }
}

fn resolve(href: &str) -> Option<Url> {
    let base = Url::parse("http://location.local/").ok()?;
    match base.join(href) {
        Ok(url) => Some(url),
        Err(err) => {
            warn!("Could not parse location {:?}: {}", href, err);
            None
        }
    }
}

/// Everything before the query: scheme, host and path for an absolute
/// href, just the path for a relative one
fn location_prefix(href: &str, url: &Url) -> String {
    if Url::parse(href).is_ok() {
        url[..Position::AfterPath].to_string()
    } else {
        url.path().to_string()
    }
}

fn compose(path: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{}?{}", path, query)
}

fn first<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn text_param(pairs: &[(String, String)], name: &str) -> Option<String> {
    first(pairs, name)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn price_param(pairs: &[(String, String)], name: &'static str) -> Result<Option<f64>, ParseError> {
    let Some(raw) = first(pairs, name).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ParseError::InvalidNumber {
            param: name,
            value: raw.to_string(),
        }),
    }
}

fn page_param(pairs: &[(String, String)], max: u32) -> Result<Option<u32>, ParseError> {
    let Some(raw) = first(pairs, "page").filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    match raw.trim().parse::<u32>() {
        Ok(page) if page == 0 || page > max => Err(ParseError::OutOfRange {
            param: "page",
            value: raw.to_string(),
            min: 1,
            max,
        }),
        Ok(page) => Ok(Some(page)),
        Err(_) => Err(ParseError::InvalidNumber {
            param: "page",
            value: raw.to_string(),
        }),
    }
}

/// Absent and invalid both become `None`; invalid is logged
fn recover<T>(parsed: Result<Option<T>, ParseError>) -> Option<T> {
    parsed.unwrap_or_else(|err| {
        warn!("Ignoring location parameter: {}", err);
        None
    })
}
