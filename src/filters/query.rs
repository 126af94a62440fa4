use super::state::FilterState;

/// Fields that only travel to the backend, never into the shareable URL
pub const TRANSPORT_ONLY: [&str; 2] = ["skip", "limit"];

/// Canonical request for one page of one filtered result set.
///
/// Built from a [`FilterState`] snapshot; never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub skip: u32,
    pub limit: u32,
    pub brand: Option<String>,
    pub fuel: Option<String>,
    pub year: Option<String>,
    pub transmission: Option<String>,
    pub owner: Option<String>,
    pub min_price: f64,
    pub max_price: f64,
    /// Only ever `Some(true)`; an unticked checkbox is omitted
    pub verified: Option<bool>,
    pub context: Option<String>,
    context_param: String,
}

impl Query {
    /// Every non-empty field in a fixed order, transport fields included
    pub fn params(&self) -> Vec<(&str, String)> {
        let mut params = vec![
            ("skip", self.skip.to_string()),
            ("limit", self.limit.to_string()),
        ];

        let optional = [
            ("brand", &self.brand),
            ("fuel", &self.fuel),
            ("year", &self.year),
            ("transmission", &self.transmission),
            ("owner", &self.owner),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                params.push((name, value.clone()));
            }
        }

        params.push(("minPrice", self.min_price.to_string()));
        params.push(("maxPrice", self.max_price.to_string()));

        if let Some(verified) = self.verified {
            params.push(("verified", verified.to_string()));
        }
        if let Some(context) = &self.context {
            params.push((self.context_param.as_str(), context.clone()));
        }

        params
    }

    /// What belongs in the address bar (no `skip`/`limit`)
    pub fn url_params(&self) -> Vec<(&str, String)> {
        self.params()
            .into_iter()
            .filter(|(name, _)| !TRANSPORT_ONLY.contains(name))
            .collect()
    }

    /// Identity of this request for caching and in-flight tracking
    pub fn cache_key(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params())
            .finish()
    }

    pub fn page(&self) -> u32 {
        self.skip / self.limit.max(1) + 1
    }
}

/// Derives [`Query`] values. Pure: equal inputs give equal queries.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    context_param: String,
}

impl QueryBuilder {
    pub fn new(context_param: impl Into<String>) -> Self {
        Self {
            context_param: context_param.into(),
        }
    }

    pub fn build(&self, state: &FilterState, context_key: &str) -> Query {
        let pagination = state.pagination();
        let range = state.price_range();

        Query {
            skip: (pagination.page() - 1) * pagination.page_size(),
            limit: pagination.page_size(),
            brand: non_empty(state.brand()),
            fuel: non_empty(state.fuel()),
            year: non_empty(state.year()),
            transmission: non_empty(state.transmission()),
            owner: non_empty(state.owner()),
            min_price: range.min(),
            max_price: range.max(),
            verified: state.verified_only().then_some(true),
            context: non_empty(Some(context_key)),
            context_param: self.context_param.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
