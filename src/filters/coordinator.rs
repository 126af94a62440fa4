use tracing::info;

use super::query::{Query, QueryBuilder};
use super::state::{FilterState, PriceDomain};
use super::url_sync::{AddressBar, UrlSynchronizer};

/// One user edit to a filter dimension
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Brand(Option<String>),
    Fuel(Option<String>),
    Year(Option<String>),
    Transmission(Option<String>),
    Owner(Option<String>),
    PriceRange { min: f64, max: f64 },
    VerifiedOnly(bool),
}

/// Owns the filter state and the address bar, and is the only way to change either.
///
/// Each transition mutates state, rebuilds the query and writes the URL
/// before returning, so callers never observe a half-applied change.
pub struct FilterChangeCoordinator<B: AddressBar> {
    state: FilterState,
    sync: UrlSynchronizer<B>,
    builder: QueryBuilder,
    /// Captured once at mount
    context_key: String,
    query: Query,
}

impl<B: AddressBar> FilterChangeCoordinator<B> {
    /// Seed state from the incoming location. Does not write the URL.
    pub fn mount(bar: B, domain: PriceDomain, page_size: u32, context_param: &str) -> Self {
        let sync = UrlSynchronizer::new(bar, context_param);
        let seed = sync.parse_from_location(domain, page_size);
        let builder = QueryBuilder::new(context_param);
        let query = builder.build(&seed.state, &seed.context_key);

        Self {
            state: seed.state,
            sync,
            builder,
            context_key: seed.context_key,
            query,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn context_key(&self) -> &str {
        &self.context_key
    }

    pub fn href(&self) -> String {
        self.sync.href()
    }

    #[cfg(test)]
    pub fn address_bar(&self) -> &B {
        self.sync.address_bar()
    }

    /// Apply a filter edit; the page always returns to 1
    pub fn on_filter_change(&mut self, change: FilterChange) -> &Query {
        info!("Filter change: {:?}", change);
        match change {
            FilterChange::Brand(value) => self.state.set_brand(value),
            FilterChange::Fuel(value) => self.state.set_fuel(value),
            FilterChange::Year(value) => self.state.set_year(value),
            FilterChange::Transmission(value) => self.state.set_transmission(value),
            FilterChange::Owner(value) => self.state.set_owner(value),
            FilterChange::PriceRange { min, max } => self.state.set_price_range(min, max),
            FilterChange::VerifiedOnly(value) => self.state.set_verified_only(value),
        }
        self.state.set_page(1);
        self.publish()
    }

    /// Move the cursor; filters stay as they are
    pub fn on_page_change(&mut self, page: u32) -> &Query {
        info!("Page change: {} -> {}", self.state.page(), page);
        self.state.set_page(page);
        self.publish()
    }

    /// Back to defaults with a bare URL
    pub fn on_reset(&mut self) -> &Query {
        info!("Resetting filters");
        self.state.reset();
        self.query = self.builder.build(&self.state, &self.context_key);
        self.sync.clear();
        &self.query
    }

    fn publish(&mut self) -> &Query {
        self.query = self.builder.build(&self.state, &self.context_key);
        self.sync.push_to_location(&self.query, self.state.page());
        &self.query
    }
}
