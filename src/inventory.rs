use std::sync::Arc;

use crate::config::Config;
use crate::fetcher::{FetchState, ListingFetcher, ListingSource};
use crate::filters::{AddressBar, FilterChange, FilterChangeCoordinator, Query};

/// Something the user did on the inventory page
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Filter(FilterChange),
    Page(u32),
    Reset,
}

/// Page-level controller: owns filter state, the location and the fetcher
pub struct InventoryPage<B: AddressBar, S: ListingSource> {
    coordinator: FilterChangeCoordinator<B>,
    fetcher: Arc<ListingFetcher<S>>,
    page_size: u32,
}

impl<B: AddressBar, S: ListingSource> InventoryPage<B, S> {
    pub fn mount(bar: B, source: S, config: &Config) -> Self {
        let coordinator = FilterChangeCoordinator::mount(
            bar,
            config.price_domain,
            config.page_size,
            &config.context_param,
        );

        Self {
            coordinator,
            fetcher: Arc::new(ListingFetcher::new(source)),
            page_size: config.page_size,
        }
    }

    pub fn coordinator(&self) -> &FilterChangeCoordinator<B> {
        &self.coordinator
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> Arc<ListingFetcher<S>> {
        Arc::clone(&self.fetcher)
    }

    pub fn query(&self) -> &Query {
        self.coordinator.query()
    }

    /// Run the state transition for `interaction` and return the new query
    pub fn apply(&mut self, interaction: Interaction) -> Query {
        let query = match interaction {
            Interaction::Filter(change) => self.coordinator.on_filter_change(change),
            Interaction::Page(page) => self.coordinator.on_page_change(page),
            Interaction::Reset => self.coordinator.on_reset(),
        };
        query.clone()
    }

    /// Fetch whatever the current query asks for
    pub async fn refresh(&self) -> FetchState {
        let query = self.coordinator.query().clone();
        self.fetcher.fetch(&query).await
    }

    /// Apply one interaction and fetch the query it produces
    pub async fn handle(&mut self, interaction: Interaction) -> FetchState {
        let query = self.apply(interaction);
        self.fetcher.fetch(&query).await
    }

    pub fn current_page(&self) -> u32 {
        self.coordinator.state().page()
    }

    /// Page count for the pagination control, when the backend reported a total
    pub fn total_pages(&self) -> Option<u32> {
        self.fetcher
            .state()
            .page()
            .and_then(|page| page.total_pages(self.page_size))
    }

    /// e.g. `Used Cars in new delhi (₹1– 50 Lakh)`
    pub fn heading(&self) -> String {
        let query = self.coordinator.query();
        let place = self.coordinator.context_key().replace('-', " ");
        format!(
            "Used Cars in {} (₹{}– {} Lakh)",
            place, query.min_price, query.max_price
        )
    }
}
