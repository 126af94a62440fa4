pub mod http;
pub mod traits;

pub use http::HttpListingSource;
pub use traits::ListingSource;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::FetchErrorKind;
use crate::filters::Query;
use crate::models::ListingPage;

/// What the listing display should show right now
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    Loading,
    Error(FetchErrorKind),
    Success(Arc<ListingPage>),
}

impl FetchState {
    /// Inline message for the listing area, if any
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            FetchState::Error(_) => Some("Something went wrong."),
            _ => None,
        }
    }

    pub fn page(&self) -> Option<&ListingPage> {
        match self {
            FetchState::Success(page) => Some(page.as_ref()),
            _ => None,
        }
    }
}

/// Pages kept for back/forward navigation before the oldest is evicted
const CACHE_CAPACITY: usize = 32;

#[derive(Default)]
struct Tracking {
    cache: HashMap<String, Arc<ListingPage>>,
    /// Cache keys, least recently used first
    recency: VecDeque<String>,
    /// Key of the most recently requested query
    latest: Option<String>,
}

impl Tracking {
    fn cached(&mut self, key: &str) -> Option<Arc<ListingPage>> {
        let page = self.cache.get(key).cloned()?;
        self.touch(key);
        Some(page)
    }

    fn remember(&mut self, key: String, page: Arc<ListingPage>) {
        self.touch(&key);
        self.cache.insert(key, page);
        while self.recency.len() > CACHE_CAPACITY {
            if let Some(oldest) = self.recency.pop_front() {
                debug!("Evicting cached page {}", oldest);
                self.cache.remove(&oldest);
            }
        }
    }

    fn touch(&mut self, key: &str) {
        self.recency.retain(|k| k != key);
        self.recency.push_back(key.to_string());
    }
}

/// Marks a key as in flight until dropped, including when the fetch
/// future is cancelled before the source answers.
struct InFlight<'a> {
    keys: &'a StdMutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlight<'a> {
    /// `None` if the key is already being fetched
    fn claim(keys: &'a StdMutex<HashSet<String>>, key: &str) -> Option<Self> {
        let inserted = keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
        inserted.then(|| Self {
            keys,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Resolves queries against a [`ListingSource`], caching by full query key.
///
/// Only the response for the latest requested query may update the state;
/// anything older that lands late is dropped.
pub struct ListingFetcher<S: ListingSource> {
    source: S,
    tracking: Mutex<Tracking>,
    in_flight: StdMutex<HashSet<String>>,
    state: watch::Sender<FetchState>,
}

impl<S: ListingSource> ListingFetcher<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(FetchState::Idle);
        Self {
            source,
            tracking: Mutex::new(Tracking::default()),
            in_flight: StdMutex::new(HashSet::new()),
            state,
        }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// Request `query` and return the displayed state once this call is done.
    pub async fn fetch(&self, query: &Query) -> FetchState {
        let key = query.cache_key();

        let claim = {
            let mut tracking = self.tracking.lock().await;
            tracking.latest = Some(key.clone());

            if let Some(page) = tracking.cached(&key) {
                debug!("Cache hit for {}", key);
                self.state.send_replace(FetchState::Success(page));
                return self.state();
            }

            self.state.send_replace(FetchState::Loading);
            match InFlight::claim(&self.in_flight, &key) {
                Some(claim) => claim,
                None => {
                    debug!("Request for {} already in flight", key);
                    return self.state();
                }
            }
        };

        debug!("Fetching {} from {}", key, self.source.source_name());
        let result = self.source.fetch(query).await;

        let mut tracking = self.tracking.lock().await;
        drop(claim);

        let next = match result {
            Ok(page) => {
                info!("Fetched {} listings (total {:?})", page.listings.len(), page.total);
                let page = Arc::new(page);
                tracking.remember(key.clone(), page.clone());
                FetchState::Success(page)
            }
            Err(err) => {
                warn!("Listing fetch failed: {}", err);
                FetchState::Error(err.kind())
            }
        };

        if tracking.latest.as_deref() == Some(key.as_str()) {
            self.state.send_replace(next);
        } else {
            debug!("Discarding stale response for {}", key);
        }

        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::filters::query::QueryBuilder;
    use crate::filters::state::{FilterState, PriceDomain};
    use crate::models::Listing;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    type Reply = Result<ListingPage, FetchError>;

    fn query_for_page(page: u32) -> Query {
        let mut state = FilterState::new(PriceDomain::default(), 8);
        state.set_page(page);
        QueryBuilder::new("city").build(&state, "")
    }

    fn page_of(brand: &str) -> ListingPage {
        let listing = Listing {
            id: format!("{}-1", brand.to_lowercase()),
            brand: brand.to_string(),
            model: None,
            year: Some(2020),
            fuel: None,
            transmission: None,
            owner: None,
            price: 5.0,
            km_driven: None,
            city: None,
            verified: false,
            images: vec![],
            listed_at: None,
        };
        ListingPage::new(vec![listing], Some(1))
    }

    fn brand_of(state: &FetchState) -> Option<String> {
        state.page().map(|page| page.listings[0].brand.clone())
    }

    /// Answers each query (by `skip`) only when its gate is opened
    struct GatedSource {
        gates: StdMutex<HashMap<u32, oneshot::Receiver<Reply>>>,
        calls: AtomicUsize,
    }

    impl GatedSource {
        fn new(gates: Vec<(u32, oneshot::Receiver<Reply>)>) -> Self {
            Self {
                gates: StdMutex::new(gates.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ListingSource for GatedSource {
        async fn fetch(&self, query: &Query) -> Result<ListingPage, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().unwrap().remove(&query.skip);
            match gate {
                Some(gate) => gate
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Network("gate dropped".to_string()))),
                None => Err(FetchError::Network("no gate".to_string())),
            }
        }

        fn source_name(&self) -> &'static str {
            "gated"
        }
    }

    /// Answers immediately, counting calls
    struct CountingSource {
        calls: AtomicUsize,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl ListingSource for CountingSource {
        async fn fetch(&self, query: &Query) -> Result<ListingPage, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(status) => Err(FetchError::Status(status)),
                None => Ok(page_of(&format!("Page{}", query.page()))),
            }
        }

        fn source_name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_success_state() {
        let fetcher = ListingFetcher::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail_with: None,
        });
        assert_eq!(fetcher.state(), FetchState::Idle);

        let state = fetcher.fetch(&query_for_page(1)).await;
        assert_eq!(brand_of(&state).as_deref(), Some("Page1"));
        assert_eq!(fetcher.state(), state);
        assert!(state.notice().is_none());
    }

    #[tokio::test]
    async fn test_returning_to_seen_query_uses_cache() {
        let fetcher = ListingFetcher::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail_with: None,
        });

        fetcher.fetch(&query_for_page(1)).await;
        fetcher.fetch(&query_for_page(2)).await;
        let state = fetcher.fetch(&query_for_page(1)).await;

        assert_eq!(brand_of(&state).as_deref(), Some("Page1"));
        assert_eq!(fetcher.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_state_is_not_cached() {
        let fetcher = ListingFetcher::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail_with: Some(503),
        });

        let state = fetcher.fetch(&query_for_page(1)).await;
        assert_eq!(state, FetchState::Error(FetchErrorKind::Status(503)));
        assert_eq!(state.notice(), Some("Something went wrong."));

        fetcher.fetch(&query_for_page(1)).await;
        assert_eq!(fetcher.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let fetcher = ListingFetcher::new(GatedSource::new(vec![(0, rx_a), (8, rx_b)]));
        let query_a = query_for_page(1);
        let query_b = query_for_page(2);

        let driver = async {
            tokio::task::yield_now().await;
            assert_eq!(fetcher.state(), FetchState::Loading);

            let _ = tx_b.send(Ok(page_of("Bravo")));
            while fetcher.state().page().is_none() {
                tokio::task::yield_now().await;
            }
            let _ = tx_a.send(Ok(page_of("Alpha")));
        };

        let (_, state_b, _) = tokio::join!(fetcher.fetch(&query_a), fetcher.fetch(&query_b), driver);

        assert_eq!(brand_of(&state_b).as_deref(), Some("Bravo"));
        assert_eq!(brand_of(&fetcher.state()).as_deref(), Some("Bravo"));
    }

    #[tokio::test]
    async fn test_late_error_does_not_override_newer_success() {
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let fetcher = ListingFetcher::new(GatedSource::new(vec![(0, rx_a), (8, rx_b)]));
        let query_a = query_for_page(1);
        let query_b = query_for_page(2);

        let driver = async {
            tokio::task::yield_now().await;
            let _ = tx_b.send(Ok(page_of("Bravo")));
            while fetcher.state().page().is_none() {
                tokio::task::yield_now().await;
            }
            let _ = tx_a.send(Err(FetchError::Timeout));
        };

        tokio::join!(fetcher.fetch(&query_a), fetcher.fetch(&query_b), driver);
        assert_eq!(brand_of(&fetcher.state()).as_deref(), Some("Bravo"));
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_request_issued_once() {
        let (tx, rx) = oneshot::channel();
        let fetcher = ListingFetcher::new(GatedSource::new(vec![(0, rx)]));
        let query = query_for_page(1);

        let driver = async {
            tokio::task::yield_now().await;
            let _ = tx.send(Ok(page_of("Alpha")));
        };

        let (first, second, _) = tokio::join!(fetcher.fetch(&query), fetcher.fetch(&query), driver);

        assert_eq!(second, FetchState::Loading);
        assert_eq!(brand_of(&first).as_deref(), Some("Alpha"));
        assert_eq!(fetcher.source.calls.load(Ordering::SeqCst), 1);
    }

    /// Never answers its first call; answers every later one
    struct StallFirstSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ListingSource for StallFirstSource {
        async fn fetch(&self, query: &Query) -> Result<ListingPage, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok(page_of(&format!("Page{}", query.page())))
        }

        fn source_name(&self) -> &'static str {
            "stall-first"
        }
    }

    #[tokio::test]
    async fn test_cancelled_fetch_can_be_retried() {
        let fetcher = ListingFetcher::new(StallFirstSource {
            calls: AtomicUsize::new(0),
        });
        let query = query_for_page(1);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), fetcher.fetch(&query)).await;
        assert!(abandoned.is_err());
        assert_eq!(fetcher.state(), FetchState::Loading);

        let state = fetcher.fetch(&query).await;
        assert_eq!(brand_of(&state).as_deref(), Some("Page1"));
        assert_eq!(fetcher.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_evicts_least_recently_used() {
        let fetcher = ListingFetcher::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail_with: None,
        });
        let capacity = CACHE_CAPACITY as u32;
        let calls = || fetcher.source.calls.load(Ordering::SeqCst);

        for page in 1..=capacity {
            fetcher.fetch(&query_for_page(page)).await;
        }
        fetcher.fetch(&query_for_page(1)).await;
        assert_eq!(calls(), CACHE_CAPACITY);

        // page 1 was touched last, so page 2 goes out instead
        fetcher.fetch(&query_for_page(capacity + 1)).await;
        fetcher.fetch(&query_for_page(1)).await;
        assert_eq!(calls(), CACHE_CAPACITY + 1);
        fetcher.fetch(&query_for_page(2)).await;
        assert_eq!(calls(), CACHE_CAPACITY + 2);

        let tracking = fetcher.tracking.lock().await;
        assert_eq!(tracking.cache.len(), CACHE_CAPACITY);
        assert_eq!(tracking.recency.len(), CACHE_CAPACITY);
    }
}
