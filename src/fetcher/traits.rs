use crate::error::FetchError;
use crate::filters::Query;
use crate::models::ListingPage;
use async_trait::async_trait;

/// Backend that can answer a listing [`Query`]
/// Implemented over HTTP for the real inventory and by fakes in tests
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<ListingPage, FetchError>;

    /// Name of the backend, for logs
    fn source_name(&self) -> &'static str;
}
