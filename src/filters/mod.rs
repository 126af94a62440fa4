pub mod coordinator;
pub mod query;
pub mod state;
pub mod url_sync;

pub use coordinator::{FilterChange, FilterChangeCoordinator};
pub use query::Query;
pub use state::PriceDomain;
pub use url_sync::{AddressBar, MemoryAddressBar};
