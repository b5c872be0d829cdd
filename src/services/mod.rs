// Service exports
pub mod cache;
pub mod document;
pub mod live;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use document::{DocumentCollections, DocumentStoreClient};
pub use live::{LiveEvent, LiveHub};
pub use memory::MemoryUserStore;
pub use postgres::{PostgresClient, PostgresError};
pub use store::{StoreError, UserStore};
