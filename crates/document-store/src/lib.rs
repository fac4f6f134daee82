pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod sequence;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryDocumentStore, InMemorySequenceStore};
pub use postgres::{PostgresDocumentStore, PostgresSequenceStore};
pub use query::{
    DEFAULT_PAGE_SIZE, DocumentQuery, MAX_PAGE_SIZE, Listing, ListingRequest, Sort, SortKey, SortOrder,
};
pub use sequence::{ScopeKey, SequenceStore};
pub use store::{DocumentStore, DocumentStoreExt, OrderGraph};
