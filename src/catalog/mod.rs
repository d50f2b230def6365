//! The catalog data model: path-keyed records and the store they live in.

pub mod path;
pub mod record;
pub mod store;

pub use record::{Record, RecordError, TagMap};
pub use store::{CatalogStore, MemoryStore, StoreError};
