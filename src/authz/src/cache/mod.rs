//! Tag-indexed caching
//!
//! [`CacheStore`] is the backend contract, [`MemoryTagStore`] the in-process
//! backend and [`TaggedCache`] the configured view the resolver uses.

mod store;
mod tagged;

pub use store::{CacheStore, MemoryTagStore, StoreStats};
pub use tagged::TaggedCache;
