//! Persistent cache layer: fail-soft key-value store, cache envelopes and
//! the freshness policy deciding when each feed must refetch.

pub mod freshness;
pub mod store;
pub mod types;

pub use freshness::*;
pub use store::KvStore;
pub use types::*;
