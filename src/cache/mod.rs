//! Build cache.
//!
//! One store holds two disjoint keyspaces:
//!
//! - **Headers**: the joined header text of a version, keyed by its base path
//! - **Builds**: complete bundles, keyed by a digest of the build request
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! max_entries = 0        # 0 keeps every entry for the process lifetime
//! dedupe_inflight = true # concurrent identical builds share one resolution
//! ```

mod config;
mod inflight;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use inflight::{InFlight, Participation};
pub use keys::{BuildKey, CacheKey, HeaderKey};
pub use store::CacheStore;
