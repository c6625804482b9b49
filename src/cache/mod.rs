//! Cache Module
//!
//! Key derivation, TTL bookkeeping and the read/write paths of the cache.

mod engine;
mod key;
pub(crate) mod lock;
mod stats;
mod ttl;


// Re-export public types
pub use engine::{
    CacheEngine, CacheOutcome, CacheRead, CacheWrite, CLEAR_ALL_KEY, CLEAR_SUFFIX, X_CACHE,
};
pub use key::{CacheKey, KeyMode, DEFAULT_BUCKET};
pub use stats::CacheStats;
pub use ttl::{TtlRecord, TtlRegistry};

// == Public Constants ==
/// Maximum accepted size of a PUT body in bytes
pub const MAX_ENTRY_SIZE: usize = 32 * 1024 * 1024; // 32 MB
