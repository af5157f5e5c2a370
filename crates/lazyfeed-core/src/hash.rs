//! Hashing and map aliases shared by the lazyfeed crates.
//!
//! The `std-hash` feature swaps the fast hashers for the std ones.

use std::hash::{Hash, Hasher};

/// Map types keyed by list identity tokens.
#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::hash_map::Entry;
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::FxHashMap as HashMap;
    pub use std::collections::hash_map::Entry;
}

#[cfg(feature = "std-hash")]
pub mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub mod default {
    // fast branch
    pub use ahash::AHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

/// Hashes an arbitrary key into the 64-bit identity used by list tokens.
pub fn hash_key<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = default::new();
    key.hash(&mut hasher);
    hasher.finish()
}
