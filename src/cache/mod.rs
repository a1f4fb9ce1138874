//! Persistent id → name cache
//!
//! Keeps resolved titles on disk so each MyAnimeList id is downloaded once.

pub mod name_cache;

pub use name_cache::{CacheError, CacheStats, NameCache, DEFAULT_CACHE_FILE, DEFAULT_WRITE_EVERY};
