//! Throttled, retrying name fetch

pub mod clock;
pub mod fetcher;

pub use clock::{Clock, SystemClock};
pub use fetcher::{FetchConfig, FetchError, MetadataSource, NameFetcher, RateLimitedFetcher};
