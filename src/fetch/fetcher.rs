//! Rate-limited title fetcher
//!
//! Enforces a minimum spacing between consecutive requests to the metadata
//! API and retries transient failures with a linear backoff. Both delays
//! compose: the backoff sleep comes first, then the spacing wait.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use crate::id::CatalogId;
use crate::jikan::LookupError;

/// Default minimum interval between requests
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of attempts per identifier
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// One lookup attempt against the metadata API
pub trait MetadataSource {
    fn lookup_title(&self, id: CatalogId) -> Result<String, LookupError>;
}

/// Resolves an identifier to its display name
pub trait NameFetcher {
    fn fetch(&mut self, id: CatalogId) -> Result<String, FetchError>;
}

/// Resolution failure for a single identifier
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Couldn't resolve catalog id {id} after {attempts} attempts")]
    Exhausted {
        id: CatalogId,
        attempts: u32,
        #[source]
        last: Option<LookupError>,
    },

    #[error("Catalog id {id} was rejected by the metadata API: {source}")]
    Rejected {
        id: CatalogId,
        #[source]
        source: LookupError,
    },
}

impl FetchError {
    /// The identifier that could not be resolved
    pub fn id(&self) -> CatalogId {
        match self {
            FetchError::Exhausted { id, .. } | FetchError::Rejected { id, .. } => *id,
        }
    }
}

/// Throttle and retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Minimum time between two requests; also the backoff unit
    pub wait_interval: Duration,
    /// Attempts per identifier before giving up
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            wait_interval: DEFAULT_WAIT_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Fetcher that spaces requests at least `wait_interval` apart
pub struct RateLimitedFetcher<S, C = SystemClock> {
    source: S,
    clock: C,
    config: FetchConfig,
    /// When the last successful request fired
    last_request: Instant,
}

impl<S: MetadataSource> RateLimitedFetcher<S> {
    pub fn new(source: S, config: FetchConfig) -> Self {
        Self::with_clock(source, config, SystemClock)
    }
}

impl<S: MetadataSource, C: Clock> RateLimitedFetcher<S, C> {
    /// Create a fetcher with an explicit time source
    ///
    /// The first request only has to wait half of `wait_interval` from
    /// construction.
    pub fn with_clock(source: S, config: FetchConfig, clock: C) -> Self {
        let now = clock.now();
        let last_request = now.checked_sub(config.wait_interval / 2).unwrap_or(now);

        Self {
            source,
            clock,
            config,
            last_request,
        }
    }

    pub fn config(&self) -> FetchConfig {
        self.config
    }

    /// Block until `wait_interval` has passed since the last request
    fn wait_for_slot(&self) {
        loop {
            let elapsed = self.clock.now().saturating_duration_since(self.last_request);
            if elapsed >= self.config.wait_interval {
                return;
            }
            let remaining = self.config.wait_interval - elapsed;
            debug!(wait_ms = remaining.as_millis() as u64, "Rate limiting: waiting");
            self.clock.sleep(remaining);
        }
    }
}

impl<S: MetadataSource, C: Clock> NameFetcher for RateLimitedFetcher<S, C> {
    fn fetch(&mut self, id: CatalogId) -> Result<String, FetchError> {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            let backoff = self.config.wait_interval * attempt;
            if !backoff.is_zero() {
                self.clock.sleep(backoff);
            }
            self.wait_for_slot();

            info!(id = %id, attempt = attempt + 1, "Downloading name");
            match self.source.lookup_title(id) {
                Ok(title) => {
                    self.last_request = self.clock.now();
                    return Ok(title);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        id = %id,
                        attempt = attempt + 1,
                        max = self.config.max_retries,
                        next_backoff_ms = (self.config.wait_interval * (attempt + 1)).as_millis() as u64,
                        error = %e,
                        "Transient lookup failure"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "Lookup rejected, not retrying");
                    return Err(FetchError::Rejected { id, source: e });
                }
            }
        }

        Err(FetchError::Exhausted {
            id,
            attempts: self.config.max_retries,
            last: last_error,
        })
    }
}
