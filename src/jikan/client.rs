//! Jikan API Client
//!
//! Blocking lookups of anime titles by MyAnimeList id. Each call is exactly
//! one HTTP request; throttling and retries live in the fetcher.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::errors::LookupError;
use super::types::AnimeResponse;
use crate::fetch::MetadataSource;
use crate::id::CatalogId;

/// Jikan v4 REST base URL
pub const JIKAN_BASE_URL: &str = "https://api.jikan.moe/v4";

/// HTTP client timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("animeshorts-names/", env!("CARGO_PKG_VERSION"));

/// Client for the Jikan anime endpoint
#[derive(Clone)]
pub struct JikanClient {
    http_client: Client,
    base_url: String,
}

impl JikanClient {
    /// Create a client for the API rooted at `base_url`
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn anime_url(&self, id: CatalogId) -> String {
        format!("{}/anime/{}", self.base_url, id)
    }
}

impl MetadataSource for JikanClient {
    fn lookup_title(&self, id: CatalogId) -> Result<String, LookupError> {
        let url = self.anime_url(id);
        debug!(id = %id, url = %url, "Querying Jikan API");

        let response = self.http_client.get(&url).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LookupError::from_status(id, status.as_u16(), &body));
        }

        let anime: AnimeResponse = response
            .json()
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        if anime.data.mal_id != id.get() {
            warn!(id = %id, returned = anime.data.mal_id, "Jikan returned a different id");
        }
        debug!(id = %id, title = %anime.data.title, "Resolved title");
        Ok(anime.data.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anime_url() {
        let client = JikanClient::with_base_url("http://localhost:8080/v4/").unwrap();
        let id = CatalogId::new(32281).unwrap();
        assert_eq!(client.anime_url(id), "http://localhost:8080/v4/anime/32281");

        let client = JikanClient::with_base_url(JIKAN_BASE_URL).unwrap();
        assert_eq!(client.anime_url(id), "https://api.jikan.moe/v4/anime/32281");
    }
}
