//! Jikan (unofficial MyAnimeList) API client

pub mod client;
pub mod errors;
pub mod types;

pub use client::JikanClient;
pub use errors::LookupError;
