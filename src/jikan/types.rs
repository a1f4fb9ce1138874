//! Jikan API response types

use serde::Deserialize;

/// Envelope of `GET /anime/{id}`
#[derive(Debug, Deserialize)]
pub struct AnimeResponse {
    pub data: AnimeData,
}

/// The subset of an anime record the site needs
#[derive(Debug, Deserialize)]
pub struct AnimeData {
    /// MyAnimeList id echoed back by the API
    pub mal_id: u64,
    /// Default (romanized) title
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anime_response() {
        let body = r#"{
            "data": {
                "mal_id": 32281,
                "url": "https://myanimelist.net/anime/32281/Kimi_no_Na_wa",
                "title": "Kimi no Na wa.",
                "title_english": "Your Name.",
                "episodes": 1
            }
        }"#;

        let response: AnimeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.data.mal_id, 32281);
        assert_eq!(response.data.title, "Kimi no Na wa.");
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let body = r#"{"data": {"mal_id": 5}}"#;
        assert!(serde_json::from_str::<AnimeResponse>(body).is_err());
    }
}
