use super::{PopularityError, PopularitySource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.deezer.com";

/// Deezer's `rank` runs up to roughly a million; this brings it onto 0-100
const RANK_SCALE: f64 = 10_000.0;

/// Popularity from the public Deezer search API
pub struct DeezerPopularitySource {
    client: Client,
    base_url: String,
    request_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    rank: Option<f64>,
}

impl DeezerPopularitySource {
    #[must_use]
    pub fn new(base_url: impl Into<String>, request_delay: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_delay,
        }
    }

    fn search_query(artist: &str, title: &str) -> String {
        format!("artist:\"{artist}\" track:\"{title}\"")
    }
}

impl Default for DeezerPopularitySource {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_millis(100))
    }
}

/// Map a Deezer rank onto the 0-100 popularity scale
pub fn rank_to_score(rank: f64) -> f64 {
    (rank / RANK_SCALE).clamp(0.0, 100.0)
}

#[async_trait]
impl PopularitySource for DeezerPopularitySource {
    async fn fetch_popularity(&self, artist: &str, title: &str) -> Result<f64, PopularityError> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let url = format!("{}/search", self.base_url);
        let query = Self::search_query(artist, title);
        log::debug!("Deezer search: {query}");

        let response = self
            .client
            .get(&url)
            .query(&[("q", query.as_str()), ("limit", "1")])
            .header("User-Agent", "radio-charts (playlist consolidation)")
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PopularityError::InvalidResponse(e.to_string()))?;

        match body.data.first().and_then(|hit| hit.rank) {
            Some(rank) => Ok(rank_to_score(rank)),
            None => Err(PopularityError::NotFound {
                artist: artist.to_string(),
                title: title.to_string(),
            }),
        }
    }

    fn source_name(&self) -> &str {
        "Deezer"
    }
}
