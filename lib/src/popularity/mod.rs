//! Popularity enrichment and re-ranking.
//!
//! Scores come from a [`PopularitySource`] (a streaming service search) and
//! are memoised in a [`PopularityStore`]. A lookup that fails or exceeds the
//! caller's timeout leaves the track without a score; the batch always
//! completes.

use crate::persistence::{CachedPopularity, PopularityStore};
use crate::track::AggregatedTrack;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::time::Duration;

pub mod deezer;
pub use deezer::DeezerPopularitySource;

/// Errors from an external popularity lookup
#[derive(Debug, thiserror::Error)]
pub enum PopularityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("No match found for '{artist} - {title}'")]
    NotFound { artist: String, title: String },
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Something that can score how popular a track is, on a 0-100 scale
#[async_trait]
pub trait PopularitySource: Send + Sync {
    async fn fetch_popularity(&self, artist: &str, title: &str) -> Result<f64, PopularityError>;

    /// Get a human-readable name for this source
    fn source_name(&self) -> &str;
}

/// Outcome of a ranking pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankReport {
    pub tracks: Vec<AggregatedTrack>,
    pub cache_hits: usize,
    pub fetched: usize,
    pub failed: usize,
}

/// Attach popularity scores and re-sort by them.
///
/// Cache hits are used as-is. Misses are fetched with `timeout` per lookup
/// and stored on success; failures are logged and leave the score empty.
/// The cache is flushed once, after every track has been looked at; only a
/// failed flush is returned as an error.
/// Sorting is stable: scored tracks first by descending score, then the
/// unscored ones in their incoming order.
pub async fn rank_by_popularity<S, C>(
    tracks: Vec<AggregatedTrack>,
    cache: &mut C,
    source: &S,
    timeout: Duration,
) -> Result<RankReport, C::Error>
where
    S: PopularitySource + ?Sized,
    C: PopularityStore + ?Sized,
{
    let total = tracks.len();
    let mut report = RankReport {
        tracks: Vec::with_capacity(total),
        ..RankReport::default()
    };

    for (index, mut track) in tracks.into_iter().enumerate() {
        let key = track.canonical.cache_key();

        if let Some(cached) = cache.get(&key) {
            log::trace!("Popularity cache hit for '{key}'");
            track.popularity_score = Some(cached.score);
            report.cache_hits += 1;
        } else {
            match fetch_with_timeout(source, &track, timeout).await {
                Ok(score) => {
                    if let Err(e) = cache.upsert(&key, &CachedPopularity::new(score)) {
                        log::warn!("Could not cache popularity for '{key}': {e}");
                    }
                    track.popularity_score = Some(score);
                    report.fetched += 1;
                }
                Err(e) => {
                    log::warn!(
                        "{} lookup failed for '{}': {e}",
                        source.source_name(),
                        track.display
                    );
                    track.popularity_score = None;
                    report.failed += 1;
                }
            }
        }

        if (index + 1) % 25 == 0 || index + 1 == total {
            log::info!("Popularity progress: {}/{total}", index + 1);
        }
        report.tracks.push(track);
    }

    cache.flush()?;
    sort_by_popularity(&mut report.tracks);

    log::info!(
        "Ranked {total} tracks: {} cached, {} fetched, {} without score",
        report.cache_hits,
        report.fetched,
        report.failed
    );

    Ok(report)
}

async fn fetch_with_timeout<S>(
    source: &S,
    track: &AggregatedTrack,
    timeout: Duration,
) -> Result<f64, PopularityError>
where
    S: PopularitySource + ?Sized,
{
    match tokio::time::timeout(
        timeout,
        source.fetch_popularity(&track.display_artist, &track.display_title),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(PopularityError::Timeout(timeout)),
    }
}

/// Descending score, missing scores last; stable for equal and missing scores
pub fn sort_by_popularity(tracks: &mut [AggregatedTrack]) {
    tracks.sort_by(|a, b| match (a.popularity_score, b.popularity_score) {
        (Some(a_score), Some(b_score)) => b_score.total_cmp(&a_score),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPopularityCache;
    use crate::track::CanonicalTrack;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    struct FixedScores {
        scores: HashMap<String, f64>,
        calls: AtomicUsize,
    }

    impl FixedScores {
        fn new(scores: &[(&str, f64)]) -> Self {
            Self {
                scores: scores
                    .iter()
                    .map(|(title, score)| (title.to_string(), *score))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PopularitySource for FixedScores {
        async fn fetch_popularity(
            &self,
            artist: &str,
            title: &str,
        ) -> Result<f64, PopularityError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.scores
                .get(title)
                .copied()
                .ok_or_else(|| PopularityError::NotFound {
                    artist: artist.to_string(),
                    title: title.to_string(),
                })
        }

        fn source_name(&self) -> &str {
            "fixed"
        }
    }

    fn track(title: &str) -> AggregatedTrack {
        let mut track = AggregatedTrack::new(
            CanonicalTrack::new("artist", title.to_lowercase()),
            "Artist".to_string(),
            title.to_string(),
        );
        track.add_plays("NOVA", 1);
        track
    }

    #[test_log::test(tokio::test)]
    async fn sorts_by_score_with_unscored_last_in_original_order() {
        let source = FixedScores::new(&[("Low", 10.0), ("High", 90.0), ("Mid", 50.0)]);
        let mut cache = MemoryPopularityCache::new();
        let tracks = vec![
            track("Missing A"),
            track("Low"),
            track("Missing B"),
            track("High"),
            track("Mid"),
        ];

        let report = rank_by_popularity(tracks, &mut cache, &source, Duration::from_secs(1))
            .await
            .unwrap();

        let titles: Vec<&str> = report
            .tracks
            .iter()
            .map(|t| t.display_title.as_str())
            .collect();
        assert_eq!(titles, vec!["High", "Mid", "Low", "Missing A", "Missing B"]);
        assert_eq!(report.fetched, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(cache.flush_count(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn equal_scores_keep_incoming_order() {
        let source = FixedScores::new(&[("First", 40.0), ("Second", 40.0), ("Third", 40.0)]);
        let mut cache = MemoryPopularityCache::new();
        let tracks = vec![track("First"), track("Second"), track("Third")];

        let report = rank_by_popularity(tracks, &mut cache, &source, Duration::from_secs(1))
            .await
            .unwrap();
        let titles: Vec<&str> = report
            .tracks
            .iter()
            .map(|t| t.display_title.as_str())
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test_log::test(tokio::test)]
    async fn cached_scores_skip_the_source() {
        let source = FixedScores::new(&[("Hit", 80.0)]);
        let mut cache = MemoryPopularityCache::new();
        cache
            .upsert("artist|hit", &CachedPopularity::new(12.0))
            .unwrap();

        let report = rank_by_popularity(vec![track("Hit")], &mut cache, &source, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(report.tracks[0].popularity_score, Some(12.0));
        assert_eq!(report.cache_hits, 1);
        assert_eq!(source.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[test_log::test(tokio::test)]
    async fn failures_are_not_cached() {
        let source = FixedScores::new(&[]);
        let mut cache = MemoryPopularityCache::new();
        let report = rank_by_popularity(vec![track("Gone")], &mut cache, &source, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(report.tracks[0].popularity_score, None);
        assert!(cache.is_empty());
    }

    struct OneSlowTrack;

    #[async_trait]
    impl PopularitySource for OneSlowTrack {
        async fn fetch_popularity(
            &self,
            _artist: &str,
            title: &str,
        ) -> Result<f64, PopularityError> {
            if title == "Track 42" {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(50.0)
        }

        fn source_name(&self) -> &str {
            "slow"
        }
    }

    #[test_log::test(tokio::test)]
    async fn one_timeout_does_not_stop_the_batch() {
        let mut cache = MemoryPopularityCache::new();
        let tracks: Vec<AggregatedTrack> =
            (0..100).map(|i| track(&format!("Track {i}"))).collect();

        let report = rank_by_popularity(tracks, &mut cache, &OneSlowTrack, Duration::from_millis(50))
            .await
            .unwrap();

        assert_eq!(report.tracks.len(), 100);
        assert_eq!(report.fetched, 99);
        assert_eq!(report.failed, 1);
        let last = report.tracks.last().unwrap();
        assert_eq!(last.display_title, "Track 42");
        assert_eq!(last.popularity_score, None);
        assert_eq!(cache.len(), 99);
    }
}
