use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Artist name used whenever a record does not carry one
pub const UNKNOWN: &str = "Unknown";

/// Artist and title as delivered in separate columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFields {
    pub artist: String,
    pub title: String,
}

/// A single scraped playlist row, as produced by a station scraper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrackRecord {
    pub raw_text: String,
    pub station: String,
    pub play_count: i64,
    pub timestamp: Option<DateTime<Utc>>,
    /// Set when the source already split artist from title. Normalization
    /// then uses these instead of re-splitting `raw_text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<TrackFields>,
}

impl RawTrackRecord {
    pub fn new<T: Into<String>, S: Into<String>>(raw_text: T, station: S, play_count: i64) -> Self {
        Self {
            raw_text: raw_text.into(),
            station: station.into(),
            play_count,
            timestamp: None,
            fields: None,
        }
    }

    /// Record for a row with separate artist and title columns.
    /// `raw_text` keeps the row as read, for log messages.
    pub fn from_fields<A, T, S>(artist: A, title: T, station: S, play_count: i64) -> Self
    where
        A: Into<String>,
        T: Into<String>,
        S: Into<String>,
    {
        let fields = TrackFields {
            artist: artist.into(),
            title: title.into(),
        };
        Self {
            raw_text: format!("{},{}", fields.artist, fields.title),
            station: station.into(),
            play_count,
            timestamp: None,
            fields: Some(fields),
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Plays this record contributes. A row only exists because the track
    /// was aired, so anything below one counts as a single play.
    pub fn effective_plays(&self) -> u64 {
        self.play_count.max(1) as u64
    }
}

/// Comparison key for a track: lower-cased artist and title after normalization
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalTrack {
    pub artist: String,
    pub title: String,
}

impl CanonicalTrack {
    pub fn new<A: Into<String>, T: Into<String>>(artist: A, title: T) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }

    /// Flat string form used as the popularity cache key
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.artist, self.title)
    }
}

/// One track after folding every record that shares its canonical key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedTrack {
    pub canonical: CanonicalTrack,
    /// "Artist - Title" in the casing most often seen in the input
    pub display: String,
    pub display_artist: String,
    pub display_title: String,
    pub total_plays: u64,
    pub stations: BTreeSet<String>,
    pub station_count: usize,
    pub popularity_score: Option<f64>,
}

impl AggregatedTrack {
    pub fn new(canonical: CanonicalTrack, display_artist: String, display_title: String) -> Self {
        Self {
            canonical,
            display: format!("{display_artist} - {display_title}"),
            display_artist,
            display_title,
            total_plays: 0,
            stations: BTreeSet::new(),
            station_count: 0,
            popularity_score: None,
        }
    }

    /// Count plays from one station, keeping `station_count` in step with `stations`
    pub fn add_plays(&mut self, station: &str, plays: u64) {
        self.total_plays += plays;
        if !self.stations.contains(station) {
            self.stations.insert(station.to_string());
        }
        self.station_count = self.stations.len();
    }

    /// Stations joined the way the CSV `Stations` column shows them
    pub fn stations_joined(&self) -> String {
        self.stations
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn invariants_hold(&self) -> bool {
        self.station_count == self.stations.len() && self.total_plays >= self.station_count as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_plays_tracks_distinct_stations() {
        let mut track = AggregatedTrack::new(
            CanonicalTrack::new("medina", "kun for mig"),
            "Medina".to_string(),
            "Kun For Mig".to_string(),
        );
        track.add_plays("NOVA", 3);
        track.add_plays("P3", 1);
        track.add_plays("NOVA", 2);

        assert_eq!(track.total_plays, 6);
        assert_eq!(track.station_count, 2);
        assert_eq!(track.stations_joined(), "NOVA, P3");
        assert_eq!(track.display, "Medina - Kun For Mig");
        assert!(track.invariants_hold());
    }

    #[test]
    fn zero_play_rows_still_count_once() {
        assert_eq!(RawTrackRecord::new("A - B", "NOVA", 0).effective_plays(), 1);
        assert_eq!(RawTrackRecord::new("A - B", "NOVA", -4).effective_plays(), 1);
        assert_eq!(RawTrackRecord::new("A - B", "NOVA", 7).effective_plays(), 7);
    }
}
