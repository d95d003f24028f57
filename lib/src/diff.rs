//! New-track report: what appears in this run's ranking but not the last one.

use crate::normalize::normalize;
use crate::track::{AggregatedTrack, CanonicalTrack};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;

/// Tracks in `current` whose key is absent from `previous`, in `current` order.
///
/// Both sides are keyed from the display text, the only form an output file
/// keeps, so tracks read from split columns compare the same way on rerun.
pub fn new_tracks<'a>(
    previous: &HashSet<CanonicalTrack>,
    current: &'a [AggregatedTrack],
) -> Vec<&'a AggregatedTrack> {
    current
        .iter()
        .filter(|track| !previous.contains(&normalize(&track.display).canonical))
        .collect()
}

/// Comparison keys from the `Track` column of an earlier output file
pub fn read_previous_output(path: &Path) -> Result<HashSet<CanonicalTrack>, csv::Error> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let track_column = reader
        .headers()?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("track"));

    let Some(track_column) = track_column else {
        log::warn!(
            "{} has no Track column, nothing to compare against",
            path.display()
        );
        return Ok(HashSet::new());
    };

    let mut keys = HashSet::new();
    for row in reader.records() {
        if let Some(text) = row?.get(track_column) {
            keys.insert(normalize(text).canonical);
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artist: &str, title: &str) -> AggregatedTrack {
        let mut track = AggregatedTrack::new(
            CanonicalTrack::new(artist.to_lowercase(), title.to_lowercase()),
            artist.to_string(),
            title.to_string(),
        );
        track.add_plays("NOVA", 1);
        track
    }

    #[test_log::test]
    fn reports_only_unseen_tracks_in_current_order() {
        let dir = tempfile::tempdir().unwrap();
        let previous_path = dir.path().join("Mix_2025-03-07.csv");
        std::fs::write(
            &previous_path,
            "Track,Repeats,Stations,Station_Count\nKYGO - Firestone,3,NOVA,1\n",
        )
        .unwrap();

        let previous = read_previous_output(&previous_path).unwrap();
        let current = vec![
            track("Tessa", "Ben"),
            track("Kygo", "Firestone"),
            track("Aqua", "Barbie Girl"),
        ];

        let fresh: Vec<&str> = new_tracks(&previous, &current)
            .iter()
            .map(|t| t.display.as_str())
            .collect();
        assert_eq!(fresh, vec!["Tessa - Ben", "Aqua - Barbie Girl"]);
    }

    #[test_log::test]
    fn split_column_tracks_match_their_written_form() {
        let dir = tempfile::tempdir().unwrap();
        let previous_path = dir.path().join("Mix_2025-03-07.csv");
        std::fs::write(
            &previous_path,
            "Track,Repeats,Stations,Station_Count\nAC - DC - Thunderstruck,2,NOVA,1\n",
        )
        .unwrap();

        let previous = read_previous_output(&previous_path).unwrap();
        let current = vec![track("AC - DC", "Thunderstruck")];
        assert!(new_tracks(&previous, &current).is_empty());
    }

    #[test_log::test]
    fn file_without_track_column_compares_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.csv");
        std::fs::write(&path, "Artist,Title\nKygo,Firestone\n").unwrap();
        assert!(read_previous_output(&path).unwrap().is_empty());
    }
}
