//! Cross-station aggregation and ranking by station coverage.

use crate::dedup::deduplicate;
use crate::track::{AggregatedTrack, RawTrackRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Per-station numbers shown in the consolidation summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationStats {
    pub unique_tracks: usize,
    pub total_plays: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    /// Ordered by station count, then plays, then display string
    pub tracks: Vec<AggregatedTrack>,
    pub station_stats: BTreeMap<String, StationStats>,
    pub records_processed: usize,
    pub flagged_for_review: usize,
    /// Stations left out because they had no playlist for this run
    pub excluded_stations: BTreeSet<String>,
}

/// Merge every station's records into one ranking
pub fn aggregate(per_station: &BTreeMap<String, Vec<RawTrackRecord>>) -> AggregateReport {
    aggregate_excluding(per_station, &BTreeSet::new())
}

/// Merge station records, skipping stations marked as having no playlist
pub fn aggregate_excluding(
    per_station: &BTreeMap<String, Vec<RawTrackRecord>>,
    excluded: &BTreeSet<String>,
) -> AggregateReport {
    let mut station_stats = BTreeMap::new();
    let mut excluded_stations = BTreeSet::new();

    for (station, records) in per_station {
        if excluded.contains(station) {
            log::info!(
                "Excluding {station} from aggregation ({} records): no playlist for this run",
                records.len()
            );
            excluded_stations.insert(station.clone());
            continue;
        }
        let station_result = deduplicate(records);
        station_stats.insert(
            station.clone(),
            StationStats {
                unique_tracks: station_result.tracks.len(),
                total_plays: station_result.tracks.values().map(|t| t.total_plays).sum(),
            },
        );
    }

    // Grouping all included records at once gives the same sums and station
    // unions as merging per-station results, and lets display votes span stations.
    let included = per_station
        .iter()
        .filter(|(station, _)| !excluded.contains(*station))
        .flat_map(|(_, records)| records.iter());
    let merged = deduplicate(included);

    let mut tracks: Vec<AggregatedTrack> = merged.tracks.into_values().collect();
    sort_by_coverage(&mut tracks);

    log::info!(
        "Aggregated {} records from {} stations into {} tracks",
        merged.records_processed,
        station_stats.len(),
        tracks.len()
    );

    AggregateReport {
        tracks,
        station_stats,
        records_processed: merged.records_processed,
        flagged_for_review: merged.flagged_for_review,
        excluded_stations,
    }
}

/// Station count descending, total plays descending, display ascending
pub fn coverage_order(a: &AggregatedTrack, b: &AggregatedTrack) -> Ordering {
    b.station_count
        .cmp(&a.station_count)
        .then_with(|| b.total_plays.cmp(&a.total_plays))
        .then_with(|| a.display.cmp(&b.display))
        .then_with(|| a.canonical.cmp(&b.canonical))
}

pub fn sort_by_coverage(tracks: &mut [AggregatedTrack]) {
    tracks.sort_by(coverage_order);
}

/// How many tracks were played on 1, 2, 3... stations
pub fn coverage_distribution(tracks: &[AggregatedTrack]) -> BTreeMap<usize, usize> {
    let mut distribution = BTreeMap::new();
    for track in tracks {
        *distribution.entry(track.station_count).or_insert(0) += 1;
    }
    distribution
}

/// Attribute an input file to a station by the first known station name
/// found among its path components or in its file name.
pub fn station_for_path<'a>(path: &Path, known_stations: &'a [String]) -> Option<&'a str> {
    let components: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if let Some(station) = known_stations
        .iter()
        .find(|station| components.iter().any(|c| c == *station))
    {
        return Some(station.as_str());
    }

    let file_name = path.file_name()?.to_string_lossy();
    known_stations
        .iter()
        .find(|station| file_name.contains(station.as_str()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn station(records: &[(&str, i64)], name: &str) -> Vec<RawTrackRecord> {
        records
            .iter()
            .map(|(raw, plays)| RawTrackRecord::new(*raw, name, *plays))
            .collect()
    }

    #[test_log::test]
    fn orders_by_station_coverage_before_plays() {
        let mut per_station = BTreeMap::new();
        per_station.insert(
            "A".to_string(),
            station(&[("Band - One", 3), ("Band - Three", 1), ("Band - Two", 2)], "A"),
        );
        per_station.insert("B".to_string(), station(&[("Band - Three", 1), ("Band - Two", 1)], "B"));
        per_station.insert("C".to_string(), station(&[("Band - Three", 1)], "C"));

        let report = aggregate(&per_station);
        let plays: Vec<u64> = report.tracks.iter().map(|t| t.total_plays).collect();
        assert_eq!(plays, vec![3, 3, 3]);
        let counts: Vec<usize> = report.tracks.iter().map(|t| t.station_count).collect();
        assert_eq!(counts, vec![3, 2, 1]);
        for track in &report.tracks {
            assert!(track.invariants_hold());
        }
    }

    #[test_log::test]
    fn single_station_heavy_rotation_ranks_below_broad_play() {
        let mut per_station = BTreeMap::new();
        per_station.insert(
            "NOVA".to_string(),
            station(&[("Local - Hit", 40), ("Broad - Hit", 1)], "NOVA"),
        );
        per_station.insert("P3".to_string(), station(&[("Broad - Hit", 1)], "P3"));

        let report = aggregate(&per_station);
        assert_eq!(report.tracks[0].display, "Broad - Hit");
        assert_eq!(report.tracks[1].display, "Local - Hit");
    }

    #[test_log::test]
    fn ties_break_on_display_string() {
        let mut per_station = BTreeMap::new();
        per_station.insert(
            "A".to_string(),
            station(&[("Zeta - Song", 2), ("Alpha - Song", 2)], "A"),
        );
        let report = aggregate(&per_station);
        assert_eq!(report.tracks[0].display, "Alpha - Song");
        assert_eq!(report.tracks[1].display, "Zeta - Song");
    }

    #[test_log::test]
    fn excluded_stations_do_not_contribute() {
        let mut per_station = BTreeMap::new();
        per_station.insert("NOVA".to_string(), station(&[("A - B", 2)], "NOVA"));
        per_station.insert("PartyFM".to_string(), station(&[("A - B", 9)], "PartyFM"));

        let excluded = BTreeSet::from(["PartyFM".to_string()]);
        let report = aggregate_excluding(&per_station, &excluded);

        assert_eq!(report.tracks.len(), 1);
        assert_eq!(report.tracks[0].total_plays, 2);
        assert_eq!(report.tracks[0].station_count, 1);
        assert!(report.excluded_stations.contains("PartyFM"));
        assert!(!report.station_stats.contains_key("PartyFM"));
    }

    #[test_log::test]
    fn station_stats_and_distribution() {
        let mut per_station = BTreeMap::new();
        per_station.insert(
            "NOVA".to_string(),
            station(&[("A - B", 2), ("a,b", 1), ("C - D", 4)], "NOVA"),
        );
        per_station.insert("P3".to_string(), station(&[("A - B", 1)], "P3"));

        let report = aggregate(&per_station);
        assert_eq!(
            report.station_stats["NOVA"],
            StationStats {
                unique_tracks: 2,
                total_plays: 7
            }
        );
        let distribution = coverage_distribution(&report.tracks);
        assert_eq!(distribution.get(&1), Some(&1));
        assert_eq!(distribution.get(&2), Some(&1));
    }

    #[test]
    fn station_attribution_from_path() {
        let known = vec!["NOVA".to_string(), "P3".to_string(), "P4".to_string()];
        let nested = PathBuf::from("Outputs/Stations/P3/Danish/P3_Danish_Titles.csv");
        assert_eq!(station_for_path(&nested, &known), Some("P3"));

        let flat = PathBuf::from("exports/NOVA_English_Titles_past_7_days.csv");
        assert_eq!(station_for_path(&flat, &known), Some("NOVA"));

        let unknown = PathBuf::from("exports/mystery.csv");
        assert_eq!(station_for_path(&unknown, &known), None);
    }
}
