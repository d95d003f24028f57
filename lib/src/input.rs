//! Reading station playlist CSV files into raw records.
//!
//! The header row decides how the rest of the file is read. Unknown headers
//! are not an error: the first two columns are taken as artist and title.

use crate::track::RawTrackRecord;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl InputError {
    pub fn path(&self) -> &Path {
        match self {
            InputError::Unreadable { path, .. } | InputError::Csv { path, .. } => path,
        }
    }
}

/// Column layout detected from a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSchema {
    /// One "Artist - Title" column (`Track,Group`, `Track,Repeats,...`)
    TrackColumn {
        track: usize,
        repeats: Option<usize>,
    },
    /// Separate artist and title columns (`Artist,Title`, `Song,Artist`)
    ArtistTitle { artist: usize, title: usize },
    /// Unrecognised header: column 0 is the artist, column 1 the title
    Positional,
}

impl InputSchema {
    pub fn detect(header: &StringRecord) -> Self {
        let names: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| names.iter().position(|n| n == name);

        if let Some(track) = find("track") {
            return InputSchema::TrackColumn {
                track,
                repeats: find("repeats"),
            };
        }
        if let Some(artist) = find("artist") {
            if let Some(title) = find("title").or_else(|| find("song")) {
                return InputSchema::ArtistTitle { artist, title };
            }
        }
        InputSchema::Positional
    }
}

/// Read one station's playlist file
pub fn read_playlist_csv<P: AsRef<Path>>(
    path: P,
    station: &str,
) -> Result<Vec<RawTrackRecord>, InputError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_records(&text, station).map_err(|source| InputError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "Read {} records for {station} from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Read playlist CSV text already in memory
pub fn read_playlist_str(text: &str, station: &str) -> Result<Vec<RawTrackRecord>, csv::Error> {
    parse_records(text, station)
}

fn parse_records(text: &str, station: &str) -> Result<Vec<RawTrackRecord>, csv::Error> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let schema = InputSchema::detect(reader.headers()?);
    if schema == InputSchema::Positional {
        log::warn!(
            "Unrecognised header for {station} ({:?}), reading columns by position",
            reader.headers()?
        );
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        records.push(record_from_row(&row, schema, station));
    }
    Ok(records)
}

fn record_from_row(row: &StringRecord, schema: InputSchema, station: &str) -> RawTrackRecord {
    let field = |index: usize| row.get(index).unwrap_or("");
    match schema {
        InputSchema::TrackColumn { track, repeats } => {
            let plays = repeats
                .and_then(|index| field(index).parse::<i64>().ok())
                .unwrap_or(1);
            RawTrackRecord::new(field(track), station, plays)
        }
        InputSchema::ArtistTitle { artist, title } => {
            RawTrackRecord::from_fields(field(artist), field(title), station, 1)
        }
        InputSchema::Positional => RawTrackRecord::from_fields(field(0), field(1), station, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_record, ParseOutcome};
    use crate::track::{CanonicalTrack, TrackFields};
    use std::io::Write;

    fn fields(artist: &str, title: &str) -> TrackFields {
        TrackFields {
            artist: artist.to_string(),
            title: title.to_string(),
        }
    }

    #[test_log::test]
    fn track_group_header() {
        let records =
            read_playlist_str("Track,Group\nKygo - Firestone,Pop\nMedina - Kun For Mig,Dansk\n", "NOVA")
                .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw_text, "Kygo - Firestone");
        assert_eq!(records[0].station, "NOVA");
        assert_eq!(records[0].play_count, 1);
    }

    #[test_log::test]
    fn repeats_column_becomes_play_count() {
        let text = "Track,Repeats,Stations,Station_Count\n\
                    \"Bryan Adams, Rod Stewart - All For Love\",4,\"NOVA, P3\",2\n\
                    Aqua - Barbie Girl,n/a,P4,1\n";
        let records = read_playlist_str(text, "NOVA").unwrap();
        assert_eq!(records[0].raw_text, "Bryan Adams, Rod Stewart - All For Love");
        assert_eq!(records[0].play_count, 4);
        assert_eq!(records[1].play_count, 1);
    }

    #[test_log::test]
    fn artist_title_header_in_any_case_and_order() {
        let records = read_playlist_str(" title , ARTIST\nBlank Space,Taylor Swift\n", "P3").unwrap();
        assert_eq!(records[0].fields, Some(fields("Taylor Swift", "Blank Space")));

        let records = read_playlist_str("Song,Artist\nFirestone,Kygo\n", "P3").unwrap();
        assert_eq!(records[0].fields, Some(fields("Kygo", "Firestone")));
    }

    #[test_log::test]
    fn unknown_header_falls_back_to_positions() {
        let records = read_playlist_str("Kunstner,Sang\nTessa,Ben\n", "P4").unwrap();
        assert_eq!(records[0].fields, Some(fields("Tessa", "Ben")));
    }

    #[test_log::test]
    fn separators_inside_columns_stay_put() {
        let text = "Artist,Title\nAC - DC,Thunderstruck\n,Down Under - Live\n";
        let records = read_playlist_str(text, "NOVA").unwrap();

        let first = normalize_record(&records[0]);
        assert_eq!(first.canonical, CanonicalTrack::new("ac - dc", "thunderstruck"));
        assert_eq!(first.outcome, ParseOutcome::Parsed);

        let second = normalize_record(&records[1]);
        assert_eq!(second.canonical, CanonicalTrack::new("unknown", "down under - live"));
        assert_eq!(second.outcome, ParseOutcome::FallbackUsed);
    }

    #[test_log::test]
    fn empty_title_column_is_flagged_not_dropped() {
        let records = read_playlist_str("Artist,Title\nRasmus Seebach,\n", "P4").unwrap();
        assert_eq!(records.len(), 1);
        let normalized = normalize_record(&records[0]);
        assert_eq!(normalized.artist, "Rasmus Seebach");
        assert_eq!(normalized.outcome, ParseOutcome::FallbackUsed);
    }

    #[test_log::test]
    fn short_rows_and_blank_lines_are_tolerated() {
        let records = read_playlist_str("Artist,Title\nSolo\n,\nA,B\n", "P4").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields, Some(fields("Solo", "")));
        assert_eq!(records[1].fields, Some(fields("A", "B")));
    }

    #[test_log::test]
    fn reads_files_and_reports_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NOVA.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "\u{feff}Track,Group").unwrap();
        writeln!(file, "Lukas Graham - 7 Years,Pop").unwrap();
        drop(file);

        let records = read_playlist_csv(&path, "NOVA").unwrap();
        assert_eq!(records.len(), 1);

        let missing = dir.path().join("missing.csv");
        let err = read_playlist_csv(&missing, "NOVA").unwrap_err();
        assert!(matches!(err, InputError::Unreadable { .. }));
        assert_eq!(err.path(), missing.as_path());
    }
}
