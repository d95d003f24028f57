//! CSV output for transfer tools, and every filesystem write the pipeline makes.

use crate::track::{AggregatedTrack, UNKNOWN};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const STANDARD_HEADER: [&str; 4] = ["Track", "Repeats", "Stations", "Station_Count"];
pub const POPULARITY_COLUMN: &str = "Popularity_Score";
pub const TRANSFER_HEADER: [&str; 2] = ["Artist", "Title"];

static DATE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_\d{4}(?:-\d{2}){0,2}$").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not move output into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("Output path {0} has no parent directory")]
    NoParent(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    Standard,
    /// Standard columns, rows already in popularity order
    Ranked,
    /// Ranked plus a `Popularity_Score` column
    RankedDetailed,
    /// `Artist,Title` rows for playlist transfer services
    Transfer,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Standard,
        OutputFormat::Ranked,
        OutputFormat::RankedDetailed,
        OutputFormat::Transfer,
    ];

    /// Part of the file name between the playlist name and the date
    pub fn file_infix(self) -> &'static str {
        match self {
            OutputFormat::Standard => "",
            OutputFormat::Ranked => "_Ranked",
            OutputFormat::RankedDetailed => "_Ranked_Detailed",
            OutputFormat::Transfer => "_Transfer",
        }
    }

    fn has_popularity_column(self) -> bool {
        matches!(self, OutputFormat::RankedDetailed)
    }
}

/// Render tracks as CSV text, in the order given
pub fn emit(tracks: &[AggregatedTrack], format: OutputFormat) -> Result<String, EmitError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if format == OutputFormat::Transfer {
        writer.write_record(TRANSFER_HEADER)?;
        for track in tracks {
            writer.write_record([
                transfer_field(&track.display_artist),
                transfer_field(&track.display_title),
            ])?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        return Ok(String::from_utf8(bytes)?);
    }

    let mut header: Vec<&str> = STANDARD_HEADER.to_vec();
    if format.has_popularity_column() {
        header.push(POPULARITY_COLUMN);
    }
    writer.write_record(&header)?;

    for track in tracks {
        let mut row = vec![
            track.display.clone(),
            track.total_plays.to_string(),
            track.stations_joined(),
            track.station_count.to_string(),
        ];
        if format.has_popularity_column() {
            row.push(
                track
                    .popularity_score
                    .map(|score| format!("{score:.2}"))
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

// Transfer services match on what is there, so a placeholder goes out blank
fn transfer_field(value: &str) -> &str {
    if value == UNKNOWN {
        ""
    } else {
        value
    }
}

/// The first `max_tracks` tracks, or all of them without a cap
pub fn cap_tracks(tracks: &[AggregatedTrack], max_tracks: Option<usize>) -> &[AggregatedTrack] {
    match max_tracks {
        Some(max) => &tracks[..max.min(tracks.len())],
        None => tracks,
    }
}

/// `{Playlist}_{YYYY-MM-DD}.csv`, with the format infix (`_Ranked`,
/// `_Ranked_Detailed`, `_Transfer`) before the date
pub fn output_file_name(playlist: &str, format: OutputFormat, date: NaiveDate) -> String {
    format!(
        "{playlist}{}_{}.csv",
        format.file_infix(),
        date.format("%Y-%m-%d")
    )
}

/// Write `contents` next to `path` in a temporary file, then rename it over
/// `path`. On any failure the destination is left as it was.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), EmitError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.flush()?;
    temp.persist(path)?;

    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Emit one format for one playlist into `dir`, returning the written path
pub fn write_output(
    dir: &Path,
    playlist: &str,
    format: OutputFormat,
    date: NaiveDate,
    tracks: &[AggregatedTrack],
) -> Result<PathBuf, EmitError> {
    let path = dir.join(output_file_name(playlist, format, date));
    let contents = emit(tracks, format)?;
    write_atomic(&path, &contents)?;
    Ok(path)
}

/// Move outputs of the same playlist and format dated before `date` into
/// `archive_dir/{date}/`. Files dated on or after `date`, other formats and
/// other playlists are never touched. A file that cannot be moved is logged
/// and skipped. Returns the archived paths.
pub fn archive_superseded(
    dir: &Path,
    playlist: &str,
    format: OutputFormat,
    date: NaiveDate,
    archive_dir: &Path,
) -> Result<Vec<PathBuf>, EmitError> {
    let superseded: Vec<PathBuf> = dated_outputs(dir, playlist, format)?
        .into_iter()
        .filter(|(file_date, _)| *file_date < date)
        .map(|(_, path)| path)
        .collect();
    if superseded.is_empty() {
        return Ok(Vec::new());
    }

    let target_dir = archive_dir.join(date.format("%Y-%m-%d").to_string());
    std::fs::create_dir_all(&target_dir)?;

    let mut archived = Vec::new();
    for path in superseded {
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = target_dir.join(name);
        match move_file(&path, &target) {
            Ok(()) => {
                log::info!("Archived older version: {}", target.display());
                archived.push(target);
            }
            Err(e) => log::warn!("Could not archive {}: {e}", path.display()),
        }
    }

    Ok(archived)
}

// Rename fails across filesystems, so fall back to copy and remove
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

/// Most recent dated output of a playlist and format from before `date`
pub fn find_previous_output(
    dir: &Path,
    playlist: &str,
    format: OutputFormat,
    date: NaiveDate,
) -> Option<PathBuf> {
    dated_outputs(dir, playlist, format)
        .ok()?
        .into_iter()
        .filter(|(file_date, _)| *file_date < date)
        .max_by_key(|(file_date, _)| *file_date)
        .map(|(_, path)| path)
}

/// Files in `dir` named `{playlist}{infix}_{YYYY-MM-DD}.csv`, with their dates
fn dated_outputs(
    dir: &Path,
    playlist: &str,
    format: OutputFormat,
) -> std::io::Result<Vec<(NaiveDate, PathBuf)>> {
    let prefix = format!("{playlist}{}_", format.file_infix());
    let mut outputs = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(date_part) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".csv"))
        else {
            continue;
        };
        if let Ok(file_date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            outputs.push((file_date, entry.path()));
        }
    }

    Ok(outputs)
}

/// Playlist name from a file name: the stem without a trailing `_YYYY-MM-DD`
pub fn infer_playlist_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let name = DATE_SUFFIX.replace(&stem, "");
    if name.is_empty() {
        None
    } else {
        Some(name.into_owned())
    }
}
