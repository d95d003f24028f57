//! End-to-end runs: station exports in, dated CSV files out.

use crate::aggregate::{
    aggregate_excluding, coverage_distribution, sort_by_coverage, station_for_path, StationStats,
};
use crate::dedup::deduplicate;
use crate::diff::{new_tracks, read_previous_output};
use crate::emit::{
    archive_superseded, cap_tracks, find_previous_output, write_output, EmitError, OutputFormat,
};
use crate::input::{read_playlist_csv, InputError};
use crate::persistence::PopularityStore;
use crate::popularity::{rank_by_popularity, PopularitySource};
use crate::track::{AggregatedTrack, RawTrackRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Cannot list station exports in {path}: {source}")]
    StationsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No playlist records found under {0}")]
    NoInput(PathBuf),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error("Popularity cache error: {0}")]
    Cache(String),
}

/// Everything a consolidation run needs besides the popularity collaborators
#[derive(Debug, Clone)]
pub struct ConsolidationRequest {
    pub stations_dir: PathBuf,
    pub output_dir: PathBuf,
    pub playlist_name: String,
    /// Station names used to attribute files
    pub known_stations: Vec<String>,
    /// Only read files below a directory with this name (e.g. "Danish")
    pub language: Option<String>,
    pub excluded_stations: BTreeSet<String>,
    pub rank: bool,
    /// Where superseded outputs are moved; `None` leaves them in place
    pub archive_dir: Option<PathBuf>,
    pub transfer: Option<TransferOptions>,
    pub fetch_timeout: Duration,
    pub date: NaiveDate,
}

/// Settings for the `Artist,Title` transfer export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Keep only the top tracks of the chart
    pub max_tracks: Option<usize>,
}

/// Ranking one playlist file on its own, as for a custom request
#[derive(Debug, Clone)]
pub struct RankingRequest {
    pub source_file: PathBuf,
    pub output_dir: PathBuf,
    pub playlist_name: String,
    pub archive_dir: Option<PathBuf>,
    pub transfer: Option<TransferOptions>,
    pub fetch_timeout: Duration,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankStats {
    pub cache_hits: usize,
    pub fetched: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub date: NaiveDate,
    pub records_processed: usize,
    pub flagged_for_review: usize,
    pub tracks: usize,
    pub files_read: usize,
    pub files_skipped: Vec<PathBuf>,
    pub files_written: Vec<PathBuf>,
    /// Archive locations of outputs superseded by this run
    pub files_archived: Vec<PathBuf>,
    pub excluded_stations: BTreeSet<String>,
    pub station_stats: BTreeMap<String, StationStats>,
    pub coverage: BTreeMap<usize, usize>,
    /// Display strings of tracks absent from the previous output
    pub new_tracks: Vec<String>,
    pub ranking: Option<RankStats>,
}

impl RunSummary {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            date,
            records_processed: 0,
            flagged_for_review: 0,
            tracks: 0,
            files_read: 0,
            files_skipped: Vec::new(),
            files_written: Vec::new(),
            files_archived: Vec::new(),
            excluded_stations: BTreeSet::new(),
            station_stats: BTreeMap::new(),
            coverage: BTreeMap::new(),
            new_tracks: Vec::new(),
            ranking: None,
        }
    }
}

/// Read every station export, aggregate, optionally rank, and write outputs.
///
/// Unreadable or unattributable files are skipped and listed in the summary.
/// A failed write aborts the run; files already written stay complete.
pub async fn run_consolidation<S, C>(
    request: &ConsolidationRequest,
    source: &S,
    cache: &mut C,
) -> Result<RunSummary, PipelineError>
where
    S: PopularitySource + ?Sized,
    C: PopularityStore + ?Sized,
{
    let mut summary = RunSummary::new(request.date);
    log::info!(
        "Starting consolidation run {} for {} ({})",
        summary.run_id,
        request.playlist_name,
        request.date
    );

    let files = find_csv_files(&request.stations_dir).map_err(|source| {
        PipelineError::StationsDir {
            path: request.stations_dir.clone(),
            source,
        }
    })?;

    let mut per_station: BTreeMap<String, Vec<RawTrackRecord>> = BTreeMap::new();
    for path in files {
        let relative = path.strip_prefix(&request.stations_dir).unwrap_or(&path);
        if let Some(language) = &request.language {
            if !relative.components().any(|c| c.as_os_str() == language.as_str()) {
                continue;
            }
        }

        let Some(station) = station_for_path(relative, &request.known_stations) else {
            log::warn!("Skipping {}: no known station in its path", path.display());
            summary.files_skipped.push(path);
            continue;
        };

        match read_playlist_csv(&path, station) {
            Ok(records) => {
                summary.files_read += 1;
                per_station
                    .entry(station.to_string())
                    .or_default()
                    .extend(records);
            }
            Err(e) => {
                log::warn!("Skipping unreadable file: {e}");
                summary.files_skipped.push(path);
            }
        }
    }

    let report = aggregate_excluding(&per_station, &request.excluded_stations);
    if report.records_processed == 0 {
        return Err(PipelineError::NoInput(request.stations_dir.clone()));
    }

    summary.records_processed = report.records_processed;
    summary.flagged_for_review = report.flagged_for_review;
    summary.tracks = report.tracks.len();
    summary.excluded_stations = report.excluded_stations.clone();
    summary.station_stats = report.station_stats.clone();
    summary.coverage = coverage_distribution(&report.tracks);

    if let Some(previous) = find_previous_output(
        &request.output_dir,
        &request.playlist_name,
        OutputFormat::Standard,
        request.date,
    ) {
        match read_previous_output(&previous) {
            Ok(keys) => {
                summary.new_tracks = new_tracks(&keys, &report.tracks)
                    .into_iter()
                    .map(|track| track.display.clone())
                    .collect();
                log::info!(
                    "{} new tracks since {}",
                    summary.new_tracks.len(),
                    previous.display()
                );
            }
            Err(e) => log::warn!("Could not read previous output {}: {e}", previous.display()),
        }
    }

    let output = OutputTarget {
        dir: &request.output_dir,
        playlist: &request.playlist_name,
        date: request.date,
        archive_dir: request.archive_dir.as_deref(),
    };
    output.write(OutputFormat::Standard, &report.tracks, &mut summary)?;

    let chart = if request.rank {
        let ranked = rank(report.tracks, source, cache, request.fetch_timeout, &mut summary).await?;
        output.write(OutputFormat::Ranked, &ranked, &mut summary)?;
        output.write(OutputFormat::RankedDetailed, &ranked, &mut summary)?;
        ranked
    } else {
        report.tracks
    };

    if let Some(transfer) = request.transfer {
        output.write_transfer(&chart, transfer, &mut summary)?;
    }

    log_summary(&summary);
    Ok(summary)
}

/// Deduplicate and rank a single playlist file
pub async fn run_ranking<S, C>(
    request: &RankingRequest,
    source: &S,
    cache: &mut C,
) -> Result<RunSummary, PipelineError>
where
    S: PopularitySource + ?Sized,
    C: PopularityStore + ?Sized,
{
    let mut summary = RunSummary::new(request.date);
    log::info!(
        "Ranking {} as '{}' (run {})",
        request.source_file.display(),
        request.playlist_name,
        summary.run_id
    );

    let records = read_playlist_csv(&request.source_file, &request.playlist_name)?;
    summary.files_read = 1;

    let result = deduplicate(&records);
    if result.records_processed == 0 {
        return Err(PipelineError::NoInput(request.source_file.clone()));
    }
    summary.records_processed = result.records_processed;
    summary.flagged_for_review = result.flagged_for_review;

    let mut tracks: Vec<AggregatedTrack> = result.tracks.into_values().collect();
    sort_by_coverage(&mut tracks);
    summary.tracks = tracks.len();
    summary.coverage = coverage_distribution(&tracks);

    let ranked = rank(tracks, source, cache, request.fetch_timeout, &mut summary).await?;

    let output = OutputTarget {
        dir: &request.output_dir,
        playlist: &request.playlist_name,
        date: request.date,
        archive_dir: request.archive_dir.as_deref(),
    };
    output.write(OutputFormat::Ranked, &ranked, &mut summary)?;
    output.write(OutputFormat::RankedDetailed, &ranked, &mut summary)?;
    if let Some(transfer) = request.transfer {
        output.write_transfer(&ranked, transfer, &mut summary)?;
    }

    log_summary(&summary);
    Ok(summary)
}

async fn rank<S, C>(
    tracks: Vec<AggregatedTrack>,
    source: &S,
    cache: &mut C,
    timeout: Duration,
    summary: &mut RunSummary,
) -> Result<Vec<AggregatedTrack>, PipelineError>
where
    S: PopularitySource + ?Sized,
    C: PopularityStore + ?Sized,
{
    let report = rank_by_popularity(tracks, cache, source, timeout)
        .await
        .map_err(|e| PipelineError::Cache(e.to_string()))?;
    summary.ranking = Some(RankStats {
        cache_hits: report.cache_hits,
        fetched: report.fetched,
        failed: report.failed,
    });
    Ok(report.tracks)
}

struct OutputTarget<'a> {
    dir: &'a Path,
    playlist: &'a str,
    date: NaiveDate,
    archive_dir: Option<&'a Path>,
}

impl OutputTarget<'_> {
    fn write(
        &self,
        format: OutputFormat,
        tracks: &[AggregatedTrack],
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let path = write_output(self.dir, self.playlist, format, self.date, tracks)?;
        if let Some(archive_dir) = self.archive_dir {
            let archived =
                archive_superseded(self.dir, self.playlist, format, self.date, archive_dir)?;
            summary.files_archived.extend(archived);
        }
        summary.files_written.push(path);
        Ok(())
    }

    fn write_transfer(
        &self,
        chart: &[AggregatedTrack],
        transfer: TransferOptions,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let tracks = cap_tracks(chart, transfer.max_tracks);
        if tracks.len() < chart.len() {
            log::info!("Transfer list capped at {} of {} tracks", tracks.len(), chart.len());
        }
        self.write(OutputFormat::Transfer, tracks, summary)
    }
}

/// All `.csv` files below `dir`, sorted for a stable read order
fn find_csv_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn log_summary(summary: &RunSummary) {
    log::info!(
        "Run {} done: {} records, {} flagged for review, {} tracks, {} files read, {} skipped, {} written, {} archived",
        summary.run_id,
        summary.records_processed,
        summary.flagged_for_review,
        summary.tracks,
        summary.files_read,
        summary.files_skipped.len(),
        summary.files_written.len(),
        summary.files_archived.len()
    );
    for (station, stats) in &summary.station_stats {
        log::info!(
            "  {station}: {} unique tracks, {} plays",
            stats.unique_tracks,
            stats.total_plays
        );
    }
    for (stations, count) in &summary.coverage {
        log::debug!("  {count} tracks played on {stations} station(s)");
    }
}
