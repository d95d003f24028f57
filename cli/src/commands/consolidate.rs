use crate::CliResult;
use chrono::NaiveDate;
use radio_charts::config::RadioChartsConfig;
use radio_charts::emit::infer_playlist_name;
use radio_charts::json_logger::JsonLogger;
use radio_charts::persistence::FilePopularityCache;
use radio_charts::pipeline::{
    run_consolidation, run_ranking, ConsolidationRequest, RankingRequest, RunSummary,
    TransferOptions,
};
use radio_charts::popularity::DeezerPopularitySource;
use radio_charts::status::exclusions_for_run;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Stations the orchestrator marked as having no playlist on `date`
fn excluded_stations(config: &RadioChartsConfig, date: NaiveDate) -> BTreeSet<String> {
    let Some(status_path) = &config.paths.status else {
        return BTreeSet::new();
    };

    let exclusions = exclusions_for_run(status_path, date);
    if !exclusions.pending.is_empty() {
        let pending: Vec<&str> = exclusions.pending.iter().map(String::as_str).collect();
        println!("⚠️  Scrape still incomplete for: {}", pending.join(", "));
    }
    exclusions.excluded
}

fn summary_logger(config: &RadioChartsConfig) -> JsonLogger {
    JsonLogger::new(config.paths.summary_path(), true)
}

fn record_outcome(
    config: &RadioChartsConfig,
    result: &Result<RunSummary, radio_charts::pipeline::PipelineError>,
) {
    let logger = summary_logger(config);
    let logged = match result {
        Ok(summary) => logger.log_run_completed(summary),
        Err(e) => logger.log_run_failed(e.to_string()),
    };
    if let Err(e) = logged {
        log::warn!("Could not append run summary: {e}");
    }
}

fn print_summary(summary: &RunSummary) {
    println!("📊 Run {}", summary.run_id);
    println!("==================");
    println!("  Records processed:   {}", summary.records_processed);
    println!("  Flagged for review:  {}", summary.flagged_for_review);
    println!("  Unique tracks:       {}", summary.tracks);
    println!(
        "  Files read/skipped:  {}/{}",
        summary.files_read,
        summary.files_skipped.len()
    );
    for path in &summary.files_skipped {
        println!("    ⚠️  skipped {}", path.display());
    }
    if !summary.excluded_stations.is_empty() {
        let excluded: Vec<&str> = summary.excluded_stations.iter().map(String::as_str).collect();
        println!("  Excluded stations:   {}", excluded.join(", "));
    }
    if let Some(ranking) = &summary.ranking {
        println!(
            "  Popularity:          {} cached, {} fetched, {} without score",
            ranking.cache_hits, ranking.fetched, ranking.failed
        );
    }
    if !summary.new_tracks.is_empty() {
        println!("\n🆕 {} new tracks:", summary.new_tracks.len());
        for track in &summary.new_tracks {
            println!("    {track}");
        }
    }
    println!("\n✅ Files written:");
    for path in &summary.files_written {
        println!("    {}", path.display());
    }
    if !summary.files_archived.is_empty() {
        println!("\n🗄️  Archived older outputs:");
        for path in &summary.files_archived {
            println!("    {}", path.display());
        }
    }
}

fn archive_dir(config: &RadioChartsConfig) -> Option<PathBuf> {
    config.output.archive.then(|| config.paths.archive_path())
}

fn transfer(config: &RadioChartsConfig) -> Option<TransferOptions> {
    config.output.transfer.then_some(TransferOptions {
        max_tracks: config.output.limit,
    })
}

/// Run the full consolidation pipeline
pub async fn consolidate(
    config: &RadioChartsConfig,
    language: Option<String>,
    date: NaiveDate,
) -> CliResult<()> {
    let request = ConsolidationRequest {
        stations_dir: PathBuf::from(&config.paths.stations),
        output_dir: PathBuf::from(&config.paths.output),
        playlist_name: config.output.playlist.clone(),
        known_stations: config.stations.names.clone(),
        language,
        excluded_stations: excluded_stations(config, date),
        rank: config.popularity.enabled,
        archive_dir: archive_dir(config),
        transfer: transfer(config),
        fetch_timeout: config.popularity.fetch_timeout(),
        date,
    };

    let source = DeezerPopularitySource::new(
        config.popularity.endpoint.clone(),
        config.popularity.request_delay(),
    );
    log::info!("Using popularity cache: {}", config.paths.cache);
    let mut cache = FilePopularityCache::open(&config.paths.cache)?;

    let result = run_consolidation(&request, &source, &mut cache).await;
    record_outcome(config, &result);
    print_summary(&result?);
    Ok(())
}

/// Rank one playlist file, as for a custom request
pub async fn rank_playlist(
    config: &RadioChartsConfig,
    source_file: &str,
    name: Option<&str>,
    date: NaiveDate,
) -> CliResult<()> {
    let source_path = Path::new(source_file);
    let playlist_name = match name {
        Some(name) => name.to_string(),
        None => infer_playlist_name(source_path)
            .ok_or_else(|| format!("Cannot infer a playlist name from {source_file}"))?,
    };

    let request = RankingRequest {
        source_file: source_path.to_path_buf(),
        output_dir: PathBuf::from(&config.paths.output),
        playlist_name,
        archive_dir: archive_dir(config),
        transfer: transfer(config),
        fetch_timeout: config.popularity.fetch_timeout(),
        date,
    };

    let source = DeezerPopularitySource::new(
        config.popularity.endpoint.clone(),
        config.popularity.request_delay(),
    );
    let mut cache = FilePopularityCache::open(&config.paths.cache)?;

    let result = run_ranking(&request, &source, &mut cache).await;
    record_outcome(config, &result);
    print_summary(&result?);
    Ok(())
}
