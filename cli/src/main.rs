mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use commands::*;
use config::ConfigError;
use radio_charts::config::RadioChartsConfig;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "radio-charts")]
#[command(about = "Consolidate radio station playlists into ranked charts")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the popularity cache database
    #[arg(long)]
    cache_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cached popularity scores
    Show {
        /// Limit the number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Remove every cached score
    Clear,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge all station exports into dated chart files
    Consolidate {
        /// Root directory of the per-station exports
        #[arg(long)]
        stations_dir: Option<String>,

        /// Directory for the consolidated CSV files
        #[arg(long)]
        output_dir: Option<String>,

        /// Playlist name used in output file names
        #[arg(short, long)]
        name: Option<String>,

        /// Only read exports below a directory with this name (e.g. Danish)
        #[arg(short, long)]
        language: Option<String>,

        /// Orchestrator status file listing stations without a playlist
        #[arg(long)]
        status_file: Option<String>,

        /// Also write popularity-ranked outputs
        #[arg(long)]
        rank: bool,

        /// Leave older dated outputs in place instead of archiving them
        #[arg(long)]
        no_archive: bool,

        /// Also write an Artist,Title list for playlist transfer services
        #[arg(long)]
        transfer: bool,

        /// Maximum tracks in the transfer list
        #[arg(long)]
        max_tracks: Option<usize>,

        /// Run date used in file names (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Rank a single playlist file by popularity
    Rank {
        /// Playlist CSV to rank
        #[arg(short, long)]
        source: String,

        /// Playlist name (defaults to the file name without its date)
        #[arg(short, long)]
        name: Option<String>,

        /// Directory for the ranked CSV files
        #[arg(long)]
        output_dir: Option<String>,

        /// Also write an Artist,Title list for playlist transfer services
        #[arg(long)]
        transfer: bool,

        /// Maximum tracks in the transfer list
        #[arg(long)]
        max_tracks: Option<usize>,
    },
    /// Show how track strings normalize
    Normalize {
        /// Raw "Artist - Title" strings
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Popularity cache management
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Load configuration from args with optional config file override
fn load_config_from_args(args: &Args) -> Result<RadioChartsConfig, ConfigError> {
    let config = if let Some(config_path) = &args.config {
        RadioChartsConfig::load_with_file(Some(config_path))?
    } else {
        RadioChartsConfig::load()?
    };

    Ok(merge_args_into_config(config, args))
}

/// Merge command line arguments into the configuration
fn merge_args_into_config(mut config: RadioChartsConfig, args: &Args) -> RadioChartsConfig {
    match &args.command {
        Commands::Consolidate {
            stations_dir,
            output_dir,
            name,
            status_file,
            rank,
            no_archive,
            transfer,
            max_tracks,
            ..
        } => {
            if let Some(stations_dir) = stations_dir {
                config.paths.stations = stations_dir.clone();
            }
            if let Some(output_dir) = output_dir {
                config.paths.output = output_dir.clone();
            }
            if let Some(name) = name {
                config.output.playlist = name.clone();
            }
            if let Some(status_file) = status_file {
                config.paths.status = Some(status_file.clone());
            }
            if *rank {
                config.popularity.enabled = true;
            }
            if *no_archive {
                config.output.archive = false;
            }
            merge_transfer_args(&mut config, *transfer, *max_tracks);
        }
        Commands::Rank {
            output_dir,
            transfer,
            max_tracks,
            ..
        } => {
            if let Some(output_dir) = output_dir {
                config.paths.output = output_dir.clone();
            }
            merge_transfer_args(&mut config, *transfer, *max_tracks);
        }
        Commands::Normalize { .. } | Commands::Cache(_) => {}
    }

    if let Some(cache_file) = &args.cache_file {
        config.paths.cache = cache_file.clone();
    }

    config
}

/// `--max-tracks` alone also turns the transfer export on
fn merge_transfer_args(
    config: &mut RadioChartsConfig,
    transfer: bool,
    max_tracks: Option<usize>,
) {
    if transfer || max_tracks.is_some() {
        config.output.transfer = true;
    }
    if let Some(max_tracks) = max_tracks {
        config.output.limit = Some(max_tracks);
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config =
        load_config_from_args(&args).map_err(|e| format!("Failed to load configuration: {e}"))?;

    match &args.command {
        Commands::Consolidate { language, date, .. } => {
            let date = date.unwrap_or_else(today);
            consolidate(&config, language.clone(), date).await
        }
        Commands::Rank { source, name, .. } => {
            rank_playlist(&config, source, name.as_deref(), today()).await
        }
        Commands::Normalize { text } => {
            show_normalized(text);
            Ok(())
        }
        Commands::Cache(CacheCommands::Show { limit }) => show_cache(&config, *limit),
        Commands::Cache(CacheCommands::Clear) => clear_cache(&config),
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
