use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "radio-charts";

/// Stations scraped by the orchestrator
pub const DEFAULT_STATIONS: [&str; 10] = [
    "NOVA",
    "P3",
    "TheVoice",
    "Radio100",
    "PartyFM",
    "RadioGlobus",
    "SkalaFM",
    "P4",
    "PopFM",
    "RBClassics",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioChartsConfig {
    pub paths: PathsConfig,
    pub stations: StationsConfig,
    pub popularity: PopularityConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the per-station playlist exports
    pub stations: String,
    /// Where consolidated CSV files are written
    pub output: String,
    /// Orchestrator status file; no exclusions when absent
    pub status: Option<String>,
    /// Popularity cache database
    pub cache: String,
    /// JSON lines log of run summaries
    pub summary: Option<String>,
    /// Superseded outputs are moved here; defaults to `{output}/Archive`
    pub archive: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Names used to attribute input files to stations
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularityConfig {
    /// Rank consolidated output by popularity
    pub enabled: bool,
    /// Per-lookup timeout in seconds
    pub timeout: u64,
    /// Pause before each network lookup, in milliseconds
    pub delay: u64,
    /// Deezer API base URL
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Playlist name used in output file names
    pub playlist: String,
    /// Move older dated outputs of the same playlist and format to the archive
    pub archive: bool,
    /// Also write the `Artist,Title` transfer export
    pub transfer: bool,
    /// Maximum tracks in the transfer export
    pub limit: Option<usize>,
}

impl PathsConfig {
    fn data_path(file: &str) -> String {
        if let Some(data_dir) = dirs::data_dir() {
            data_dir.join(APP_DIR).join(file).to_string_lossy().to_string()
        } else {
            file.to_string()
        }
    }

    /// Default popularity cache location in the XDG data directory
    pub fn get_default_cache_path() -> String {
        Self::data_path("popularity_cache.db")
    }

    pub fn get_default_summary_path() -> String {
        Self::data_path("runs.jsonl")
    }

    pub fn summary_path(&self) -> String {
        self.summary
            .clone()
            .unwrap_or_else(Self::get_default_summary_path)
    }

    pub fn archive_path(&self) -> PathBuf {
        match &self.archive {
            Some(archive) => PathBuf::from(archive),
            None => Path::new(&self.output).join("Archive"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            stations: "Outputs/Stations".to_string(),
            output: "Outputs".to_string(),
            status: None,
            cache: Self::get_default_cache_path(),
            summary: None,
            archive: None,
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            names: DEFAULT_STATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PopularityConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }
}

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: 10,
            delay: 100,
            endpoint: crate::popularity::deezer::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            playlist: "Radio_Top".to_string(),
            archive: true,
            transfer: false,
            limit: None,
        }
    }
}

impl Default for RadioChartsConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            stations: StationsConfig::default(),
            popularity: PopularityConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RadioChartsConfig {
    /// Get default configuration file paths in order of preference
    #[must_use]
    pub fn get_default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("radio-charts.toml"),
            PathBuf::from("config/radio-charts.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(APP_DIR).join("config.toml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".radio-charts.toml"));
        }

        paths
    }

    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (`RADIO_CHARTS_POPULARITY_ENABLED=true`)
    /// 2. Configuration file
    /// 3. Defaults
    ///
    /// Command line flags are applied on top by the caller.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_file::<&str>(None)
    }

    /// Load configuration with a specific config file
    pub fn load_with_file<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = builder.add_source(Config::try_from(&Self::default())?);

        if let Some(file_path) = config_file {
            let file_path = file_path.as_ref();
            if file_path.exists() {
                builder = builder.add_source(File::from(file_path));
            } else {
                log::warn!("Config file {} not found, using defaults", file_path.display());
            }
        } else if let Some(config_path) = Self::get_default_config_paths()
            .into_iter()
            .find(|path| path.exists())
        {
            log::debug!("Using config file {}", config_path.display());
            builder = builder.add_source(File::from(config_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("RADIO_CHARTS")
                .separator("_")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
