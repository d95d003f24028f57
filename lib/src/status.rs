//! The orchestrator's `last_update.json`, read to learn which stations had
//! no playlist on the run date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Cannot read status file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed status file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusArtifact {
    pub date: NaiveDate,
    #[serde(default)]
    pub stations_total: usize,
    #[serde(default)]
    pub stations_completed: Vec<String>,
    #[serde(default)]
    pub stations_partial: Vec<String>,
    #[serde(default)]
    pub stations_missing: Vec<String>,
    #[serde(default)]
    pub stations_no_playlist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    /// Local time as the orchestrator wrote it (`YYYY-MM-DD HH:MM:SS`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

impl StatusArtifact {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StatusError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| StatusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StatusError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Stations to leave out of aggregation
    pub fn excluded_stations(&self) -> BTreeSet<String> {
        self.stations_no_playlist.iter().cloned().collect()
    }

    /// Stations still worth retrying: missing or partial, but not known to have no playlist
    pub fn retry_candidates(&self) -> BTreeSet<String> {
        let excluded = self.excluded_stations();
        self.stations_missing
            .iter()
            .chain(&self.stations_partial)
            .filter(|station| !excluded.contains(*station))
            .cloned()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.stations_completed.len() + self.stations_no_playlist.len() >= self.stations_total
    }
}

/// Station filtering for one run, taken from the status file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunExclusions {
    /// Stations with no playlist on the run date
    pub excluded: BTreeSet<String>,
    /// Stations whose scrape has not finished yet; their exports may be stale
    pub pending: BTreeSet<String>,
}

/// Read the status file for a run on `date`. A file for another date, or one
/// that cannot be read, excludes nothing.
pub fn exclusions_for_run<P: AsRef<Path>>(path: P, date: NaiveDate) -> RunExclusions {
    let status = match StatusArtifact::load(path) {
        Ok(status) => status,
        Err(e) => {
            log::warn!("{e}; excluding no stations");
            return RunExclusions::default();
        }
    };
    if status.date != date {
        log::warn!(
            "Status file is for {}, not {date}; excluding no stations",
            status.date
        );
        return RunExclusions::default();
    }

    let excluded = status.excluded_stations();
    if !excluded.is_empty() {
        log::info!("No playlist today for: {}", join(&excluded));
    }

    let pending = if status.is_complete() {
        BTreeSet::new()
    } else {
        status.retry_candidates()
    };
    if !pending.is_empty() {
        log::warn!(
            "Scrape for {date} is incomplete, exports may be stale for: {}",
            join(&pending)
        );
    }

    RunExclusions { excluded, pending }
}

fn join(stations: &BTreeSet<String>) -> String {
    stations.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
