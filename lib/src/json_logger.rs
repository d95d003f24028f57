use crate::pipeline::RunSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// JSON log entry for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    pub event_type: RunEventType,
    /// Present when the run produced output
    pub summary: Option<RunSummary>,
    /// Error message if the run failed
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEventType {
    RunCompleted,
    RunFailed,
}

/// Appends run summaries to a JSON lines file
pub struct JsonLogger {
    log_file_path: String,
    enabled: bool,
}

impl JsonLogger {
    pub fn new(log_file_path: String, enabled: bool) -> Self {
        Self {
            log_file_path,
            enabled,
        }
    }

    pub fn log_run_event(&self, entry: &RunLogEntry) -> Result<(), Box<dyn std::error::Error>> {
        if !self.enabled {
            return Ok(());
        }

        if let Some(parent) = Path::new(&self.log_file_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)?;

        let json_line = serde_json::to_string(entry)?;
        writeln!(file, "{json_line}")?;

        log::trace!("Logged run event to {}", self.log_file_path);
        Ok(())
    }

    pub fn log_run_completed(&self, summary: &RunSummary) -> Result<(), Box<dyn std::error::Error>> {
        self.log_run_event(&RunLogEntry {
            timestamp: Utc::now(),
            event_type: RunEventType::RunCompleted,
            summary: Some(summary.clone()),
            error: None,
        })
    }

    pub fn log_run_failed(&self, error: String) -> Result<(), Box<dyn std::error::Error>> {
        self.log_run_event(&RunLogEntry {
            timestamp: Utc::now(),
            event_type: RunEventType::RunFailed,
            summary: None,
            error: Some(error),
        })
    }
}
