//! Shell tasks derived from plan entries.

use ppsweep_core::PlanEntry;
use serde::{Deserialize, Serialize};

/// One shell command to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Human-readable task name (the entry's base filename).
    pub name: String,

    /// Full command line, handed to `sh -c`.
    pub command: String,

    /// Capture stdout/stderr instead of passing them through.
    pub capture_output: bool,

    /// Timeout in seconds; 0 waits forever.
    pub timeout_secs: u64,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            capture_output: false,
            timeout_secs: 0,
        }
    }

    /// Task for a plan entry. Output is captured only when the entry
    /// accumulates its summary into a group file.
    pub fn from_entry(entry: &PlanEntry, timeout_secs: u64) -> Self {
        Self {
            name: entry.base_filename.clone(),
            command: entry.command.clone(),
            capture_output: entry.accumulation().is_some(),
            timeout_secs,
        }
    }

    pub fn captured(mut self) -> Self {
        self.capture_output = true;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
