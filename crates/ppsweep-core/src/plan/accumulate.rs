//! Scalability accumulation: one CSV file per group of discriminant steps.
//!
//! The engine prints a short summary when launched with its scalability
//! flag:
//!
//! ```text
//! <label>,<token>,<metric>,...
//! csv,<value>,<metric>,...
//! ```
//!
//! The first step of a group rewrites `<token>` to the discriminant name and
//! `<value>` to the discriminant value, then overwrites the group file with
//! both lines. Later steps only append the rewritten data line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::domain::error::{Result, SweepError};
use crate::domain::filter::ParamValue;

/// Literal that identifies the data line in the engine summary.
pub const SUMMARY_MARKER: &str = "csv,";

/// Identifies the accumulation file a step targets (filter assignment
/// without the discriminant, stream and instances).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Overwrite,
    Append,
}

/// How one scalability step contributes to its group file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulation {
    pub group_key: GroupKey,
    pub is_first_in_group: bool,
    pub target: PathBuf,
    pub discriminant: String,
    pub value: ParamValue,
    /// 1-based replica number within the discriminant value.
    pub replica: u32,
}

impl Accumulation {
    pub fn write_mode(&self) -> WriteMode {
        if self.is_first_in_group {
            WriteMode::Overwrite
        } else {
            WriteMode::Append
        }
    }

    /// Text to write to [`Accumulation::target`] for the given engine output.
    pub fn transform(&self, summary: &str) -> Result<String> {
        let lines: Vec<&str> = summary.lines().collect();
        let data_idx = lines
            .iter()
            .position(|line| line.contains(SUMMARY_MARKER))
            .ok_or_else(|| SweepError::MissingSummary {
                part: "data".to_string(),
            })?;

        let data_line = lines[data_idx];
        let start = data_line.find(SUMMARY_MARKER).unwrap_or(0);
        let data = rewrite_field(data_line[start..].trim_end(), self.value.as_str());

        if !self.is_first_in_group {
            return Ok(format!("{data}\n"));
        }

        let header_line = lines[..data_idx]
            .iter()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| SweepError::MissingSummary {
                part: "header".to_string(),
            })?;
        let header = rewrite_field(header_line.trim(), &self.discriminant);
        Ok(format!("{header}\n{data}\n"))
    }
}

/// Replace comma-separated field 1 (the token after the label).
fn rewrite_field(line: &str, replacement: &str) -> String {
    let mut fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 2 {
        fields.push(replacement);
    } else {
        fields[1] = replacement;
    }
    fields.join(",")
}
