//! Plan entries and whole-experiment plans.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use super::accumulate::Accumulation;
use super::task_graph::{FinalizedTaskGraph, TaskId};
use crate::domain::digest::commands_digest;
use crate::naming::ArtifactKind;

/// How a plan is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Run every command now, one after the other.
    Immediate,
    /// Emit a task list for an external scheduler; run nothing.
    DeferredParallel,
    /// Run every step now and fold its summary into a group CSV.
    ScalabilityAccumulate,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::Immediate => "immediate",
            ExecutionMode::DeferredParallel => "deferred-parallel",
            ExecutionMode::ScalabilityAccumulate => "scalability",
        };
        f.write_str(name)
    }
}

/// Mode-specific part of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EntryMode {
    Immediate,
    DeferredParallel { task: TaskId },
    ScalabilityAccumulate(Accumulation),
}

/// One engine invocation and the files it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub base_filename: String,
    pub command: String,
    pub outputs: BTreeMap<ArtifactKind, PathBuf>,
    pub mode: EntryMode,
}

impl PlanEntry {
    pub fn output(&self, kind: ArtifactKind) -> Option<&Path> {
        self.outputs.get(&kind).map(PathBuf::as_path)
    }

    pub fn accumulation(&self) -> Option<&Accumulation> {
        match &self.mode {
            EntryMode::ScalabilityAccumulate(acc) => Some(acc),
            _ => None,
        }
    }
}

/// Every entry generated for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPlan {
    pub mode: ExecutionMode,
    pub entries: Vec<PlanEntry>,
    /// Present in deferred-parallel mode only.
    pub task_graph: Option<FinalizedTaskGraph>,
}

impl ExperimentPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 over the ordered commands.
    pub fn digest(&self) -> String {
        commands_digest(self.entries.iter().map(|e| e.command.as_str()))
    }

    /// Parent directories of every output, deduplicated and sorted.
    pub fn output_directories(&self) -> BTreeSet<PathBuf> {
        self.entries
            .iter()
            .flat_map(|e| e.outputs.values())
            .filter_map(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect()
    }
}
