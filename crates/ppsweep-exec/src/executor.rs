//! Sweep execution: run every plan entry, fold scalability summaries.

use crate::runner::{CommandRunner, TaskResult};
use crate::task::TaskConfig;
use anyhow::Context;
use ppsweep_core::{commands_digest, Accumulation, GroupKey, PlanEntry, WriteMode};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// What happened to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Passed,
    /// The command could not run, exited non-zero, or its summary could not
    /// be accumulated.
    Failed(String),
    /// Dry run.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub base_filename: String,
    pub command: String,
    pub status: EntryStatus,
    /// `None` when the command never ran.
    pub result: Option<TaskResult>,
}

/// Result of executing a whole plan.
#[derive(Debug, Clone)]
pub struct SweepResult {
    /// Whether every entry passed (always true for a dry run).
    pub success: bool,

    pub entries: Vec<EntryOutcome>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Digest of the ordered commands.
    pub plan_digest: String,
}

impl SweepResult {
    pub fn passed_count(&self) -> usize {
        self.count(|s| *s == EntryStatus::Passed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Failed(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| *s == EntryStatus::Skipped)
    }

    fn count(&self, pred: impl Fn(&EntryStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// Runs plan entries one after the other. A failed entry is recorded and
/// the sweep moves on.
pub struct SweepExecutor<R> {
    runner: R,
    dry_run: bool,
    timeout_secs: u64,
}

impl<R: CommandRunner> SweepExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            dry_run: false,
            timeout_secs: 0,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub async fn execute(&self, entries: &[PlanEntry]) -> anyhow::Result<SweepResult> {
        let start = Instant::now();
        let plan_digest = commands_digest(entries.iter().map(|e| e.command.as_str()));

        if self.dry_run {
            let outcomes = entries
                .iter()
                .map(|entry| {
                    info!(base = %entry.base_filename, command = %entry.command, "[DRY RUN] would execute");
                    EntryOutcome {
                        base_filename: entry.base_filename.clone(),
                        command: entry.command.clone(),
                        status: EntryStatus::Skipped,
                        result: None,
                    }
                })
                .collect();
            info!(entries = entries.len(), digest = %plan_digest, "dry run complete");
            return Ok(SweepResult {
                success: true,
                entries: outcomes,
                duration_ms: start.elapsed().as_millis() as u64,
                plan_digest,
            });
        }

        create_output_dirs(entries).await?;

        // Groups whose file already holds this sweep's header.
        let mut headed: HashSet<GroupKey> = HashSet::new();
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            info!(base = %entry.base_filename, command = %entry.command, "Executing");
            let task = TaskConfig::from_entry(entry, self.timeout_secs);

            let (status, result) = match self.runner.run(&task).await {
                Err(e) => {
                    warn!(base = %entry.base_filename, error = %e, "entry could not run");
                    (EntryStatus::Failed(e.to_string()), None)
                }
                Ok(result) if !result.passed() => {
                    warn!(
                        base = %entry.base_filename,
                        exit_code = result.exit_code,
                        "entry exited with failure"
                    );
                    let reason = format!("exited with code {}", result.exit_code);
                    (EntryStatus::Failed(reason), Some(result))
                }
                Ok(result) => {
                    let status = match entry.accumulation() {
                        Some(acc) => {
                            // The first step that succeeds writes the header, even
                            // when earlier steps of the group failed.
                            let step = Accumulation {
                                is_first_in_group: !headed.contains(&acc.group_key),
                                ..acc.clone()
                            };
                            match accumulate(&step, &result.stdout).await {
                                Ok(()) => {
                                    headed.insert(acc.group_key.clone());
                                    EntryStatus::Passed
                                }
                                Err(e) => {
                                    warn!(base = %entry.base_filename, error = %e, "summary not accumulated");
                                    EntryStatus::Failed(format!("{e:#}"))
                                }
                            }
                        }
                        None => EntryStatus::Passed,
                    };
                    (status, Some(result))
                }
            };

            outcomes.push(EntryOutcome {
                base_filename: entry.base_filename.clone(),
                command: entry.command.clone(),
                status,
                result,
            });
        }

        let sweep = SweepResult {
            success: outcomes.iter().all(|o| o.status == EntryStatus::Passed),
            entries: outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
            plan_digest,
        };
        info!(
            passed = sweep.passed_count(),
            failed = sweep.failed_count(),
            duration_ms = sweep.duration_ms,
            "sweep finished"
        );
        Ok(sweep)
    }
}

async fn create_output_dirs(entries: &[PlanEntry]) -> anyhow::Result<()> {
    let dirs: BTreeSet<PathBuf> = entries
        .iter()
        .flat_map(|e| e.outputs.values())
        .filter_map(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect();
    for dir in dirs {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }
    Ok(())
}

/// Fold one step's summary into its group file.
pub async fn accumulate(acc: &Accumulation, stdout: &str) -> anyhow::Result<()> {
    let chunk = acc
        .transform(stdout)
        .with_context(|| format!("reading engine summary for group {}", acc.group_key))?;

    if let Some(parent) = acc.target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    match acc.write_mode() {
        WriteMode::Overwrite => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };
    let mut file = options
        .open(&acc.target)
        .await
        .with_context(|| format!("opening {}", acc.target.display()))?;
    file.write_all(chunk.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
