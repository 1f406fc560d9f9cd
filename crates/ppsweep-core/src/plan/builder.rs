//! Engine invocations for every (filter assignment, stream, instances) tuple.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info};

use super::accumulate::{Accumulation, GroupKey};
use super::entry::{EntryMode, ExecutionMode, ExperimentPlan, PlanEntry};
use super::task_graph::TaskGraph;
use crate::codec::FilterCodec;
use crate::config::{ExperimentConfig, RunOptions};
use crate::domain::error::{Result, SweepError};
use crate::domain::filter::{FilterSpec, ParamValue, ParameterAssignment};
use crate::domain::stream::StreamRef;
use crate::expand::{expand, expand_with_discriminant};
use crate::naming::{ArtifactKind, NamingScheme};

/// One replica of one discriminant value within a scalability group.
#[derive(Debug, Clone, Copy)]
pub struct ScalabilityStep<'s> {
    pub stream: &'s StreamRef,
    pub filter: &'s FilterSpec,
    /// Non-discriminant parameters, held fixed across the group.
    pub assignment: &'s ParameterAssignment,
    pub discriminant: &'s str,
    pub value: &'s ParamValue,
    pub instances: u64,
    pub replica: u32,
    pub replicas: u32,
    pub is_first_in_group: bool,
}

/// Builds plan entries from run options.
#[derive(Debug, Clone, Copy)]
pub struct PlanBuilder<'a> {
    naming: NamingScheme<'a>,
    options: &'a RunOptions,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(codec: &'a FilterCodec, options: &'a RunOptions) -> Self {
        Self {
            naming: NamingScheme::new(codec, options.naming),
            options,
        }
    }

    pub fn build_immediate(
        &self,
        stream: &StreamRef,
        filter: &FilterSpec,
        assignment: &ParameterAssignment,
        instances: u64,
    ) -> Result<PlanEntry> {
        let base = self
            .naming
            .base_filename(stream, filter, assignment, Some(instances))?;
        let (task_opts, outputs) = self.task_options(&base, instances, false);
        let command = self.render_command(stream, filter, assignment, &task_opts, false);
        Ok(PlanEntry {
            base_filename: base,
            command,
            outputs,
            mode: EntryMode::Immediate,
        })
    }

    /// Same command as [`PlanBuilder::build_immediate`], redirected to a log
    /// file and appended to `graph` instead of being run.
    pub fn build_deferred(
        &self,
        graph: &mut TaskGraph,
        stream: &StreamRef,
        filter: &FilterSpec,
        assignment: &ParameterAssignment,
        instances: u64,
    ) -> Result<PlanEntry> {
        let mut entry = self.build_immediate(stream, filter, assignment, instances)?;
        let log = NamingScheme::artifact_path(
            &self.options.log_directory,
            &entry.base_filename,
            ArtifactKind::Log.extension(),
        );
        entry.command = format!("{} > {} 2>&1", entry.command, log.display());
        entry.outputs.insert(ArtifactKind::Log, log);
        let task = graph.push(entry.command.clone());
        entry.mode = EntryMode::DeferredParallel { task };
        Ok(entry)
    }

    pub fn build_scalability_step(&self, step: &ScalabilityStep<'_>) -> Result<PlanEntry> {
        let group_base = self.naming.base_filename(
            step.stream,
            step.filter,
            step.assignment,
            Some(step.instances),
        )?;
        let full = step
            .filter
            .assignment_with(step.assignment, step.discriminant, step.value);
        let step_base = NamingScheme::replica_base(
            &self
                .naming
                .base_filename(step.stream, step.filter, &full, Some(step.instances))?,
            step.replica,
            step.replicas,
        );

        let (task_opts, mut outputs) = self.task_options(&step_base, step.instances, true);
        let command = self.render_command(step.stream, step.filter, &full, &task_opts, true);

        let target = NamingScheme::artifact_path(
            &self.options.scalability_directory,
            &group_base,
            ArtifactKind::Scalability.extension(),
        );
        outputs.insert(ArtifactKind::Scalability, target.clone());

        Ok(PlanEntry {
            base_filename: step_base,
            command,
            outputs,
            mode: EntryMode::ScalabilityAccumulate(Accumulation {
                group_key: GroupKey::new(group_base),
                is_first_in_group: step.is_first_in_group,
                target,
                discriminant: step.discriminant.to_string(),
                value: step.value.clone(),
                replica: step.replica,
            }),
        })
    }

    /// Output-control flags and the paths they write to.
    ///
    /// Silenced artifacts contribute neither a flag nor a path.
    fn task_options(
        &self,
        base: &str,
        instances: u64,
        scalability: bool,
    ) -> (Vec<String>, BTreeMap<ArtifactKind, PathBuf>) {
        let opts = self.options;
        let mut flags = vec!["-m".to_string(), instances.to_string()];
        let mut outputs = BTreeMap::new();

        if opts.report.summarize || scalability {
            flags.push("-z".to_string());
        }
        if !opts.report.silence {
            let path = NamingScheme::artifact_path(
                &opts.report.directory,
                base,
                ArtifactKind::Report.extension(),
            );
            flags.push("-r".to_string());
            flags.push(path.display().to_string());
            outputs.insert(ArtifactKind::Report, path);
        }

        if !opts.anonymization.silence {
            if opts.anonymization.suppress_header {
                flags.push("-h".to_string());
            }
            let path = NamingScheme::artifact_path(
                &opts.anonymization.directory,
                base,
                ArtifactKind::Anonymized.extension(),
            );
            flags.push("-a".to_string());
            flags.push(path.display().to_string());
            outputs.insert(ArtifactKind::Anonymized, path);
        }

        if !opts.evaluation.silence {
            let path = NamingScheme::artifact_path(
                &opts.evaluation.directory,
                base,
                ArtifactKind::Evaluation.extension(),
            );
            flags.push("-u".to_string());
            flags.push(opts.evaluation.update_rate.to_string());
            flags.push("-e".to_string());
            flags.push(path.display().to_string());
            outputs.insert(ArtifactKind::Evaluation, path);
        }

        if !opts.throughput.silence {
            let path = NamingScheme::artifact_path(
                &opts.throughput.directory,
                base,
                ArtifactKind::Throughput.extension(),
            );
            flags.push("-t".to_string());
            flags.push(path.display().to_string());
            flags.push("-U".to_string());
            flags.push(opts.throughput.update_rate.to_string());
            outputs.insert(ArtifactKind::Throughput, path);
        }

        (flags, outputs)
    }

    fn render_command(
        &self,
        stream: &StreamRef,
        filter: &FilterSpec,
        assignment: &ParameterAssignment,
        task_opts: &[String],
        scalability: bool,
    ) -> String {
        let engine = &self.options.engine;
        let mut filter_spec = filter.name.clone();
        if !assignment.is_empty() {
            filter_spec.push(' ');
            filter_spec.push_str(&assignment.to_flags());
        }
        let launcher = if scalability && !engine.scalability_flag.is_empty() {
            format!("{} {}", engine.launcher, engine.scalability_flag)
        } else {
            engine.launcher.clone()
        };
        format!(
            "{} \"{} -s ({}) -f ({}) {}\"",
            launcher,
            engine.task,
            stream.spec(),
            filter_spec,
            task_opts.join(" ")
        )
    }
}

/// Generate every entry of `config` for `mode`.
///
/// Order: filter, parameter assignment, stream, instance tier (and, for
/// scalability runs, discriminant value then replica).
pub fn plan_experiment(
    config: &ExperimentConfig,
    codec: &FilterCodec,
    mode: ExecutionMode,
) -> Result<ExperimentPlan> {
    config.ensure_scalability(mode == ExecutionMode::ScalabilityAccumulate)?;
    let builder = PlanBuilder::new(codec, &config.options);
    let tiers = &config.options.maximum_instances;

    let plan = match mode {
        ExecutionMode::Immediate => {
            let mut entries = Vec::new();
            for filter in &config.filters {
                for assignment in expand(filter) {
                    for stream in &config.streams {
                        for &instances in tiers {
                            let entry =
                                builder.build_immediate(stream, filter, &assignment, instances)?;
                            debug!(base = %entry.base_filename, "planned entry");
                            entries.push(entry);
                        }
                    }
                }
            }
            ExperimentPlan {
                mode,
                entries,
                task_graph: None,
            }
        }
        ExecutionMode::DeferredParallel => {
            let mut graph = TaskGraph::new();
            let mut entries = Vec::new();
            for filter in &config.filters {
                for assignment in expand(filter) {
                    for stream in &config.streams {
                        for &instances in tiers {
                            let entry = builder.build_deferred(
                                &mut graph,
                                stream,
                                filter,
                                &assignment,
                                instances,
                            )?;
                            debug!(base = %entry.base_filename, "queued task");
                            entries.push(entry);
                        }
                    }
                }
            }
            ExperimentPlan {
                mode,
                entries,
                task_graph: Some(graph.finalize()),
            }
        }
        ExecutionMode::ScalabilityAccumulate => {
            let mut entries = Vec::new();
            for filter in &config.filters {
                for sweep in expand_with_discriminant(filter)? {
                    for stream in &config.streams {
                        for &instances in tiers {
                            let mut first = true;
                            for value in &sweep.values {
                                for replica in 1..=config.replicas {
                                    let step = ScalabilityStep {
                                        stream,
                                        filter,
                                        assignment: &sweep.assignment,
                                        discriminant: &sweep.discriminant,
                                        value,
                                        instances,
                                        replica,
                                        replicas: config.replicas,
                                        is_first_in_group: first,
                                    };
                                    entries.push(builder.build_scalability_step(&step)?);
                                    first = false;
                                }
                            }
                        }
                    }
                }
            }
            ExperimentPlan {
                mode,
                entries,
                task_graph: None,
            }
        }
    };

    ensure_distinct_names(&plan.entries)?;
    info!(mode = %mode, entries = plan.len(), "experiment planned");
    Ok(plan)
}

/// Two entries sharing a base filename would overwrite each other's artifacts.
fn ensure_distinct_names(entries: &[PlanEntry]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for entry in entries {
        if !seen.insert(entry.base_filename.as_str()) {
            return Err(SweepError::config(format!(
                "two plan entries share the base filename {}",
                entry.base_filename
            )));
        }
    }
    Ok(())
}
