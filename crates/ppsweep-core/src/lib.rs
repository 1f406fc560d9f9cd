//! ppsweep Core Library
//!
//! Plans anonymization experiment sweeps for an external stream engine and
//! reads the resulting reports back. Nothing here spawns processes; see
//! `ppsweep-exec` for that.

pub mod codec;
pub mod config;
pub mod domain;
pub mod expand;
pub mod naming;
pub mod plan;
pub mod report;
pub mod streams;
pub mod telemetry;

pub use codec::FilterCodec;

pub use config::{
    AnonymizationOptions, EngineOptions, ExperimentConfig, MetricOptions, ReportOptions,
    RunOptions,
};

pub use domain::{
    commands_digest, FilterSpec, ParamSpec, ParamValue, ParameterAssignment, Result, StreamKind,
    StreamRef, SweepError,
};

pub use expand::{expand, expand_with_discriminant, DiscriminantSweep};

pub use naming::{ArtifactKind, NamingConvention, NamingScheme};

pub use plan::{
    plan_experiment, Accumulation, EntryMode, ExecutionMode, ExperimentPlan, FinalizedTaskGraph,
    GroupKey, JsonTaskListRenderer, MakefileRenderer, PlanBuilder, PlanEntry, ScalabilityStep,
    Task, TaskGraph, TaskGraphRenderer, TaskId, WriteMode, SUMMARY_MARKER,
};

pub use report::{
    aggregate_reports, plan_report_dumps, to_csv, Aggregation, Decimal, ReportFailure,
    ReportParser, ReportRecord,
};

pub use streams::{builtin_generators, plan_stream_generation, GeneratorSpec, DEFAULT_TIERS};
