//! Execution plans: what to run, where its output goes, and how.

pub mod accumulate;
pub mod builder;
pub mod entry;
pub mod task_graph;

pub use accumulate::{Accumulation, GroupKey, WriteMode, SUMMARY_MARKER};
pub use builder::{plan_experiment, PlanBuilder, ScalabilityStep};
pub use entry::{EntryMode, ExecutionMode, ExperimentPlan, PlanEntry};
pub use task_graph::{
    FinalizedTaskGraph, JsonTaskListRenderer, MakefileRenderer, Task, TaskGraph, TaskGraphRenderer,
    TaskId,
};
