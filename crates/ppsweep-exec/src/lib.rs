//! ppsweep-exec - running sweep plans
//!
//! Executes the plans built by `ppsweep-core`:
//! - runs each entry through `sh -c`, one after the other
//! - folds scalability summaries into their group CSV files
//! - writes task graphs for deferred parallel runs

pub mod executor;
pub mod graph;
pub mod runner;
pub mod task;

// Re-export key types
pub use executor::{accumulate, EntryOutcome, EntryStatus, SweepExecutor, SweepResult};
pub use graph::write_task_graph;
pub use runner::{CommandRunner, ShellRunner, TaskResult};
pub use task::TaskConfig;
