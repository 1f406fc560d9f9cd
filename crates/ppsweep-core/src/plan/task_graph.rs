//! Static task lists for external schedulers.
//!
//! A [`TaskGraph`] is filled while a deferred plan is generated and then
//! consumed by [`TaskGraph::finalize`]. Only a [`FinalizedTaskGraph`] can be
//! rendered, so a task list can never be written with a partial aggregate
//! target, and nothing can be appended after it has been written.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::digest::commands_digest;
use crate::domain::error::Result;

/// 1-based task number, assigned in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u32);

impl TaskId {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub command: String,
}

/// Append-only task list under construction.
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task; ids start at 1 and are never reused.
    pub fn push(&mut self, command: impl Into<String>) -> TaskId {
        let id = TaskId(self.tasks.len() as u32 + 1);
        self.tasks.push(Task {
            id,
            command: command.into(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Close the graph. Call once every entry of the run has been generated.
    pub fn finalize(self) -> FinalizedTaskGraph {
        let digest = commands_digest(self.tasks.iter().map(|t| t.command.as_str()));
        FinalizedTaskGraph {
            tasks: self.tasks,
            digest,
        }
    }
}

/// A closed task list with its aggregate target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedTaskGraph {
    tasks: Vec<Task>,
    digest: String,
}

impl FinalizedTaskGraph {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Every task id, in generation order.
    pub fn aggregate_target(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Turns a finalized task graph into a scheduler-specific file.
pub trait TaskGraphRenderer: Send + Sync {
    /// Name of the scheduler format, for logs.
    fn format_name(&self) -> &'static str;

    fn render(&self, graph: &FinalizedTaskGraph) -> Result<String>;
}

/// `make -j N all` compatible output.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakefileRenderer;

impl TaskGraphRenderer for MakefileRenderer {
    fn format_name(&self) -> &'static str {
        "make"
    }

    fn render(&self, graph: &FinalizedTaskGraph) -> Result<String> {
        let mut out = String::new();
        for task in graph.tasks() {
            // make expands `$`; recipes need `$$` for a literal dollar.
            out.push_str(&format!("{}:\n\t{}\n", task.id, task.command.replace('$', "$$")));
        }
        let ids: Vec<String> = graph
            .aggregate_target()
            .iter()
            .map(TaskId::to_string)
            .collect();
        if ids.is_empty() {
            out.push_str("all:\n");
        } else {
            out.push_str(&format!("all: {}\n", ids.join(" ")));
        }
        Ok(out)
    }
}

/// JSON task list for schedulers that consume structured input.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTaskListRenderer;

#[derive(Serialize)]
struct JsonTaskList<'a> {
    digest: &'a str,
    tasks: &'a [Task],
    all: Vec<TaskId>,
}

impl TaskGraphRenderer for JsonTaskListRenderer {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn render(&self, graph: &FinalizedTaskGraph) -> Result<String> {
        let list = JsonTaskList {
            digest: graph.digest(),
            tasks: graph.tasks(),
            all: graph.aggregate_target(),
        };
        let mut text = serde_json::to_string_pretty(&list)?;
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(n: usize) -> FinalizedTaskGraph {
        let mut graph = TaskGraph::new();
        for i in 0..n {
            graph.push(format!("./moa.sh \"Anonymize -m {}\"", i));
        }
        graph.finalize()
    }

    #[test]
    fn test_ids_monotonic_from_one() {
        let mut graph = TaskGraph::new();
        let ids: Vec<u32> = (0..4).map(|_| graph.push("true").get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_makefile_five_tasks() {
        let text = MakefileRenderer.render(&graph_of(5)).unwrap();
        assert!(text.starts_with("1:\n\t./moa.sh"));
        assert!(text.ends_with("all: 1 2 3 4 5\n"));
        for id in 1..=5 {
            assert!(text.contains(&format!("{}:\n\t./moa.sh", id)));
        }
    }

    #[test]
    fn test_makefile_escapes_dollar() {
        let mut graph = TaskGraph::new();
        graph.push("echo $HOME");
        let text = MakefileRenderer.render(&graph.finalize()).unwrap();
        assert!(text.contains("echo $$HOME"));
    }

    #[test]
    fn test_empty_graph_renders_bare_aggregate() {
        let text = MakefileRenderer.render(&graph_of(0)).unwrap();
        assert_eq!(text, "all:\n");
    }

    #[test]
    fn test_json_task_list() {
        let graph = graph_of(3);
        let text = JsonTaskListRenderer.render(&graph).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["all"], serde_json::json!([1, 2, 3]));
        assert_eq!(value["tasks"][2]["id"], 3);
        assert_eq!(value["digest"], graph.digest());
    }

    #[test]
    fn test_digest_tracks_commands() {
        assert_eq!(graph_of(3).digest(), graph_of(3).digest());
        assert_ne!(graph_of(3).digest(), graph_of(4).digest());
    }
}
