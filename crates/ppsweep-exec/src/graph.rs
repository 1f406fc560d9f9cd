//! Writing finalized task graphs for an external scheduler.

use anyhow::Context;
use ppsweep_core::{FinalizedTaskGraph, TaskGraphRenderer};
use std::path::Path;
use tracing::info;

/// Render `graph` and write it to `path`, creating parent directories.
pub async fn write_task_graph(
    renderer: &dyn TaskGraphRenderer,
    graph: &FinalizedTaskGraph,
    path: &Path,
) -> anyhow::Result<()> {
    let text = renderer
        .render(graph)
        .with_context(|| format!("rendering {} task graph", renderer.format_name()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("writing task graph to {}", path.display()))?;

    info!(
        path = %path.display(),
        format = renderer.format_name(),
        tasks = graph.tasks().len(),
        digest = graph.digest(),
        "task graph written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppsweep_core::{JsonTaskListRenderer, MakefileRenderer, TaskGraph};

    fn graph() -> FinalizedTaskGraph {
        let mut graph = TaskGraph::new();
        graph.push("./moa.sh \"Anonymize -m 10\" > logs/a.log 2>&1");
        graph.push("./moa.sh \"Anonymize -m 20\" > logs/b.log 2>&1");
        graph.finalize()
    }

    #[tokio::test]
    async fn test_write_makefile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("tasks.mk");
        write_task_graph(&MakefileRenderer, &graph(), &path)
            .await
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("1:\n\t./moa.sh"));
        assert!(text.ends_with("all: 1 2\n"));
    }

    #[tokio::test]
    async fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let graph = graph();
        write_task_graph(&JsonTaskListRenderer, &graph, &path)
            .await
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(graph.digest()));
    }
}
