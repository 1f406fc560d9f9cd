use std::collections::BTreeSet;

use ppsweep_core::{
    plan_experiment, ArtifactKind, ExecutionMode, ExperimentConfig, MakefileRenderer,
    StreamRef, SweepError, TaskGraphRenderer, WriteMode,
};

fn config(json: &str) -> ExperimentConfig {
    ExperimentConfig::from_json_str(json).expect("valid config")
}

const GRID: &str = r#"{
    "filters": [
        {"filter": "microaggregation.MicroAggregationFilter",
         "params": [
            {"name": "k", "values": [3, 5]},
            {"name": "eps", "values": [0.1, 0.2, 0.3]}
         ]}
    ],
    "streams": ["streams/waveform.arff", "generators.AgrawalGenerator -p 0.0"],
    "options": {"maximumInstances": 10000}
}"#;

// ── Immediate mode ────────────────────────────────────────────────────────

#[test]
fn immediate_plan_covers_full_grid_with_distinct_names() {
    let config = config(GRID);
    let codec = config.codec().unwrap();
    let plan = plan_experiment(&config, &codec, ExecutionMode::Immediate).unwrap();

    assert_eq!(plan.len(), 12);
    assert!(plan.task_graph.is_none());

    let names: BTreeSet<&str> = plan
        .entries
        .iter()
        .map(|e| e.base_filename.as_str())
        .collect();
    assert_eq!(names.len(), 12);

    let reports: BTreeSet<_> = plan
        .entries
        .iter()
        .filter_map(|e| e.output(ArtifactKind::Report))
        .collect();
    assert_eq!(reports.len(), 12);
}

#[test]
fn immediate_plan_orders_filter_assignment_stream_tier() {
    let config = config(GRID);
    let codec = config.codec().unwrap();
    let plan = plan_experiment(&config, &codec, ExecutionMode::Immediate).unwrap();

    let agrawal = StreamRef::new("generators.AgrawalGenerator -p 0.0").short_name();
    let first: Vec<&str> = plan
        .entries
        .iter()
        .take(3)
        .map(|e| e.base_filename.as_str())
        .collect();
    assert_eq!(
        first,
        vec![
            "ma~k=3~eps=0.1+waveform@10000".to_string(),
            format!("ma~k=3~eps=0.1+{agrawal}@10000"),
            "ma~k=3~eps=0.2+waveform@10000".to_string(),
        ]
    );
}

#[test]
fn planning_is_deterministic() {
    let config = config(GRID);
    let codec = config.codec().unwrap();
    let a = plan_experiment(&config, &codec, ExecutionMode::Immediate).unwrap();
    let b = plan_experiment(&config, &codec, ExecutionMode::Immediate).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.digest(), b.digest());
}

#[test]
fn immediate_entry_point_rejects_scalability_document() {
    let mut config = config(GRID);
    config.is_scalability = true;
    let codec = config.codec().unwrap();
    let err = plan_experiment(&config, &codec, ExecutionMode::Immediate).unwrap_err();
    assert!(matches!(err, SweepError::Configuration(_)));
}

#[test]
fn generator_variants_get_distinct_names() {
    let config = config(
        r#"{
            "filters": [
                {"filter": "microaggregation.MicroAggregationFilter",
                 "params": [{"name": "k", "values": [3]}]}
            ],
            "streams": ["generators.AgrawalGenerator -p 0.0", "generators.AgrawalGenerator -p 0.5"],
            "options": {"maximumInstances": 1000}
        }"#,
    );
    let codec = config.codec().unwrap();
    let plan = plan_experiment(&config, &codec, ExecutionMode::Immediate).unwrap();

    assert_eq!(plan.len(), 2);
    assert_ne!(plan.entries[0].base_filename, plan.entries[1].base_filename);
    assert_ne!(
        plan.entries[0].output(ArtifactKind::Report),
        plan.entries[1].output(ArtifactKind::Report)
    );
}

#[test]
fn duplicate_stream_is_rejected() {
    let config = config(
        r#"{
            "filters": [
                {"filter": "microaggregation.MicroAggregationFilter",
                 "params": [{"name": "k", "values": [3]}]}
            ],
            "streams": ["streams/waveform.arff", "streams/waveform.arff"],
            "options": {"maximumInstances": 1000}
        }"#,
    );
    let codec = config.codec().unwrap();
    let err = plan_experiment(&config, &codec, ExecutionMode::Immediate).unwrap_err();
    assert!(matches!(err, SweepError::Configuration(_)));
    assert!(err.to_string().contains("ma~k=3+waveform@1000"));
}

// ── Deferred parallel mode ────────────────────────────────────────────────

#[test]
fn deferred_plan_renders_numbered_tasks_and_aggregate_target() {
    let config = config(
        r#"{
            "filters": [
                {"filter": "noiseaddition.NoiseAdditionFilter",
                 "params": [{"name": "a", "values": [0.1, 0.2, 0.3, 0.4, 0.5]}]}
            ],
            "streams": ["streams/agrawal.arff"],
            "options": {"maximumInstances": [1000]}
        }"#,
    );
    let codec = config.codec().unwrap();
    let plan = plan_experiment(&config, &codec, ExecutionMode::DeferredParallel).unwrap();
    assert_eq!(plan.len(), 5);

    let graph = plan.task_graph.as_ref().expect("deferred plan has a task graph");
    let text = MakefileRenderer.render(graph).unwrap();
    for n in 1..=5 {
        assert!(text.contains(&format!("\n{n}:\n\t")) || text.starts_with(&format!("{n}:\n\t")));
    }
    assert_eq!(text.lines().last(), Some("all: 1 2 3 4 5"));

    for entry in &plan.entries {
        let log = entry.output(ArtifactKind::Log).expect("log output");
        assert!(log.starts_with("logs"));
        assert!(entry.command.ends_with("2>&1"));
    }
}

// ── Scalability mode ──────────────────────────────────────────────────────

#[test]
fn scalability_groups_have_one_overwrite_then_appends() {
    let config = config(
        r#"{
            "isScalability": true,
            "replicas": 3,
            "filters": [
                {"filter": "microaggregation.MicroAggregationFilter",
                 "discriminantParameter": "k",
                 "params": [
                    {"name": "k", "values": [3, 5, 7, 9]},
                    {"name": "eps", "values": [0.1, 0.2]}
                 ]}
            ],
            "streams": ["streams/waveform.arff"],
            "options": {"maximumInstances": [1000, 2000]}
        }"#,
    );
    let codec = config.codec().unwrap();
    let plan = plan_experiment(&config, &codec, ExecutionMode::ScalabilityAccumulate).unwrap();

    // 2 eps values x 2 tiers = 4 groups, each 4 values x 3 replicas.
    assert_eq!(plan.len(), 4 * 4 * 3);

    let mut groups = std::collections::BTreeMap::new();
    for entry in &plan.entries {
        let acc = entry.accumulation().expect("scalability entry");
        groups
            .entry(acc.group_key.clone())
            .or_insert_with(Vec::new)
            .push(acc.write_mode());
    }
    assert_eq!(groups.len(), 4);
    for modes in groups.values() {
        assert_eq!(modes.len(), 12);
        assert_eq!(modes[0], WriteMode::Overwrite);
        assert!(modes[1..].iter().all(|m| *m == WriteMode::Append));
    }

    let bases: BTreeSet<&str> = plan
        .entries
        .iter()
        .map(|e| e.base_filename.as_str())
        .collect();
    assert_eq!(bases.len(), plan.len());
    assert!(bases.contains("ma~k=3~eps=0.1+waveform@1000.r2"));
}

#[test]
fn scalability_summary_accumulates_header_plus_one_line_per_run() {
    let config = config(
        r#"{
            "isScalability": true,
            "replicas": 2,
            "filters": [
                {"filter": "rankswapping.RankSwappingFilter",
                 "discriminantParameter": "p",
                 "params": [{"name": "p", "values": [5, 10, 15]}]}
            ],
            "streams": ["streams/waveform.arff"],
            "options": {"maximumInstances": 1000}
        }"#,
    );
    let codec = config.codec().unwrap();
    let plan = plan_experiment(&config, &codec, ExecutionMode::ScalabilityAccumulate).unwrap();

    let summary = "summary,param,time\ncsv,-,1.5\n";
    let mut file = String::new();
    for entry in &plan.entries {
        let acc = entry.accumulation().unwrap();
        let chunk = acc.transform(summary).unwrap();
        match acc.write_mode() {
            WriteMode::Overwrite => file = chunk,
            WriteMode::Append => file.push_str(&chunk),
        }
    }

    let lines: Vec<&str> = file.lines().collect();
    assert_eq!(lines.len(), 1 + 3 * 2);
    assert_eq!(lines[0], "summary,p,time");
    let values: Vec<&str> = lines[1..]
        .iter()
        .map(|l| l.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(values, vec!["5", "5", "10", "10", "15", "15"]);
}

#[test]
fn scalability_requires_declared_discriminant() {
    let config = config(
        r#"{
            "isScalability": true,
            "filters": [
                {"filter": "rankswapping.RankSwappingFilter",
                 "discriminantParameter": "q",
                 "params": [{"name": "p", "values": [5]}]}
            ],
            "streams": ["s.arff"],
            "options": {"maximumInstances": 10}
        }"#,
    );
    let codec = config.codec().unwrap();
    let err = plan_experiment(&config, &codec, ExecutionMode::ScalabilityAccumulate).unwrap_err();
    assert!(matches!(err, SweepError::MissingDiscriminant { .. }));
}
