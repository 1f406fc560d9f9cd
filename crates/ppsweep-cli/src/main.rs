//! ppsweep - anonymization experiment sweeps
//!
//! The `ppsweep` command drives an external stream anonymization engine
//! across filter parameter grids and reads its reports back.
//!
//! ## Commands
//!
//! - `anonymize`: run (or emit a parallel task file for) every combination
//! - `scalability`: vary one parameter and accumulate timing summaries
//! - `generate-streams`: write synthetic ARFF streams
//! - `dump-reports`: turn binary reports into text
//! - `read-reports`: aggregate dumped reports into one CSV
//! - `filters`: list known filters and their codes

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

use ppsweep_core::{
    aggregate_reports, builtin_generators, plan_experiment, plan_report_dumps,
    plan_stream_generation, EngineOptions, ExecutionMode, ExperimentConfig, FilterCodec,
    JsonTaskListRenderer, MakefileRenderer, NamingConvention, PlanEntry, ReportParser,
    TaskGraphRenderer, DEFAULT_TIERS,
};
use ppsweep_exec::{write_task_graph, EntryStatus, ShellRunner, SweepExecutor, SweepResult};

#[derive(Parser)]
#[command(name = "ppsweep")]
#[command(author = "ppsweep contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Anonymization experiment sweeps over data streams", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Anonymize every stream with every filter parameter combination
    Anonymize {
        /// Experiment configuration (JSON, or TOML with a .toml extension)
        config: PathBuf,

        /// Print the commands instead of running them
        #[arg(short = 'd', long)]
        dry_run: bool,

        /// Write a task file for an external parallel scheduler instead of running
        #[arg(short, long, value_name = "FILE")]
        parallel: Option<PathBuf>,

        /// Task file format used with --parallel
        #[arg(long, value_enum, default_value_t = GraphFormat::Make)]
        format: GraphFormat,
    },

    /// Run a scalability experiment, one CSV per parameter group
    Scalability {
        /// Experiment configuration with `isScalability: true`
        config: PathBuf,

        /// Print the commands instead of running them
        #[arg(short = 'd', long)]
        dry_run: bool,
    },

    /// Generate synthetic ARFF streams with the engine's generators
    GenerateStreams {
        /// Directory the streams are written to
        out_dir: PathBuf,

        /// Instance counts to generate (default: 10^4 to 10^7)
        #[arg(short = 'm', long = "instances", num_args = 1..)]
        instances: Vec<u64>,

        /// Engine launcher script
        #[arg(long, value_name = "PATH")]
        launcher: Option<String>,

        /// Print the commands instead of running them
        #[arg(short = 'd', long)]
        dry_run: bool,
    },

    /// Dump binary anonymization reports as text
    DumpReports {
        /// Report files to read
        #[arg(short = 'r', long = "report-files", num_args = 1.., required = true)]
        report_files: Vec<PathBuf>,

        /// Directory the dumped reports are written to
        #[arg(short = 'o', long = "out-dir")]
        out_dir: PathBuf,

        /// Engine launcher script
        #[arg(long, value_name = "PATH")]
        launcher: Option<String>,

        /// Print the commands instead of running them
        #[arg(short = 'd', long)]
        dry_run: bool,
    },

    /// Aggregate dumped reports into one CSV
    ReadReports {
        /// Dumped report files
        #[arg(short = 'r', long = "report-files", num_args = 1.., required = true)]
        report_files: Vec<PathBuf>,

        /// CSV file to write
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// Filename convention the reports were written with
        #[arg(long, default_value = "delimited")]
        naming: NamingConvention,

        #[command(flatten)]
        codes: CodecArgs,
    },

    /// List known filters and their filename codes
    Filters {
        #[command(flatten)]
        codes: CodecArgs,
    },
}

/// Filter codes registered on top of the built-in table.
#[derive(Debug, Default, clap::Args)]
struct CodecArgs {
    /// Experiment configuration whose `filterCodes` extend the table
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Extra filter code, as `<filter name>=<code>` (repeatable)
    #[arg(long = "filter-code", value_name = "NAME=CODE", value_parser = parse_filter_code)]
    filter_codes: Vec<(String, String)>,
}

impl CodecArgs {
    fn codec(&self) -> Result<FilterCodec> {
        let mut codec = match &self.config {
            Some(path) => load_config(path)?.codec()?,
            None => FilterCodec::builtin(),
        };
        for (name, code) in &self.filter_codes {
            codec
                .register(name, code)
                .with_context(|| format!("Failed to register filter code {code}"))?;
        }
        Ok(codec)
    }
}

fn parse_filter_code(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, code)) if !name.trim().is_empty() && !code.trim().is_empty() => {
            Ok((name.trim().to_string(), code.trim().to_string()))
        }
        _ => Err(format!("expected <filter name>=<code>, got '{raw}'")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GraphFormat {
    /// Makefile, run with `make -j N all`
    Make,
    /// JSON task list
    Json,
}

impl GraphFormat {
    fn renderer(self) -> Box<dyn TaskGraphRenderer> {
        match self {
            GraphFormat::Make => Box::new(MakefileRenderer),
            GraphFormat::Json => Box::new(JsonTaskListRenderer),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    ppsweep_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Anonymize {
            config,
            dry_run,
            parallel,
            format,
        } => cmd_anonymize(&config, dry_run, parallel.as_deref(), format).await,
        Commands::Scalability { config, dry_run } => cmd_scalability(&config, dry_run).await,
        Commands::GenerateStreams {
            out_dir,
            instances,
            launcher,
            dry_run,
        } => {
            let engine = engine_options(launcher);
            cmd_generate_streams(&engine, &out_dir, &instances, dry_run).await
        }
        Commands::DumpReports {
            report_files,
            out_dir,
            launcher,
            dry_run,
        } => {
            let engine = engine_options(launcher);
            cmd_dump_reports(&engine, &report_files, &out_dir, dry_run).await
        }
        Commands::ReadReports {
            report_files,
            output,
            naming,
            codes,
        } => cmd_read_reports(&codes.codec()?, &report_files, &output, naming),
        Commands::Filters { codes } => cmd_filters(&codes.codec()?),
    }
}

fn engine_options(launcher: Option<String>) -> EngineOptions {
    let mut engine = EngineOptions::default();
    if let Some(launcher) = launcher {
        engine.launcher = launcher;
    }
    engine
}

fn load_config(path: &Path) -> Result<ExperimentConfig> {
    ExperimentConfig::load(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}

/// Anonymize every combination, or write a task file for a parallel scheduler
async fn cmd_anonymize(
    config_path: &Path,
    dry_run: bool,
    parallel: Option<&Path>,
    format: GraphFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let codec = config.codec()?;

    let Some(task_file) = parallel else {
        let plan = plan_experiment(&config, &codec, ExecutionMode::Immediate)?;
        return run_entries(&plan.entries, dry_run, config.options.engine.timeout_secs).await;
    };

    let plan = plan_experiment(&config, &codec, ExecutionMode::DeferredParallel)?;
    let graph = plan
        .task_graph
        .as_ref()
        .context("deferred plan carries no task graph")?;
    let renderer = format.renderer();

    if dry_run {
        print!("{}", renderer.render(graph)?);
        return Ok(());
    }

    for dir in plan.output_directories() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    write_task_graph(renderer.as_ref(), graph, task_file).await?;

    println!("Wrote {} tasks to {}", graph.tasks().len(), task_file.display());
    println!("Plan digest: {}", graph.digest());
    if format == GraphFormat::Make {
        println!("Run with: make -f {} -j <jobs> all", task_file.display());
    }
    Ok(())
}

/// Run a scalability experiment
async fn cmd_scalability(config_path: &Path, dry_run: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let codec = config.codec()?;
    let plan = plan_experiment(&config, &codec, ExecutionMode::ScalabilityAccumulate)?;
    run_entries(&plan.entries, dry_run, config.options.engine.timeout_secs).await
}

/// Generate synthetic streams
async fn cmd_generate_streams(
    engine: &EngineOptions,
    out_dir: &Path,
    instances: &[u64],
    dry_run: bool,
) -> Result<()> {
    let tiers = if instances.is_empty() {
        DEFAULT_TIERS.to_vec()
    } else {
        instances.to_vec()
    };
    let entries = plan_stream_generation(engine, &builtin_generators(), &tiers, out_dir);
    run_entries(&entries, dry_run, 0).await
}

/// Dump binary reports as text
async fn cmd_dump_reports(
    engine: &EngineOptions,
    report_files: &[PathBuf],
    out_dir: &Path,
    dry_run: bool,
) -> Result<()> {
    let entries = plan_report_dumps(engine, report_files, out_dir);
    run_entries(&entries, dry_run, 0).await
}

/// Aggregate dumped reports into a CSV file
fn cmd_read_reports(
    codec: &FilterCodec,
    report_files: &[PathBuf],
    output: &Path,
    naming: NamingConvention,
) -> Result<()> {
    let parser = ReportParser::new(codec, naming)?;
    let aggregation = aggregate_reports(&parser, report_files);

    if aggregation.records.is_empty() {
        anyhow::bail!(
            "None of the {} report files could be read",
            report_files.len()
        );
    }

    let csv = aggregation.to_csv()?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(output, csv)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        records = aggregation.records.len(),
        skipped = aggregation.failures.len(),
        output = %output.display(),
        "reports aggregated"
    );
    println!(
        "Wrote {} records to {}",
        aggregation.records.len(),
        output.display()
    );
    if !aggregation.failures.is_empty() {
        println!("Skipped {} files:", aggregation.failures.len());
        for failure in &aggregation.failures {
            println!("  ✗ {}: {}", failure.path.display(), failure.error);
        }
    }
    Ok(())
}

/// Print the filter codec table
fn cmd_filters(codec: &FilterCodec) -> Result<()> {
    for (name, code) in codec.entries() {
        println!("{:<4} {}", code, name);
    }
    Ok(())
}

async fn run_entries(entries: &[PlanEntry], dry_run: bool, timeout_secs: u64) -> Result<()> {
    let executor = SweepExecutor::new(ShellRunner)
        .dry_run(dry_run)
        .timeout_secs(timeout_secs);
    let result = executor
        .execute(entries)
        .await
        .context("Sweep failed to run")?;

    if dry_run {
        for outcome in &result.entries {
            println!("{}", outcome.command);
        }
        println!();
        println!("{} commands, plan digest {}", result.entries.len(), result.plan_digest);
        return Ok(());
    }

    print_summary(&result);
    if result.success {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} entries failed",
            result.failed_count(),
            result.entries.len()
        )
    }
}

fn print_summary(result: &SweepResult) {
    println!();
    println!("Status: {}", if result.success { "✓ PASSED" } else { "✗ FAILED" });
    println!("Duration: {}ms", result.duration_ms);
    println!("Plan digest: {}", result.plan_digest);

    for outcome in &result.entries {
        if let EntryStatus::Failed(reason) = &outcome.status {
            warn!(base = %outcome.base_filename, reason = %reason, "entry failed");
            println!("  ✗ {} ({})", outcome.base_filename, reason);
        }
    }

    println!();
    println!(
        "Summary: {}/{} entries passed",
        result.passed_count(),
        result.entries.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_anonymize_parallel() {
        let cli = Cli::try_parse_from([
            "ppsweep",
            "anonymize",
            "sweep.json",
            "--parallel",
            "tasks.mk",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Anonymize {
                config,
                dry_run,
                parallel,
                format,
            } => {
                assert_eq!(config, PathBuf::from("sweep.json"));
                assert!(!dry_run);
                assert_eq!(parallel, Some(PathBuf::from("tasks.mk")));
                assert_eq!(format, GraphFormat::Json);
            }
            _ => panic!("expected anonymize"),
        }
    }

    #[test]
    fn test_cli_parses_read_reports() {
        let cli = Cli::try_parse_from([
            "ppsweep", "--verbose", "read-reports", "-r", "a.txt", "b.txt", "-o", "out.csv",
            "--naming", "legacy",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::ReadReports {
                report_files,
                output,
                naming,
                codes,
            } => {
                assert_eq!(report_files.len(), 2);
                assert_eq!(output, PathBuf::from("out.csv"));
                assert_eq!(naming, NamingConvention::Legacy);
                assert!(codes.config.is_none());
                assert!(codes.filter_codes.is_empty());
            }
            _ => panic!("expected read-reports"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_naming() {
        assert!(Cli::try_parse_from([
            "ppsweep", "read-reports", "-r", "a.txt", "-o", "o.csv", "--naming", "short",
        ])
        .is_err());
    }

    #[test]
    fn test_read_reports_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("rs~p=10+waveform@1000.txt");
        std::fs::write(
            &report,
            "Total disclosure risk: 0,25\nTotal information loss: 3.5\n",
        )
        .unwrap();
        let output = dir.path().join("out").join("results.csv");

        cmd_read_reports(
            &FilterCodec::builtin(),
            &[report],
            &output,
            NamingConvention::Delimited,
        )
        .unwrap();

        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            csv,
            "method,stream,instances,p,disclosureRisk,informationLoss\n\
             RankSwappingFilter,waveform,1000,10,0.25,3.5\n"
        );
    }

    #[test]
    fn test_read_reports_fails_when_nothing_parses() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("rs~p=10+waveform@1000.txt");
        std::fs::write(&report, "empty\n").unwrap();
        let output = dir.path().join("results.csv");
        assert!(cmd_read_reports(
            &FilterCodec::builtin(),
            &[report],
            &output,
            NamingConvention::Delimited
        )
        .is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_cli_parses_filter_codes() {
        let cli = Cli::try_parse_from([
            "ppsweep",
            "filters",
            "--filter-code",
            "kanonymity.KAnonymityFilter=ka",
            "--filter-code",
            "swap.SwapFilter=sw",
        ])
        .unwrap();
        let Commands::Filters { codes } = cli.command else {
            panic!("expected filters");
        };
        let codec = codes.codec().unwrap();
        assert_eq!(codec.encode("kanonymity.KAnonymityFilter").unwrap(), "ka");
        assert_eq!(codec.decode("sw").unwrap(), "swap.SwapFilter");
    }

    #[test]
    fn test_cli_rejects_malformed_filter_code() {
        assert!(Cli::try_parse_from(["ppsweep", "filters", "--filter-code", "ka"]).is_err());
    }

    #[test]
    fn test_read_reports_with_configured_filter_codes() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("sweep.json");
        std::fs::write(
            &config,
            r#"{
                "filterCodes": {"kanonymity.KAnonymityFilter": "ka"},
                "filters": [
                    {"filter": "kanonymity.KAnonymityFilter",
                     "params": [{"name": "k", "values": [5]}]}
                ],
                "streams": ["streams/waveform.arff"],
                "options": {"maximumInstances": 1000}
            }"#,
        )
        .unwrap();
        let report = dir.path().join("ka~k=5+waveform@1000.txt");
        std::fs::write(
            &report,
            "Total disclosure risk: 0.5\nTotal information loss: 2.0\n",
        )
        .unwrap();
        let output = dir.path().join("results.csv");

        let codes = CodecArgs {
            config: Some(config),
            filter_codes: Vec::new(),
        };
        cmd_read_reports(
            &codes.codec().unwrap(),
            std::slice::from_ref(&report),
            &output,
            NamingConvention::Delimited,
        )
        .unwrap();

        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            csv,
            "method,stream,instances,k,disclosureRisk,informationLoss\n\
             KAnonymityFilter,waveform,1000,5,0.5,2.0\n"
        );

        // Without the extension the code is unknown and nothing parses.
        assert!(cmd_read_reports(
            &FilterCodec::builtin(),
            &[report],
            &dir.path().join("builtin.csv"),
            NamingConvention::Delimited
        )
        .is_err());
    }

    #[test]
    fn test_launcher_flag_reaches_commands() {
        let cli = Cli::try_parse_from([
            "ppsweep",
            "dump-reports",
            "-r",
            "a.moa",
            "-o",
            "dumps",
            "--launcher",
            "/opt/moa/moa.sh",
        ])
        .unwrap();
        let Commands::DumpReports {
            report_files,
            out_dir,
            launcher,
            ..
        } = cli.command
        else {
            panic!("expected dump-reports");
        };
        let engine = engine_options(launcher);
        let entries = plan_report_dumps(&engine, &report_files, &out_dir);
        assert!(entries[0].command.starts_with("/opt/moa/moa.sh \"ReadAnonymizationReport"));

        let streams = plan_stream_generation(&engine, &builtin_generators(), &[10], Path::new("s"));
        assert!(streams.iter().all(|e| e.command.starts_with("/opt/moa/moa.sh ")));
        assert_eq!(engine_options(None).launcher, "./moa.sh");
    }

    #[tokio::test]
    async fn test_anonymize_parallel_writes_task_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("sweep.json");
        std::fs::write(
            &config,
            format!(
                r#"{{
                    "filters": [
                        {{"filter": "noiseaddition.NoiseAdditionFilter",
                         "params": [{{"name": "a", "values": [0.1, 0.2]}}]}}
                    ],
                    "streams": ["streams/waveform.arff"],
                    "options": {{
                        "maximumInstances": 100,
                        "report": {{"directory": "{root}/reports"}},
                        "anonymization": {{"silence": true}},
                        "evaluation": {{"silence": true, "directory": "{root}/evaluation"}},
                        "throughput": {{"silence": true, "directory": "{root}/throughput"}},
                        "logDirectory": "{root}/logs"
                    }}
                }}"#,
                root = dir.path().display()
            ),
        )
        .unwrap();
        let task_file = dir.path().join("tasks.mk");

        cmd_anonymize(&config, false, Some(&task_file), GraphFormat::Make)
            .await
            .unwrap();

        let text = std::fs::read_to_string(&task_file).unwrap();
        assert!(text.ends_with("all: 1 2\n"));
        assert!(dir.path().join("reports").is_dir());
        assert!(dir.path().join("logs").is_dir());
    }
}
