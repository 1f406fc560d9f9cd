//! Experiment configuration documents.
//!
//! A document lists the filters (with parameter grids), the streams and the
//! per-artifact output options. It is read from JSON, or from TOML when the
//! file has a `.toml` extension.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::codec::FilterCodec;
use crate::domain::error::{Result, SweepError};
use crate::domain::filter::FilterSpec;
use crate::domain::stream::StreamRef;
use crate::naming::NamingConvention;

/// How the external engine is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    /// Launcher script, e.g. `./moa.sh`.
    pub launcher: String,
    /// Engine task name for anonymization runs.
    pub task: String,
    /// Launcher flag that makes the engine print its one-line summary.
    pub scalability_flag: String,
    /// Per-invocation timeout; 0 waits forever.
    pub timeout_secs: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            launcher: "./moa.sh".to_string(),
            task: "Anonymize".to_string(),
            scalability_flag: "-e".to_string(),
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportOptions {
    pub silence: bool,
    pub directory: PathBuf,
    /// Ask the engine for a summarized report (`-z`). Always on in scalability runs.
    pub summarize: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            silence: false,
            directory: PathBuf::from("reports"),
            summarize: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnonymizationOptions {
    pub silence: bool,
    pub directory: PathBuf,
    pub suppress_header: bool,
}

impl Default for AnonymizationOptions {
    fn default() -> Self {
        Self {
            silence: false,
            directory: PathBuf::from("anonymized"),
            suppress_header: false,
        }
    }
}

/// Options shared by the periodically-updated metric artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOptions {
    #[serde(default)]
    pub silence: bool,
    pub directory: PathBuf,
    #[serde(default = "MetricOptions::default_update_rate")]
    pub update_rate: u64,
}

impl MetricOptions {
    const fn default_update_rate() -> u64 {
        1000
    }

    fn in_directory(directory: &str) -> Self {
        Self {
            silence: false,
            directory: PathBuf::from(directory),
            update_rate: Self::default_update_rate(),
        }
    }
}

fn default_evaluation() -> MetricOptions {
    MetricOptions::in_directory("evaluation")
}

fn default_throughput() -> MetricOptions {
    MetricOptions::in_directory("throughput")
}

/// Per-artifact toggles and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// Instance-count tiers; a single integer is accepted too.
    #[serde(default, deserialize_with = "one_or_many")]
    pub maximum_instances: Vec<u64>,

    #[serde(default)]
    pub naming: NamingConvention,

    #[serde(default)]
    pub engine: EngineOptions,

    #[serde(default)]
    pub report: ReportOptions,

    #[serde(default)]
    pub anonymization: AnonymizationOptions,

    #[serde(default = "default_evaluation")]
    pub evaluation: MetricOptions,

    #[serde(default = "default_throughput")]
    pub throughput: MetricOptions,

    #[serde(default = "RunOptions::default_log_directory")]
    pub log_directory: PathBuf,

    #[serde(default = "RunOptions::default_scalability_directory")]
    pub scalability_directory: PathBuf,
}

impl RunOptions {
    fn default_log_directory() -> PathBuf {
        PathBuf::from("logs")
    }

    fn default_scalability_directory() -> PathBuf {
        PathBuf::from("scalability")
    }

    /// Directories that enabled artifacts will be written into.
    pub fn output_directories(&self) -> Vec<&Path> {
        let mut dirs = Vec::new();
        if !self.report.silence {
            dirs.push(self.report.directory.as_path());
        }
        if !self.anonymization.silence {
            dirs.push(self.anonymization.directory.as_path());
        }
        if !self.evaluation.silence {
            dirs.push(self.evaluation.directory.as_path());
        }
        if !self.throughput.silence {
            dirs.push(self.throughput.directory.as_path());
        }
        dirs
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            maximum_instances: Vec::new(),
            naming: NamingConvention::default(),
            engine: EngineOptions::default(),
            report: ReportOptions::default(),
            anonymization: AnonymizationOptions::default(),
            evaluation: default_evaluation(),
            throughput: default_throughput(),
            log_directory: Self::default_log_directory(),
            scalability_directory: Self::default_scalability_directory(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(u64),
        Many(Vec<u64>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(n) => vec![n],
        OneOrMany::Many(v) => v,
    })
}

/// A complete experiment description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentConfig {
    pub filters: Vec<FilterSpec>,

    pub streams: Vec<StreamRef>,

    #[serde(default)]
    pub options: RunOptions,

    /// Repetitions of every scalability step.
    #[serde(default = "ExperimentConfig::default_replicas")]
    pub replicas: u32,

    #[serde(default)]
    pub is_scalability: bool,

    /// Extra fully-qualified filter name -> short code mappings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filter_codes: BTreeMap<String, String>,
}

impl ExperimentConfig {
    const fn default_replicas() -> u32 {
        1
    }

    /// Read and validate a configuration document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        let config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        debug!(
            path = %path.display(),
            filters = config.filters.len(),
            streams = config.streams.len(),
            "loaded experiment configuration"
        );
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Codec with the built-in filters plus `filterCodes`.
    pub fn codec(&self) -> Result<FilterCodec> {
        FilterCodec::with_extensions(&self.filter_codes)
    }

    pub fn validate(&self) -> Result<()> {
        if self.filters.is_empty() {
            return Err(SweepError::config("filters cannot be empty"));
        }
        if self.streams.is_empty() {
            return Err(SweepError::config("streams cannot be empty"));
        }
        if self.options.maximum_instances.is_empty() {
            return Err(SweepError::config(
                "options.maximumInstances needs at least one instance count",
            ));
        }
        if self.replicas == 0 {
            return Err(SweepError::config("replicas must be at least 1"));
        }

        let codec = self.codec()?;
        for filter in &self.filters {
            filter.validate()?;
            codec.encode(&filter.name)?;
        }

        if self.options.naming == NamingConvention::Legacy {
            warn!("legacy naming is not injective; distinct assignments may share a filename");
        }
        Ok(())
    }

    /// Fail unless the document's `isScalability` flag matches the entry point.
    pub fn ensure_scalability(&self, expected: bool) -> Result<()> {
        if self.is_scalability == expected {
            return Ok(());
        }
        if expected {
            Err(SweepError::config(
                "the configuration provided is not a scalability experiment",
            ))
        } else {
            Err(SweepError::config(
                "the configuration provided is a scalability experiment; use the scalability command",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "filters": [
            {"filter": "microaggregation.MicroAggregationFilter",
             "params": [{"name": "k", "values": [3, 5]}]}
        ],
        "streams": ["streams/waveform.arff"],
        "options": {"maximumInstances": 1000}
    }"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = ExperimentConfig::from_json_str(MINIMAL).unwrap();
        assert_eq!(config.options.maximum_instances, vec![1000]);
        assert_eq!(config.replicas, 1);
        assert!(!config.is_scalability);
        assert_eq!(config.options.naming, NamingConvention::Delimited);
        assert_eq!(config.options.engine.launcher, "./moa.sh");
        assert_eq!(config.options.evaluation.update_rate, 1000);
        assert_eq!(
            config.options.throughput.directory,
            PathBuf::from("throughput")
        );
    }

    #[test]
    fn test_nested_options() {
        let config = ExperimentConfig::from_json_str(
            r#"{
            "filters": [{"filter": "rankswapping.RankSwappingFilter", "params": []}],
            "streams": ["generators.WaveformGenerator"],
            "options": {
                "maximumInstances": [1000, 10000],
                "naming": "legacy",
                "report": {"silence": true},
                "evaluation": {"directory": "eval", "updateRate": 50},
                "engine": {"launcher": "/opt/moa/moa.sh"}
            }
        }"#,
        )
        .unwrap();
        assert_eq!(config.options.maximum_instances, vec![1000, 10000]);
        assert_eq!(config.options.naming, NamingConvention::Legacy);
        assert!(config.options.report.silence);
        assert_eq!(config.options.evaluation.update_rate, 50);
        assert_eq!(config.options.engine.launcher, "/opt/moa/moa.sh");
        assert_eq!(config.options.engine.task, "Anonymize");
    }

    #[test]
    fn test_unknown_filter_rejected_on_load() {
        let err = ExperimentConfig::from_json_str(
            r#"{"filters": [{"filter": "x.Unknown"}], "streams": ["s.arff"],
                "options": {"maximumInstances": 10}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SweepError::UnknownFilter(_)));
    }

    #[test]
    fn test_filter_codes_extend_codec() {
        let config = ExperimentConfig::from_json_str(
            r#"{"filters": [{"filter": "kanonymity.KAnonymityFilter"}],
                "streams": ["s.arff"],
                "options": {"maximumInstances": 10},
                "filterCodes": {"kanonymity.KAnonymityFilter": "ka"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.codec().unwrap().encode("kanonymity.KAnonymityFilter").unwrap(),
            "ka"
        );
    }

    #[test]
    fn test_missing_instances_rejected() {
        let err = ExperimentConfig::from_json_str(
            r#"{"filters": [{"filter": "noiseaddition.NoiseAdditionFilter"}],
                "streams": ["s.arff"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("maximumInstances"));
    }

    #[test]
    fn test_scalability_guard() {
        let config = ExperimentConfig::from_json_str(MINIMAL).unwrap();
        assert!(config.ensure_scalability(false).is_ok());
        let err = config.ensure_scalability(true).unwrap_err();
        assert!(err.to_string().contains("not a scalability experiment"));
    }

    #[test]
    fn test_load_toml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"
streams = ["streams/agrawal.arff"]
replicas = 3
isScalability = true

[options]
maximumInstances = [100, 200]

[[filters]]
filter = "noiseaddition.NoiseAdditionFilter"
discriminantParameter = "a"
params = [{ name = "a", values = [0.5, 1.0] }]
"#,
        )
        .unwrap();

        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.replicas, 3);
        assert!(config.is_scalability);
        assert_eq!(config.filters[0].params[0].values[1].as_str(), "1.0");
    }

    #[test]
    fn test_load_json_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.streams[0].spec(), "streams/waveform.arff");
    }
}
