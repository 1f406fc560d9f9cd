//! Synthetic stream generation commands.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::EngineOptions;
use crate::naming::{ArtifactKind, NamingScheme};
use crate::plan::{EntryMode, PlanEntry};

pub const WRITE_STREAM_TASK: &str = "WriteStreamToARFFFile";

/// Default instance tiers, 10^4 to 10^7.
pub const DEFAULT_TIERS: [u64; 4] = [10_000, 100_000, 1_000_000, 10_000_000];

/// A generator specification and the prefix of the files it writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorSpec {
    pub spec: String,
    pub file_prefix: String,
}

impl GeneratorSpec {
    pub fn new(spec: impl Into<String>, file_prefix: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            file_prefix: file_prefix.into(),
        }
    }
}

/// The generators shipped with the engine that sweeps usually run on.
pub fn builtin_generators() -> Vec<GeneratorSpec> {
    vec![
        GeneratorSpec::new("generators.WaveformGenerator", "waveform"),
        GeneratorSpec::new("generators.RandomRBFGenerator", "randomRBF"),
        GeneratorSpec::new("generators.AgrawalGenerator -p 0.0", "agrawal"),
    ]
}

/// One immediate entry per (generator, tier), generators outermost.
/// Files land at `<out_dir>/<prefix>-<tier>.arff`.
pub fn plan_stream_generation(
    engine: &EngineOptions,
    generators: &[GeneratorSpec],
    tiers: &[u64],
    out_dir: &Path,
) -> Vec<PlanEntry> {
    let mut entries = Vec::with_capacity(generators.len() * tiers.len());
    for generator in generators {
        for &tier in tiers {
            let base = format!("{}-{}", generator.file_prefix, tier);
            let file = NamingScheme::artifact_path(out_dir, &base, ArtifactKind::Stream.extension());
            let command = format!(
                "{} \"{} -s ({}) -f {} -m {}\"",
                engine.launcher,
                WRITE_STREAM_TASK,
                generator.spec,
                file.display(),
                tier
            );
            entries.push(PlanEntry {
                base_filename: base,
                command,
                outputs: BTreeMap::from([(ArtifactKind::Stream, file)]),
                mode: EntryMode::Immediate,
            });
        }
    }
    entries
}
