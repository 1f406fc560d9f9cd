//! Data stream references.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Where the engine reads instances from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// An ARFF (or similar) file on disk.
    File,
    /// A generator specification such as `generators.AgrawalGenerator -p 0.0`.
    Generator,
}

/// Opaque stream specification as passed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamRef(String);

impl StreamRef {
    pub fn new(spec: impl Into<String>) -> Self {
        Self(spec.into())
    }

    pub fn spec(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> StreamKind {
        let head = self.0.split_whitespace().next().unwrap_or("");
        let is_file = head.contains('/')
            || head.contains('\\')
            || Path::new(head)
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("arff") || ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
        if is_file {
            StreamKind::File
        } else {
            StreamKind::Generator
        }
    }

    /// Short name used in filenames.
    ///
    /// Files use their stem (`streams/waveform-10000.arff` -> `waveform-10000`);
    /// generators use the class name (`generators.WaveformGenerator` -> `WaveformGenerator`),
    /// followed by `-<options digest>` when options are given, so two
    /// configurations of the same generator get different names.
    pub fn short_name(&self) -> String {
        let mut words = self.0.split_whitespace();
        let head = words.next().unwrap_or("");
        match self.kind() {
            StreamKind::File => Path::new(head)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| head.to_string()),
            StreamKind::Generator => {
                let class = head.rsplit('.').next().unwrap_or(head);
                let options: Vec<&str> = words.collect();
                if options.is_empty() {
                    class.to_string()
                } else {
                    format!("{class}-{}", options_digest(&options.join(" ")))
                }
            }
        }
    }
}

/// First 8 hex digits of the SHA-256 of whitespace-normalised generator options.
fn options_digest(options: &str) -> String {
    let digest = Sha256::digest(options.as_bytes());
    hex::encode(&digest[..4])
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
