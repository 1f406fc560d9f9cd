//! Canonical artifact filenames for every sweep combination.
//!
//! Two conventions are supported:
//!
//! - [`NamingConvention::Delimited`] (default):
//!   `<code>~<name>=<value>...+<stream>@<instances>`, with every component
//!   percent-escaped outside `[A-Za-z0-9._-]`. Distinct inputs never collide.
//! - [`NamingConvention::Legacy`]: `<code>-<name><value>..._<stream><instances>`,
//!   the layout older result trees use. Fragments are glued together without
//!   separators, so `-n1 2` and `-n 12` both become `-n12`. Only use it to
//!   stay compatible with existing files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::codec::FilterCodec;
use crate::domain::error::{Result, SweepError};
use crate::domain::filter::{FilterSpec, ParameterAssignment};
use crate::domain::stream::StreamRef;

pub(crate) const PARAM_SEP: char = '~';
pub(crate) const VALUE_SEP: char = '=';
pub(crate) const STREAM_SEP: char = '+';
pub(crate) const INSTANCES_SEP: char = '@';

/// Filename layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    #[default]
    Delimited,
    Legacy,
}

impl std::str::FromStr for NamingConvention {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "delimited" => Ok(Self::Delimited),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown naming convention: {other}")),
        }
    }
}

/// Kinds of files a plan entry can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Report,
    Anonymized,
    Evaluation,
    Throughput,
    Scalability,
    Log,
    Stream,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Report => "txt",
            ArtifactKind::Anonymized => "arff",
            ArtifactKind::Evaluation => "csv",
            ArtifactKind::Throughput => "csv",
            ArtifactKind::Scalability => "csv",
            ArtifactKind::Log => "log",
            ArtifactKind::Stream => "arff",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Report => "report",
            ArtifactKind::Anonymized => "anonymized",
            ArtifactKind::Evaluation => "evaluation",
            ArtifactKind::Throughput => "throughput",
            ArtifactKind::Scalability => "scalability",
            ArtifactKind::Log => "log",
            ArtifactKind::Stream => "stream",
        };
        f.write_str(name)
    }
}

/// Derives base filenames from (stream, filter, assignment, instances).
#[derive(Debug, Clone, Copy)]
pub struct NamingScheme<'a> {
    codec: &'a FilterCodec,
    convention: NamingConvention,
}

impl<'a> NamingScheme<'a> {
    pub fn new(codec: &'a FilterCodec, convention: NamingConvention) -> Self {
        Self { codec, convention }
    }

    pub fn convention(&self) -> NamingConvention {
        self.convention
    }

    pub fn base_filename(
        &self,
        stream: &StreamRef,
        filter: &FilterSpec,
        assignment: &ParameterAssignment,
        instances: Option<u64>,
    ) -> Result<String> {
        let code = self.codec.encode(&filter.name)?;
        let stream_name = stream.short_name();
        let mut base = String::from(code);

        match self.convention {
            NamingConvention::Delimited => {
                for (name, value) in assignment.iter() {
                    base.push(PARAM_SEP);
                    base.push_str(&escape_component(name));
                    base.push(VALUE_SEP);
                    base.push_str(&escape_component(value.as_str()));
                }
                base.push(STREAM_SEP);
                base.push_str(&escape_component(&stream_name));
                if let Some(n) = instances {
                    base.push(INSTANCES_SEP);
                    base.push_str(&n.to_string());
                }
            }
            NamingConvention::Legacy => {
                for (name, value) in assignment.iter() {
                    let fragment = format!("-{}{}", name, value);
                    base.extend(fragment.chars().filter(|c| !c.is_whitespace()));
                }
                base.push('_');
                base.push_str(&stream_name);
                if let Some(n) = instances {
                    base.push_str(&n.to_string());
                }
            }
        }
        Ok(base)
    }

    /// Base filename of one replica of a step; replica 1 of a single-replica run keeps `base`.
    pub fn replica_base(base: &str, replica: u32, replicas: u32) -> String {
        if replicas > 1 {
            format!("{base}.r{replica}")
        } else {
            base.to_string()
        }
    }

    /// `<out_dir>/<base>.<ext>`; no existence checks.
    pub fn artifact_path(out_dir: &Path, base: &str, extension: &str) -> PathBuf {
        out_dir.join(format!("{base}.{extension}"))
    }
}

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-')
}

/// Percent-escape every byte outside `[A-Za-z0-9._-]`.
pub(crate) fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if is_plain(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

pub(crate) fn unescape_component(escaped: &str) -> Result<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex_digits = escaped
                .get(idx + 1..idx + 3)
                .ok_or_else(|| SweepError::malformed(escaped, "truncated escape"))?;
            let byte = u8::from_str_radix(hex_digits, 16)
                .map_err(|_| SweepError::malformed(escaped, "invalid escape"))?;
            out.push(byte);
            idx += 3;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(out).map_err(|_| SweepError::malformed(escaped, "escape is not UTF-8"))
}
