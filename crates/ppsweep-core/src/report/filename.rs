//! Recover sweep metadata from artifact filenames.

use regex::Regex;
use std::path::Path;

use crate::domain::error::{Result, SweepError};
use crate::naming::{
    unescape_component, NamingConvention, INSTANCES_SEP, PARAM_SEP, STREAM_SEP, VALUE_SEP,
};

/// Fields encoded in an artifact filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameFields {
    pub code: String,
    pub parameters: Vec<(String, String)>,
    pub stream: String,
    /// Empty when the filename carries no instance count.
    pub instances: String,
    pub replica: Option<u32>,
}

/// Parses both naming conventions.
#[derive(Debug, Clone)]
pub struct FilenameGrammar {
    legacy_fragment: Regex,
    legacy_stream: Regex,
    instances_tail: Regex,
}

impl FilenameGrammar {
    pub fn new() -> Result<Self> {
        Ok(Self {
            legacy_fragment: Regex::new(r"^(?P<name>[A-Za-z]+)(?P<value>.+)$")?,
            legacy_stream: Regex::new(r"^(?P<stream>.*?)-?(?P<instances>\d*)$")?,
            instances_tail: Regex::new(r"^(?P<instances>\d+)(?:\.r(?P<replica>\d+))?$")?,
        })
    }

    pub fn parse(&self, file: &str, convention: NamingConvention) -> Result<FilenameFields> {
        let stem = file_stem(file);
        match convention {
            NamingConvention::Delimited => self.parse_delimited(file, stem),
            NamingConvention::Legacy => self.parse_legacy(file, stem),
        }
    }

    fn parse_delimited(&self, file: &str, stem: &str) -> Result<FilenameFields> {
        let (head, tail) = stem
            .split_once(STREAM_SEP)
            .ok_or_else(|| SweepError::malformed(file, "no stream separator"))?;

        let mut pieces = head.split(PARAM_SEP);
        let code = pieces.next().unwrap_or_default().to_string();
        if code.is_empty() {
            return Err(SweepError::malformed(file, "empty filter code"));
        }
        let mut parameters = Vec::new();
        for piece in pieces {
            let (name, value) = piece
                .split_once(VALUE_SEP)
                .ok_or_else(|| SweepError::malformed(file, format!("parameter {piece:?} has no value")))?;
            parameters.push((unescape_component(name)?, unescape_component(value)?));
        }

        let (stream, instances, replica) = match tail.split_once(INSTANCES_SEP) {
            Some((stream, rest)) => {
                let caps = self
                    .instances_tail
                    .captures(rest)
                    .ok_or_else(|| SweepError::malformed(file, "instance count is not numeric"))?;
                let replica = caps
                    .name("replica")
                    .and_then(|m| m.as_str().parse::<u32>().ok());
                (stream, caps["instances"].to_string(), replica)
            }
            None => (tail, String::new(), None),
        };
        if stream.is_empty() {
            return Err(SweepError::malformed(file, "empty stream name"));
        }

        Ok(FilenameFields {
            code,
            parameters,
            stream: unescape_component(stream)?,
            instances,
            replica,
        })
    }

    fn parse_legacy(&self, file: &str, stem: &str) -> Result<FilenameFields> {
        let (head, tail) = stem
            .split_once('_')
            .ok_or_else(|| SweepError::malformed(file, "no '_' between filter and stream"))?;

        let mut chunks = head.split('-');
        let code = chunks.next().unwrap_or_default().to_string();
        if code.is_empty() {
            return Err(SweepError::malformed(file, "empty filter code"));
        }
        let mut parameters = Vec::new();
        for chunk in chunks {
            let caps = self.legacy_fragment.captures(chunk).ok_or_else(|| {
                SweepError::malformed(file, format!("fragment {chunk:?} is not <name><value>"))
            })?;
            parameters.push((caps["name"].to_string(), caps["value"].to_string()));
        }

        let caps = self
            .legacy_stream
            .captures(tail)
            .ok_or_else(|| SweepError::malformed(file, "unreadable stream segment"))?;
        let stream = caps["stream"].to_string();
        if stream.is_empty() {
            return Err(SweepError::malformed(file, "empty stream name"));
        }

        Ok(FilenameFields {
            code,
            parameters,
            stream,
            instances: caps["instances"].to_string(),
            replica: None,
        })
    }
}

/// Basename without its extension. Only an alphabetic suffix counts as an
/// extension, so `eps=0.1` is never cut at its decimal point.
fn file_stem(file: &str) -> &str {
    let name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            stem
        }
        _ => name,
    }
}
