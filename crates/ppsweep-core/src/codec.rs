//! Mapping between fully-qualified filter identifiers and filename codes.

use std::collections::BTreeMap;

use crate::domain::error::{Result, SweepError};

/// The filters shipped with the engine.
const BUILTIN_FILTERS: [(&str, &str); 4] = [
    ("differentialprivacy.DifferentialPrivacyFilter", "dp"),
    ("microaggregation.MicroAggregationFilter", "ma"),
    ("noiseaddition.NoiseAdditionFilter", "na"),
    ("rankswapping.RankSwappingFilter", "rs"),
];

/// Bidirectional filter name <-> short code table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCodec {
    codes: BTreeMap<String, String>,
    names: BTreeMap<String, String>,
}

impl Default for FilterCodec {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FilterCodec {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            codes: BTreeMap::new(),
            names: BTreeMap::new(),
        }
    }

    /// The four built-in filters.
    pub fn builtin() -> Self {
        let mut codec = Self::empty();
        for (name, code) in BUILTIN_FILTERS {
            codec.codes.insert(name.to_string(), code.to_string());
            codec.names.insert(code.to_string(), name.to_string());
        }
        codec
    }

    /// Register an extra filter.
    ///
    /// Codes must be non-empty ASCII alphanumerics, and neither the name nor
    /// the code may already be bound to something else, so `decode` stays
    /// the exact inverse of `encode`.
    pub fn register(&mut self, name: &str, code: &str) -> Result<()> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SweepError::config(format!(
                "filter code {code:?} must be non-empty ASCII alphanumerics"
            )));
        }
        match (self.codes.get(name), self.names.get(code)) {
            (Some(existing), _) if existing == code => return Ok(()),
            (Some(existing), _) => {
                return Err(SweepError::config(format!(
                    "filter {name} is already registered as {existing}"
                )))
            }
            (None, Some(owner)) => {
                return Err(SweepError::config(format!(
                    "filter code {code} is already used by {owner}"
                )))
            }
            (None, None) => {}
        }
        self.codes.insert(name.to_string(), code.to_string());
        self.names.insert(code.to_string(), name.to_string());
        Ok(())
    }

    /// Builtins extended with `extra` (fully-qualified name -> code).
    pub fn with_extensions<'a, I>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut codec = Self::builtin();
        for (name, code) in extra {
            codec.register(name, code)?;
        }
        Ok(codec)
    }

    pub fn encode(&self, name: &str) -> Result<&str> {
        self.codes
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| SweepError::UnknownFilter(name.to_string()))
    }

    pub fn decode(&self, code: &str) -> Result<&str> {
        self.names
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| SweepError::UnknownCode(code.to_string()))
    }

    /// Last dotted segment of the decoded name, e.g. `MicroAggregationFilter`.
    pub fn simple_name(&self, code: &str) -> Result<&str> {
        let name = self.decode(code)?;
        Ok(name.rsplit('.').next().unwrap_or(name))
    }

    /// `(name, code)` pairs in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.codes.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }
}
