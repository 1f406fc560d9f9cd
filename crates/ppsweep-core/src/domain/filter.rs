//! Filter declarations and concrete parameter assignments.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::error::{Result, SweepError};

/// A scalar parameter value, kept in the textual form it was declared with.
///
/// Numbers keep their JSON rendering (`1.0` stays `1.0`) so that filenames
/// and engine invocations reproduce the configuration verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ParamValue(String);

impl ParamValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<Value> for ParamValue {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Number(n) => Ok(Self(n.to_string())),
            Value::String(s) => Ok(Self(s)),
            Value::Bool(b) => Ok(Self(b.to_string())),
            other => Err(format!("parameter values must be scalars, got {other}")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A declared filter parameter with its candidate values, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub values: Vec<ParamValue>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A privacy filter together with the parameter grid to sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Fully-qualified filter identifier, e.g. `microaggregation.MicroAggregationFilter`.
    #[serde(rename = "filter")]
    pub name: String,

    #[serde(default)]
    pub params: Vec<ParamSpec>,

    /// Parameter varied while the others are held fixed (scalability runs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminant_parameter: Option<String>,
}

impl FilterSpec {
    pub fn new(name: impl Into<String>, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            params,
            discriminant_parameter: None,
        }
    }

    pub fn with_discriminant(mut self, parameter: impl Into<String>) -> Self {
        self.discriminant_parameter = Some(parameter.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Parameter names must be unique within a filter.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SweepError::config("filter name cannot be empty"));
        }
        for (idx, param) in self.params.iter().enumerate() {
            if param.name.is_empty() {
                return Err(SweepError::config(format!(
                    "filter {} declares a parameter with an empty name",
                    self.name
                )));
            }
            if self.params[..idx].iter().any(|p| p.name == param.name) {
                return Err(SweepError::config(format!(
                    "filter {} declares parameter {} more than once",
                    self.name, param.name
                )));
            }
        }
        Ok(())
    }

    /// Rebuild `assignment` with `name = value` inserted at its declared position.
    pub fn assignment_with(
        &self,
        assignment: &ParameterAssignment,
        name: &str,
        value: &ParamValue,
    ) -> ParameterAssignment {
        let entries = self
            .params
            .iter()
            .filter_map(|p| {
                if p.name == name {
                    Some((p.name.clone(), value.clone()))
                } else {
                    assignment.get(&p.name).map(|v| (p.name.clone(), v.clone()))
                }
            })
            .collect();
        ParameterAssignment { entries }
    }
}

/// One concrete value per parameter, in the filter's declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterAssignment {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterAssignment {
    pub fn new(entries: Vec<(String, ParamValue)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, name: String, value: ParamValue) {
        self.entries.push((name, value));
    }

    /// Engine flags, `-k 5 -eps 0.1`.
    pub fn to_flags(&self) -> String {
        self.entries
            .iter()
            .map(|(n, v)| format!("-{} {}", n, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
