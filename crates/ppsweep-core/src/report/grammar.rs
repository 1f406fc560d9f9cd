//! Versioned grammar for the metric lines of dumped engine reports.
//!
//! Version 1 recognises, anywhere in the text:
//!
//! ```text
//! Total disclosure risk:  0.957178000000
//! Total information loss: 11247.654446313676
//! ```
//!
//! Whitespace between words is flexible and a comma is accepted as the
//! decimal separator (reports written under some locales use it).

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::domain::error::{Result, SweepError};

pub const GRAMMAR_VERSION: u32 = 1;

const DISCLOSURE_RISK: &str = "disclosure risk";
const INFORMATION_LOSS: &str = "information loss";

/// A decimal as printed by the engine, normalised to `.` as separator.
#[derive(Debug, Clone, PartialEq)]
pub struct Decimal {
    text: String,
    value: f64,
}

impl Decimal {
    /// Parse `12.5` or `12,5`.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim().replace(',', ".");
        let value = text.parse::<f64>().ok()?;
        Some(Self { text, value })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// The two metrics every report carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMetrics {
    pub disclosure_risk: Decimal,
    pub information_loss: Decimal,
}

#[derive(Debug, Clone)]
pub struct ReportGrammar {
    disclosure_risk: Regex,
    information_loss: Regex,
}

impl ReportGrammar {
    pub fn v1() -> Result<Self> {
        Ok(Self {
            disclosure_risk: Regex::new(
                r"Total\s+disclosure\s+risk:\s*(?P<value>\d+(?:[.,]\d+)?)",
            )?,
            information_loss: Regex::new(
                r"Total\s+information\s+loss:\s*(?P<value>\d+(?:[.,]\d+)?)",
            )?,
        })
    }

    pub fn version(&self) -> u32 {
        GRAMMAR_VERSION
    }

    /// Extract both metrics; `source_name` only labels errors.
    pub fn parse_metrics(&self, text: &str, source_name: &str) -> Result<ReportMetrics> {
        Ok(ReportMetrics {
            disclosure_risk: capture(&self.disclosure_risk, text, DISCLOSURE_RISK, source_name)?,
            information_loss: capture(
                &self.information_loss,
                text,
                INFORMATION_LOSS,
                source_name,
            )?,
        })
    }
}

fn capture(pattern: &Regex, text: &str, metric: &str, source_name: &str) -> Result<Decimal> {
    pattern
        .captures(text)
        .and_then(|caps| caps.name("value"))
        .and_then(|m| Decimal::parse(m.as_str()))
        .ok_or_else(|| SweepError::MissingMetric {
            metric: metric.to_string(),
            source_name: source_name.to_string(),
        })
}
