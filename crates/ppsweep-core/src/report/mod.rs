//! Reading dumped engine reports back into structured records.

pub mod aggregate;
pub mod dump;
pub mod filename;
pub mod grammar;

use serde::Serialize;
use std::path::Path;

use crate::codec::FilterCodec;
use crate::domain::error::Result;
use crate::naming::NamingConvention;

pub use aggregate::{aggregate_reports, to_csv, Aggregation, ReportFailure};
pub use dump::{plan_report_dumps, READ_REPORT_TASK};
pub use filename::{FilenameFields, FilenameGrammar};
pub use grammar::{Decimal, ReportGrammar, ReportMetrics, GRAMMAR_VERSION};

/// One parsed report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    /// Filename the record was parsed from.
    pub source: String,
    /// Simple filter name, e.g. `MicroAggregationFilter`.
    pub method: String,
    pub stream: String,
    pub instances: String,
    pub parameters: Vec<(String, String)>,
    pub disclosure_risk: Decimal,
    pub information_loss: Decimal,
}

impl ReportRecord {
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// Combines the filename grammar and the report grammar.
#[derive(Debug, Clone)]
pub struct ReportParser<'a> {
    codec: &'a FilterCodec,
    convention: NamingConvention,
    filenames: FilenameGrammar,
    grammar: ReportGrammar,
}

impl<'a> ReportParser<'a> {
    pub fn new(codec: &'a FilterCodec, convention: NamingConvention) -> Result<Self> {
        Ok(Self {
            codec,
            convention,
            filenames: FilenameGrammar::new()?,
            grammar: ReportGrammar::v1()?,
        })
    }

    /// Parse `report_text`; everything but the metrics comes from `filename_hint`.
    pub fn parse(&self, report_text: &str, filename_hint: &str) -> Result<ReportRecord> {
        let fields = self.filenames.parse(filename_hint, self.convention)?;
        let method = self.codec.simple_name(&fields.code)?.to_string();
        let metrics = self.grammar.parse_metrics(report_text, filename_hint)?;
        Ok(ReportRecord {
            source: filename_hint.to_string(),
            method,
            stream: fields.stream,
            instances: fields.instances,
            parameters: fields.parameters,
            disclosure_risk: metrics.disclosure_risk,
            information_loss: metrics.information_loss,
        })
    }

    pub fn parse_file(&self, path: &Path) -> Result<ReportRecord> {
        let text = std::fs::read_to_string(path)?;
        self.parse(&text, &path.display().to_string())
    }
}
