//! Aggregate parsed reports into one CSV.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{ReportParser, ReportRecord};
use crate::domain::error::{Result, SweepError};

/// A report that could not be aggregated.
#[derive(Debug)]
pub struct ReportFailure {
    pub path: PathBuf,
    pub error: SweepError,
}

/// Outcome of reading a batch of reports.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub records: Vec<ReportRecord>,
    pub failures: Vec<ReportFailure>,
}

impl Aggregation {
    pub fn to_csv(&self) -> Result<String> {
        to_csv(&self.records)
    }
}

/// Render records as CSV. Parameter columns come from the first record;
/// every other record must carry the same names in the same order.
pub fn to_csv(records: &[ReportRecord]) -> Result<String> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };
    let columns = first.parameter_names();
    for record in &records[1..] {
        let names = record.parameter_names();
        if names != columns {
            return Err(SweepError::SchemaMismatch {
                file: record.source.clone(),
                expected: columns.join(","),
                actual: names.join(","),
            });
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["method", "stream", "instances"];
    header.extend(columns.iter().copied());
    header.extend(["disclosureRisk", "informationLoss"]);
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![
            record.method.as_str(),
            record.stream.as_str(),
            record.instances.as_str(),
        ];
        row.extend(record.parameters.iter().map(|(_, v)| v.as_str()));
        row.push(record.disclosure_risk.as_str());
        row.push(record.information_loss.as_str());
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SweepError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| SweepError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Parse every path, keeping going past bad files.
///
/// Records whose parameter names differ from the first good record are
/// moved to `failures` with a `SchemaMismatch`, so the returned records
/// always render.
pub fn aggregate_reports<P: AsRef<Path>>(parser: &ReportParser<'_>, paths: &[P]) -> Aggregation {
    let mut aggregation = Aggregation::default();
    let mut columns: Option<Vec<String>> = None;

    for path in paths {
        let path = path.as_ref();
        let record = match parser.parse_file(path) {
            Ok(record) => record,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping report");
                aggregation.failures.push(ReportFailure {
                    path: path.to_path_buf(),
                    error,
                });
                continue;
            }
        };

        let names: Vec<String> = record.parameters.iter().map(|(n, _)| n.clone()).collect();
        match &columns {
            None => columns = Some(names),
            Some(expected) if *expected != names => {
                let error = SweepError::SchemaMismatch {
                    file: record.source.clone(),
                    expected: expected.join(","),
                    actual: names.join(","),
                };
                warn!(path = %path.display(), error = %error, "skipping report");
                aggregation.failures.push(ReportFailure {
                    path: path.to_path_buf(),
                    error,
                });
                continue;
            }
            Some(_) => {}
        }

        debug!(path = %path.display(), method = %record.method, "parsed report");
        aggregation.records.push(record);
    }

    aggregation
}
