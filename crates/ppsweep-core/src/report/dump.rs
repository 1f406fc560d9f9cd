//! Commands that turn binary engine reports into readable text.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::EngineOptions;
use crate::naming::{ArtifactKind, NamingScheme};
use crate::plan::{EntryMode, PlanEntry};

pub const READ_REPORT_TASK: &str = "ReadAnonymizationReport";

/// One immediate entry per report; the dump lands in
/// `<out_dir>/<report stem>.txt`.
pub fn plan_report_dumps<P: AsRef<Path>>(
    engine: &EngineOptions,
    reports: &[P],
    out_dir: &Path,
) -> Vec<PlanEntry> {
    reports
        .iter()
        .map(|report| {
            let report = report.as_ref();
            let base = report
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| report.display().to_string());
            let out = NamingScheme::artifact_path(out_dir, &base, ArtifactKind::Report.extension());
            let command = format!(
                "{} \"{} -r {}\" > {}",
                engine.launcher,
                READ_REPORT_TASK,
                report.display(),
                out.display()
            );
            PlanEntry {
                base_filename: base,
                command,
                outputs: BTreeMap::from([(ArtifactKind::Report, out)]),
                mode: EntryMode::Immediate,
            }
        })
        .collect()
}
