//! Export functionality for scan reports.
//!
//! Supports JSON (the whole report) and CSV (one row per big key).

use super::ScanReport;
use crate::error::ReportError;
use std::io::Write;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Write a report in the given format
pub fn export<W: Write>(
    report: &ScanReport,
    format: ExportFormat,
    writer: W,
) -> Result<(), ReportError> {
    match format {
        ExportFormat::Json => export_json(report, writer),
        ExportFormat::Csv => export_csv(report, writer),
    }
}

/// Export the full report as pretty-printed JSON
pub fn export_json<W: Write>(report: &ScanReport, mut writer: W) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    Ok(())
}

/// Export findings to CSV
///
/// CSV columns: Key, Type, Size, Threshold
pub fn export_csv<W: Write>(report: &ScanReport, mut writer: W) -> Result<(), ReportError> {
    writeln!(writer, "Key,Type,Size,Threshold")?;

    for finding in &report.findings {
        writeln!(
            writer,
            "{},{},{},{}",
            csv_field(&finding.key),
            csv_field(finding.key_type.tag()),
            finding.size,
            finding.threshold
        )?;
    }

    Ok(())
}

/// Quote a field if it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
