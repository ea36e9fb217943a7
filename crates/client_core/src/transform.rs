//! Raw report to view model: column derivation, row zipping, currency coercion.

use shared::{
    domain::{ColumnDescriptor, RowRecord},
    error::ReportError,
    protocol::RawReport,
};
use tracing::debug;

use crate::view_model::ReportViewModel;

/// Builds the view model for one report.
///
/// Every row must have exactly one cell per header; the first row that does
/// not is reported as [`ReportError::SchemaMismatch`]. Headers that lowercase
/// to the same accessor are not deduplicated: the later cell overwrites the
/// earlier one within a row.
pub fn transform(report: RawReport) -> Result<ReportViewModel, ReportError> {
    let RawReport {
        headers,
        rows,
        page_info,
    } = report;

    let columns: Vec<ColumnDescriptor> = headers
        .into_iter()
        .map(ColumnDescriptor::from_header)
        .collect();

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != columns.len() {
                return Err(ReportError::SchemaMismatch {
                    row: index,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            let mut record = RowRecord::with_capacity(columns.len());
            for (column, cell) in columns.iter().zip(row) {
                record.insert(column.accessor.clone(), coerce_cell(&cell));
            }
            Ok(record)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        columns = columns.len(),
        rows = records.len(),
        "transform: report projected"
    );

    Ok(ReportViewModel {
        columns,
        rows: records,
        page_info,
    })
}

/// Formats numeric cells as currency with two fractional digits, passing
/// everything else through untouched.
///
/// The whole cell must parse as a finite decimal float; `"12abc"`, `"NaN"`
/// and `""` are returned as-is. Rounding follows `{:.2}`, which rounds the
/// exact binary value half to even.
pub fn coerce_cell(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => {
            // -0 would otherwise print as "$-0.00"
            let number = if number == 0.0 { 0.0 } else { number };
            format!("${number:.2}")
        }
        _ => value.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/transform_tests.rs"]
mod tests;
