//! CSV rendering of the recommendation table.

use migrationplanner_shared::{PlannerError, RECOMMENDATION_HEADER, RecommendationTable, Result};

/// Render `table` as CSV: the fixed header row, then one row per record in
/// table order. Cells containing commas, quotes or newlines are quoted.
pub fn render_csv(table: &RecommendationTable) -> Result<Vec<u8>> {
    let csv_err = |e: csv::Error| PlannerError::Serialization(format!("csv: {e}"));

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(RECOMMENDATION_HEADER).map_err(csv_err)?;
    for record in table.rows() {
        writer.write_record(record.cells()).map_err(csv_err)?;
    }

    writer
        .into_inner()
        .map_err(|e| PlannerError::Serialization(format!("csv: {}", e.error())))
}
