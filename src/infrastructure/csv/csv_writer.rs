// ============================================================
// CSV WRITER
// ============================================================
// Serialize a Dataset back to CSV text for prompts

use csv::WriterBuilder;

use crate::domain::csv::Dataset;
use crate::domain::error::{AppError, Result};

/// Write the header plus at most `max_rows` rows as CSV text
pub fn write_csv(dataset: &Dataset, max_rows: usize) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record(dataset.headers())
        .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;

    for row in dataset.rows().iter().take(max_rows) {
        writer
            .write_record(row)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))?;

    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("Invalid UTF-8 in CSV: {}", e)))
}
