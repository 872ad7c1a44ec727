use crate::domain::conversation::RenderedEntry;
use crate::domain::csv::Dataset;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(max = 4000))]
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AskResponse {
    Answered { answer: String },
    Ignored,
    Warning { message: String },
    Error { message: String },
}

/// Table as shown on the page: all headers, the leading rows.
#[derive(Debug, Serialize)]
pub struct DatasetView<'a> {
    pub headers: &'a [String],
    pub rows: &'a [Vec<String>],
    pub row_count: usize,
    pub column_count: usize,
    pub truncated: bool,
}

impl<'a> DatasetView<'a> {
    pub fn new(dataset: &'a Dataset, preview_rows: usize) -> Self {
        let shown = dataset.row_count().min(preview_rows);
        Self {
            headers: dataset.headers(),
            rows: &dataset.rows()[..shown],
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            truncated: shown < dataset.row_count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    /// Most recent first
    pub entries: Vec<RenderedEntry>,
}
