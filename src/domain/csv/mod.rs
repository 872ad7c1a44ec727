// ============================================================
// TABULAR DATASET
// ============================================================
// In-memory table produced from an uploaded CSV file

pub mod dataset;

pub use dataset::Dataset;
