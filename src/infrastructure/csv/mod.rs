// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV parsing with encoding fallback, and serialization for prompts

mod csv_parser;
mod csv_writer;

pub use csv_parser::CsvParser;
pub use csv_writer::write_csv;
