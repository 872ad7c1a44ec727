// ============================================================
// CSV PARSER
// ============================================================
// Parse uploaded CSV bytes into a Dataset

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::WINDOWS_1252;
use tracing::debug;

use crate::domain::csv::Dataset;
use crate::domain::error::{AppError, Result};

/// CSV parser with encoding fallback
#[derive(Debug, Clone, Copy)]
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,

    /// Largest upload accepted, in bytes
    max_bytes: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            max_bytes: 200 * 1024 * 1024, // 200MB
        }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Parse raw upload bytes into a dataset
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Dataset> {
        if bytes.len() > self.max_bytes {
            return Err(AppError::ParseError(format!(
                "File is too large ({} bytes, limit {} bytes)",
                bytes.len(),
                self.max_bytes
            )));
        }

        let content = decode(bytes);
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<Dataset> {
        if let Some(line) = unclosed_quote_line(content.as_bytes(), self.delimiter) {
            return Err(AppError::ParseError(format!(
                "EOF inside string starting at line {}",
                line
            )));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true) // width is checked per record below
            .from_reader(content.as_bytes());

        let mut records = reader.records();

        let header_record = match records.next() {
            Some(result) => result
                .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?,
            None => {
                return Err(AppError::ParseError(
                    "No columns to parse from file".to_string(),
                ))
            }
        };
        let headers = normalize_headers(&header_record);
        let width = headers.len();

        let mut rows = Vec::new();
        for result in records {
            let record = result
                .map_err(|e| AppError::ParseError(format!("Failed to parse CSV row: {}", e)))?;

            if record.len() > width {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(AppError::ParseError(format!(
                    "Expected {} fields in line {}, saw {}",
                    width,
                    line,
                    record.len()
                )));
            }

            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!(rows = rows.len(), columns = width, "Parsed CSV upload");

        Ok(Dataset::new(headers, rows))
    }
}

/// UTF-8 first (BOM stripped), Windows-1252 otherwise
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(content) => content
            .strip_prefix('\u{feff}')
            .unwrap_or(content)
            .to_string(),
        Err(_) => {
            let (content, _, _) = WINDOWS_1252.decode(bytes);
            debug!("Upload is not valid UTF-8, decoded as Windows-1252");
            content.into_owned()
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Line where a quoted field opens and never closes, if any.
///
/// The csv reader ends such a field at EOF without complaint.
fn unclosed_quote_line(content: &[u8], delimiter: u8) -> Option<u64> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1u64;
    let mut opened_at = 1u64;

    for &byte in content {
        let ends_field = byte == delimiter || byte == b'\n' || byte == b'\r';
        state = match state {
            QuoteState::FieldStart | QuoteState::Unquoted if ends_field => QuoteState::FieldStart,
            QuoteState::FieldStart if byte == b'"' => {
                opened_at = line;
                QuoteState::Quoted
            }
            QuoteState::FieldStart | QuoteState::Unquoted => QuoteState::Unquoted,
            QuoteState::Quoted if byte == b'"' => QuoteState::QuoteInQuoted,
            QuoteState::Quoted => QuoteState::Quoted,
            QuoteState::QuoteInQuoted if byte == b'"' => QuoteState::Quoted,
            QuoteState::QuoteInQuoted if ends_field => QuoteState::FieldStart,
            QuoteState::QuoteInQuoted => QuoteState::Unquoted,
        };
        if byte == b'\n' {
            line += 1;
        }
    }

    (state == QuoteState::Quoted).then_some(opened_at)
}

/// Blank names become `Unnamed: {idx}`; repeats get `.1`, `.2`, ...
///
/// A generated name that is itself taken gets suffixed again, so
/// `a,a.1,a` becomes `a, a.1, a.1.1`.
fn normalize_headers(record: &StringRecord) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(record.len());

    for (idx, raw) in record.iter().enumerate() {
        let mut name = if raw.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            raw.to_string()
        };

        let mut count = counts.get(&name).copied().unwrap_or(0);
        while count > 0 {
            counts.insert(name.clone(), count + 1);
            name = format!("{}.{}", name, count);
            count = counts.get(&name).copied().unwrap_or(0);
        }

        counts.insert(name.clone(), count + 1);
        headers.push(name);
    }

    headers
}
