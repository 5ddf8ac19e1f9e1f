// Tabular document model and CSV parser/serializer
// Parses uploaded bytes into an in-memory table and renders it back out

use crate::error::ApiError;
use std::collections::HashSet;

const BOM: char = '\u{feff}';

/// Delimiters considered when sniffing an uploaded file.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// In-memory representation of a parsed file: ordered column names and
/// ordered rows. Every row holds exactly one value per column, in column
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// What `Document::parse` detected about the input alongside the parsed
/// table: the sniffed delimiter and the encoding the bytes were decoded
/// with, both reported back in the upload response.
#[derive(Debug)]
pub struct Parsed {
    pub document: Document,
    pub delimiter: u8,
    pub encoding: &'static str,
}

impl Document {
    /// Parse uploaded bytes into a document.
    ///
    /// Valid UTF-8 input is used as-is; anything else is decoded as
    /// Windows-1252 (a superset of Latin-1), which always succeeds, so
    /// legacy exports keep their accented characters instead of being
    /// mangled to replacement characters. The delimiter is sniffed from the
    /// header line, and quoted fields (embedded delimiters, quotes,
    /// newlines) are handled per RFC 4180. Structural problems are errors:
    /// empty input, empty or duplicate column names, and any data row whose
    /// field count disagrees with the header.
    pub fn parse(bytes: &[u8]) -> Result<Parsed, ApiError> {
        let (text, encoding) = decode_bytes(bytes);
        let text = text.strip_prefix(BOM).unwrap_or(&text);

        if text.trim().is_empty() {
            return Err(ApiError::MalformedInput("CSV file is empty".to_string()));
        }

        let delimiter = sniff_delimiter(text);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| ApiError::MalformedInput(format!("Could not read CSV header: {}", e)))?;

        let columns: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches(BOM).trim().to_string())
            .collect();

        if columns.is_empty() {
            return Err(ApiError::MalformedInput(
                "CSV file has no columns".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &columns {
            if name.is_empty() {
                return Err(ApiError::MalformedInput(
                    "CSV header contains an empty column name".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ApiError::MalformedInput(format!(
                    "Duplicate column name: {}",
                    name
                )));
            }
        }

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| match e.kind() {
                csv::ErrorKind::UnequalLengths { len, expected_len, .. } => {
                    ApiError::MalformedInput(format!(
                        "Row {} has {} fields, expected {}",
                        i + 1,
                        len,
                        expected_len
                    ))
                }
                _ => ApiError::MalformedInput(format!("Could not parse CSV: {}", e)),
            })?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        if rows.is_empty() {
            return Err(ApiError::MalformedInput(
                "CSV file has no data rows".to_string(),
            ));
        }

        Ok(Parsed {
            document: Document { columns, rows },
            delimiter,
            encoding,
        })
    }

    /// Render the document as comma-delimited UTF-8 text. Cells containing
    /// the delimiter, quotes, or newlines are quoted so that re-parsing
    /// reconstructs the original values exactly. Output is normalized to
    /// commas regardless of the delimiter the input was parsed with.
    pub fn render(&self) -> Result<String, ApiError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .from_writer(Vec::new());

        writer
            .write_record(&self.columns)
            .map_err(|e| ApiError::Internal(format!("Could not render CSV header: {}", e)))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| ApiError::Internal(format!("Could not render CSV row: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ApiError::Internal(format!("Could not finish CSV output: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| ApiError::Internal(format!("Rendered CSV was not UTF-8: {}", e)))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Decode uploaded bytes, reporting which encoding was used. Valid UTF-8
/// passes through untouched; everything else falls back to Windows-1252,
/// which maps every byte, so decoding never fails.
fn decode_bytes(bytes: &[u8]) -> (std::borrow::Cow<'_, str>, &'static str) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (std::borrow::Cow::Borrowed(text), "utf-8"),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            (text, "windows-1252")
        }
    }
}

/// Pick the most frequent candidate delimiter on the header line, counting
/// only occurrences outside quoted sections. Defaults to comma.
fn sniff_delimiter(text: &str) -> u8 {
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;

    for b in text.bytes() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b'\n' if !in_quotes => break,
            _ if !in_quotes => {
                if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|&d| d == b) {
                    counts[i] += 1;
                }
            }
            _ => {}
        }
    }

    let mut best = b',';
    let mut best_count = counts[0];
    for (i, &count) in counts.iter().enumerate().skip(1) {
        if count > best_count {
            best = CANDIDATE_DELIMITERS[i];
            best_count = count;
        }
    }
    best
}

/// Human-readable name for a sniffed delimiter, for the upload response.
pub fn delimiter_name(delimiter: u8) -> &'static str {
    match delimiter {
        b';' => "semicolon",
        b'\t' => "tab",
        b'|' => "pipe",
        _ => "comma",
    }
}
