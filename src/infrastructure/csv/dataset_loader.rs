// ============================================================
// DATASET LOADER
// ============================================================
// Parse raw CSV bytes into a validated equipment dataset

use std::borrow::Cow;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::{UTF_8, WINDOWS_1252};

use crate::domain::csv::{
    is_missing_marker, Dataset, EquipmentRow, NumericColumn, COLUMN_NAME, COLUMN_TYPE,
    REQUIRED_COLUMNS,
};
use crate::domain::error::{AppError, Result};

/// Maximum number of offending values quoted in a type error.
const MAX_INVALID_SAMPLES: usize = 3;

/// Outcome of coercing one numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NumericCell {
    Missing,
    Value(f64),
    Invalid,
}

fn coerce_numeric(raw: &str) -> NumericCell {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_missing_marker(trimmed) {
        return NumericCell::Missing;
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => NumericCell::Value(value),
        _ => NumericCell::Invalid,
    }
}

/// Header positions of the required columns.
struct ColumnPositions {
    name: usize,
    category: usize,
    numeric: [usize; 3],
}

/// CSV loader enforcing the equipment schema.
///
/// Validation is all-or-nothing: the first failure aborts the load and no
/// partial dataset is returned.
pub struct DatasetLoader {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read everything from `reader` and validate it.
    pub fn validate_reader<R: Read>(&self, mut reader: R) -> Result<Dataset> {
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .map_err(|e| AppError::StorageError(format!("Failed to read dataset: {}", e)))?;
        self.validate(&buffer)
    }

    /// Validate raw CSV bytes and convert them into a [`Dataset`].
    pub fn validate(&self, raw: &[u8]) -> Result<Dataset> {
        let content = decode_text(raw);
        if content.trim().is_empty() {
            return Err(AppError::EmptyInput(
                "CSV file is empty: no columns to parse".to_string(),
            ));
        }

        if let Some(row) = unterminated_quote_row(&content, self.delimiter) {
            let location = match row {
                0 => "the header".to_string(),
                row => format!("CSV row {}", row),
            };
            return Err(AppError::ParseError(format!(
                "Unterminated quoted field in {}: reached end of file inside a quoted value",
                location
            )));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .trim(Trim::None)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let positions = resolve_columns(&headers)?;

        let mut records = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;
            records.push(record);
        }

        if records.is_empty() {
            return Err(AppError::EmptyInput(
                "CSV file contains a header but no data rows".to_string(),
            ));
        }

        let numeric = coerce_numeric_columns(&records, &positions)?;

        let rows = records
            .iter()
            .enumerate()
            .map(|(index, record)| EquipmentRow {
                index,
                name: cell(record, positions.name).to_string(),
                category: cell(record, positions.category).to_string(),
                flowrate: numeric[0][index],
                pressure: numeric[1][index],
                temperature: numeric[2][index],
            })
            .collect();

        Ok(Dataset::new(headers, rows))
    }
}

/// Decode as UTF-8 (BOM removed), falling back to Windows-1252.
fn decode_text(raw: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(raw);
    if !had_errors {
        return text;
    }

    let (text, _, _) = WINDOWS_1252.decode(raw);
    text
}

#[derive(Clone, Copy, PartialEq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Record index (0 = header) of a quoted field still open at end of input.
///
/// The csv reader closes such a field silently at EOF, so the scan mirrors
/// its quoting rules: a quote opens a field only at the field start, and a
/// doubled quote inside a quoted field is an escaped quote.
fn unterminated_quote_row(content: &str, delimiter: u8) -> Option<usize> {
    let mut state = QuoteState::FieldStart;
    let mut completed_records = 0;
    let mut record_has_content = false;
    let mut opened_in = 0;

    for &byte in content.as_bytes() {
        let terminator = byte == b'\n' || byte == b'\r';
        state = match state {
            QuoteState::Quoted => {
                if byte == b'"' {
                    QuoteState::QuoteInQuoted
                } else {
                    QuoteState::Quoted
                }
            }
            QuoteState::QuoteInQuoted if byte == b'"' => QuoteState::Quoted,
            _ if terminator => {
                if record_has_content {
                    completed_records += 1;
                    record_has_content = false;
                }
                QuoteState::FieldStart
            }
            _ if byte == delimiter => {
                record_has_content = true;
                QuoteState::FieldStart
            }
            QuoteState::FieldStart if byte == b'"' => {
                record_has_content = true;
                opened_in = completed_records;
                QuoteState::Quoted
            }
            _ => {
                record_has_content = true;
                QuoteState::Unquoted
            }
        };
    }

    (state == QuoteState::Quoted).then_some(opened_in)
}

/// Locate every required column, reporting all missing ones in schema order.
fn resolve_columns(headers: &[String]) -> Result<ColumnPositions> {
    let position = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| position(**column).is_none())
        .map(|column| column.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(AppError::SchemaError { missing });
    }

    let require = |name: &str| {
        position(name).ok_or_else(|| AppError::SchemaError {
            missing: vec![name.to_string()],
        })
    };

    Ok(ColumnPositions {
        name: require(COLUMN_NAME)?,
        category: require(COLUMN_TYPE)?,
        numeric: [
            require(NumericColumn::Flowrate.header())?,
            require(NumericColumn::Pressure.header())?,
            require(NumericColumn::Temperature.header())?,
        ],
    })
}

/// Coerce the numeric columns in schema order; the first column holding a
/// non-numeric value fails the whole load.
fn coerce_numeric_columns(
    records: &[StringRecord],
    positions: &ColumnPositions,
) -> Result<[Vec<Option<f64>>; 3]> {
    let mut columns: [Vec<Option<f64>>; 3] = Default::default();

    for (slot, column) in NumericColumn::ALL.iter().enumerate() {
        let position = positions.numeric[slot];
        let mut values = Vec::with_capacity(records.len());
        let mut invalid = Vec::new();

        for record in records {
            let raw = cell(record, position);
            match coerce_numeric(raw) {
                NumericCell::Value(value) => values.push(Some(value)),
                NumericCell::Missing => values.push(None),
                NumericCell::Invalid => {
                    if invalid.len() < MAX_INVALID_SAMPLES {
                        invalid.push(raw.to_string());
                    }
                    values.push(None);
                }
            }
        }

        if !invalid.is_empty() {
            return Err(AppError::TypeError {
                column: column.header().to_string(),
                samples: invalid,
            });
        }

        columns[slot] = values;
    }

    Ok(columns)
}

fn cell(record: &StringRecord, position: usize) -> &str {
    record.get(position).unwrap_or("")
}
