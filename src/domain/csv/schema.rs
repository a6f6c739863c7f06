// ============================================================
// DATASET SCHEMA
// ============================================================
// Required columns and cell conventions for equipment CSV files

use serde::{Deserialize, Serialize};

use super::EquipmentRow;

pub const COLUMN_NAME: &str = "Equipment Name";
pub const COLUMN_TYPE: &str = "Type";

/// Required header names, in the order they are checked and reported.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    COLUMN_NAME,
    COLUMN_TYPE,
    "Flowrate",
    "Pressure",
    "Temperature",
];

/// Cell values treated as "no value" in numeric columns.
///
/// These are the tokens spreadsheet tools and dataframe libraries write for
/// missing data; matching is exact after trimming.
pub const MISSING_VALUE_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_marker(value: &str) -> bool {
    MISSING_VALUE_MARKERS.contains(&value)
}

/// One of the three numeric measurement columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericColumn {
    Flowrate,
    Pressure,
    Temperature,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 3] = [
        NumericColumn::Flowrate,
        NumericColumn::Pressure,
        NumericColumn::Temperature,
    ];

    /// Header name as it must appear in the CSV file.
    pub fn header(&self) -> &'static str {
        match self {
            NumericColumn::Flowrate => "Flowrate",
            NumericColumn::Pressure => "Pressure",
            NumericColumn::Temperature => "Temperature",
        }
    }

    pub fn value_of(&self, row: &EquipmentRow) -> Option<f64> {
        match self {
            NumericColumn::Flowrate => row.flowrate,
            NumericColumn::Pressure => row.pressure,
            NumericColumn::Temperature => row.temperature,
        }
    }
}

impl std::fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.header())
    }
}
