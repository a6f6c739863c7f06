// ============================================================
// EQUIPMENT ROW TYPES
// ============================================================
// Typed records produced by dataset validation

use serde::{Deserialize, Serialize};

/// A single validated equipment record.
///
/// Numeric fields are `None` when the source cell was blank or held a
/// missing-value marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRow {
    /// Row index (0-based, data rows only)
    pub index: usize,

    /// `Equipment Name` cell, as written
    pub name: String,

    /// `Type` cell, as written (whitespace and case preserved)
    pub category: String,

    pub flowrate: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
}

/// Validated, ordered rows together with the source header.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<EquipmentRow>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<EquipmentRow>) -> Self {
        Self { headers, rows }
    }

    /// Original header, including columns outside the required schema
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[EquipmentRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
