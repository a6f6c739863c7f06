// ============================================================
// EQUIPMENT DATASET DOMAIN
// ============================================================
// Core types and value objects for validated equipment datasets
// No I/O, no async

mod equipment_row;
mod schema;

pub use equipment_row::{Dataset, EquipmentRow};
pub use schema::{
    is_missing_marker, NumericColumn, COLUMN_NAME, COLUMN_TYPE, MISSING_VALUE_MARKERS,
    REQUIRED_COLUMNS,
};
