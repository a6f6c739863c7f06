use serde::{Deserialize, Serialize};

/// Number of rows sharing one `Type` label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    #[serde(rename = "type")]
    pub category: String,
    pub count: u64,
}

impl CategoryCount {
    pub fn new(category: impl Into<String>, count: u64) -> Self {
        Self {
            category: category.into(),
            count,
        }
    }
}

/// Aggregate statistics computed from one dataset.
///
/// Averages are rounded to two decimals; a column without any value reports
/// `0.0`. `distribution` is sorted by count descending, ties in order of first
/// appearance, and its counts always add up to `total_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "total_equipment")]
    pub total_count: u64,
    pub average_flowrate: f64,
    pub average_pressure: f64,
    pub average_temperature: f64,
    #[serde(rename = "equipment_distribution")]
    pub distribution: Vec<CategoryCount>,
}

impl Summary {
    /// Summary of a dataset without rows.
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            average_flowrate: 0.0,
            average_pressure: 0.0,
            average_temperature: 0.0,
            distribution: Vec::new(),
        }
    }

    pub fn distribution_total(&self) -> u64 {
        self.distribution.iter().map(|c| c.count).sum()
    }
}
