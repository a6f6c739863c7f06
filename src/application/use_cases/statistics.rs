// ============================================================
// STATISTICS AGGREGATOR
// ============================================================
// Reduce a validated dataset to summary statistics

use std::collections::HashMap;

use crate::domain::csv::{Dataset, NumericColumn};
use crate::domain::summary::{CategoryCount, Summary};

/// Round half away from zero to two decimals.
///
/// Magnitudes too large to scale have no fractional part and come back as is.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

/// Mean of the present values of `column`, `0.0` when none are present.
///
/// Accumulated as a weighted running mean so that finite inputs near
/// `f64::MAX` never overflow into an infinite average.
pub fn column_mean(dataset: &Dataset, column: NumericColumn) -> f64 {
    let (mean, count) = dataset
        .rows()
        .iter()
        .filter_map(|row| column.value_of(row))
        .fold((0.0_f64, 0_u64), |(mean, count), value| {
            let n = (count + 1) as f64;
            (mean * ((n - 1.0) / n) + value / n, count + 1)
        });

    if count == 0 {
        0.0
    } else {
        round2(mean.clamp(f64::MIN, f64::MAX))
    }
}

/// Count rows per `Type`, sorted by count descending. Ties keep the order
/// in which each category first appeared.
pub fn category_distribution(dataset: &Dataset) -> Vec<CategoryCount> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<CategoryCount> = Vec::new();

    for row in dataset.rows() {
        match first_seen.get(row.category.as_str()) {
            Some(&index) => counts[index].count += 1,
            None => {
                first_seen.insert(row.category.as_str(), counts.len());
                counts.push(CategoryCount::new(row.category.clone(), 1));
            }
        }
    }

    // `counts` is in first-seen order and sort_by is stable.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Compute the full summary for a validated dataset.
pub fn aggregate(dataset: &Dataset) -> Summary {
    Summary {
        total_count: dataset.len() as u64,
        average_flowrate: column_mean(dataset, NumericColumn::Flowrate),
        average_pressure: column_mean(dataset, NumericColumn::Pressure),
        average_temperature: column_mean(dataset, NumericColumn::Temperature),
        distribution: category_distribution(dataset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::EquipmentRow;

    fn row(index: usize, category: &str, values: [Option<f64>; 3]) -> EquipmentRow {
        EquipmentRow {
            index,
            name: format!("EQ-{index}"),
            category: category.to_string(),
            flowrate: values[0],
            pressure: values[1],
            temperature: values[2],
        }
    }

    fn dataset(rows: Vec<EquipmentRow>) -> Dataset {
        Dataset::new(Vec::new(), rows)
    }

    #[test]
    fn test_aggregate_basic_summary() {
        let data = dataset(vec![
            row(0, "Pump", [Some(100.0), Some(5.0), Some(110.0)]),
            row(1, "Valve", [Some(50.0), Some(4.0), Some(100.0)]),
            row(2, "Pump", [Some(120.0), Some(6.0), Some(115.0)]),
        ]);
        let summary = aggregate(&data);

        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.average_flowrate, 90.0);
        assert_eq!(summary.average_pressure, 5.0);
        assert_eq!(summary.average_temperature, 108.33);
        assert_eq!(
            summary.distribution,
            vec![CategoryCount::new("Pump", 2), CategoryCount::new("Valve", 1)]
        );
    }

    #[test]
    fn test_distribution_sums_to_total() {
        let categories = ["A", "B", "A", "C", "", "B", "A", " A"];
        let data = dataset(
            categories
                .iter()
                .enumerate()
                .map(|(i, c)| row(i, c, [None, None, None]))
                .collect(),
        );
        let summary = aggregate(&data);

        assert_eq!(summary.distribution_total(), summary.total_count);
        assert_eq!(summary.distribution.len(), 5);
        assert!(summary.distribution.iter().any(|c| c.category.is_empty()));
        assert!(summary.distribution.iter().any(|c| c.category == " A"));
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        let data = dataset(vec![
            row(0, "Valve", [None, None, None]),
            row(1, "Compressor", [None, None, None]),
            row(2, "Pump", [None, None, None]),
            row(3, "Pump", [None, None, None]),
            row(4, "Compressor", [None, None, None]),
            row(5, "Valve", [None, None, None]),
            row(6, "Pump", [None, None, None]),
        ]);

        let names: Vec<String> = category_distribution(&data)
            .into_iter()
            .map(|c| c.category)
            .collect();
        assert_eq!(names, vec!["Pump", "Valve", "Compressor"]);
    }

    #[test]
    fn test_means_skip_missing_values() {
        let data = dataset(vec![
            row(0, "Pump", [Some(10.0), None, Some(1.0)]),
            row(1, "Pump", [None, None, Some(2.0)]),
            row(2, "Pump", [Some(20.0), None, None]),
        ]);
        let summary = aggregate(&data);

        assert_eq!(summary.average_flowrate, 15.0);
        assert_eq!(summary.average_pressure, 0.0);
        assert_eq!(summary.average_temperature, 1.5);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        assert_eq!(round2(2.675_000_1), 2.68);
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(-1.235_000_1), -1.24);
        assert_eq!(round2(850.3), 850.3);
        assert_eq!(round2(1e308), 1e308);
        assert_eq!(round2(-f64::MAX), -f64::MAX);
    }

    #[test]
    fn test_means_of_extreme_values_stay_finite() {
        let data = dataset(vec![
            row(0, "Pump", [Some(1e308), Some(f64::MAX), Some(-1e308)]),
            row(1, "Pump", [Some(1e308), Some(f64::MAX), Some(1e308)]),
        ]);
        let summary = aggregate(&data);

        assert_eq!(summary.average_flowrate, 1e308);
        assert!(summary.average_pressure.is_finite());
        assert!(summary.average_pressure > 1.7e308);
        assert_eq!(summary.average_temperature, 0.0);
    }

    #[test]
    fn test_empty_dataset() {
        let summary = aggregate(&dataset(Vec::new()));
        assert_eq!(summary, Summary::empty());
    }
}
