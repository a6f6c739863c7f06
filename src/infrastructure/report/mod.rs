// ============================================================
// REPORT RENDERER
// ============================================================
// Summary statistics and distribution chart as a paginated PDF

pub mod chart;
mod layout;
mod pdf;
pub mod styles;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::domain::error::Result;
use crate::domain::summary::{CategoryCount, Summary};

pub use chart::{render_bar_chart, BarChart};
pub use layout::{wrap_text, PageComposer};
pub use pdf::{Anchor, JpegImage, PageCanvas};
pub use styles::ReportStyles;

pub const REPORT_TITLE: &str = "Equipment Analytics Report";
pub const NO_DISTRIBUTION_PLACEHOLDER: &str = "No distribution data available.";
pub const ATTRIBUTION: &str = "Report generated by Equipment Analytics System";

const CONTEXT_TEXT: &str = "This report presents a comprehensive statistical analysis of \
equipment data uploaded to the Equipment Analytics system. The analysis includes summary \
statistics (mean values and counts) as well as distribution patterns across equipment types. \
Averages are computed over the values present in each column and rounded to two decimal places.";

/// Human-readable timestamp, e.g. `January 15, 2024 at 10:30 AM`.
const DISPLAY_FORMAT: &str = "%B %d, %Y at %I:%M %p";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Format an ISO-8601 upload timestamp for display. A trailing `Z` is
/// accepted; anything unparsable is returned verbatim.
pub fn format_upload_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed.format(DISPLAY_FORMAT).to_string();
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return parsed.format(DISPLAY_FORMAT).to_string();
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return midnight.format(DISPLAY_FORMAT).to_string();
    }

    raw.to_string()
}

/// Renders analytics summaries to PDF documents.
///
/// Each renderer owns its own [`ReportStyles`]; rendering performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    styles: ReportStyles,
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_styles(styles: ReportStyles) -> Self {
        Self { styles }
    }

    pub fn styles(&self) -> &ReportStyles {
        &self.styles
    }

    /// Render a report stamped with the current time in the footer.
    pub fn render(
        &self,
        dataset_filename: &str,
        upload_timestamp: &str,
        summary: &Summary,
        distribution: &[CategoryCount],
    ) -> Result<Vec<u8>> {
        self.render_at(
            dataset_filename,
            upload_timestamp,
            summary,
            distribution,
            Utc::now(),
        )
    }

    /// Render with an explicit footer time. Identical inputs give identical
    /// bytes.
    pub fn render_at(
        &self,
        dataset_filename: &str,
        upload_timestamp: &str,
        summary: &Summary,
        distribution: &[CategoryCount],
        rendered_at: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let styles = &self.styles;
        let mut composer = PageComposer::new(styles.page);
        let content_width = styles.page.content_width();

        // Title block
        composer.paragraph(REPORT_TITLE, &styles.title);
        composer.spacer(14.4);
        let mut subtitle = Vec::new();
        for line in [
            format!("Dataset: {}", dataset_filename),
            format!("Generated: {}", format_upload_timestamp(upload_timestamp)),
        ] {
            subtitle.extend(wrap_text(
                &line,
                styles.subtitle.font,
                styles.subtitle.size,
                content_width,
            ));
        }
        composer.lines(&subtitle, &styles.subtitle);
        composer.spacer(21.6);

        // Context
        composer.heading("Report Overview", &styles.heading, styles.body.leading * 2.0);
        composer.paragraph(CONTEXT_TEXT, &styles.body);
        composer.spacer(14.4);

        // Statistics table
        let rows = summary_rows(summary);
        let table = &styles.table;
        let table_height = table.header_row_height + table.row_height * (rows.len() - 1) as f32;
        composer.heading("Summary Statistics", &styles.heading, table_height);
        composer.table(&rows, table);
        composer.spacer(21.6);

        // Distribution
        let chart = render_bar_chart(distribution)?;
        let (chart_width, chart_height) = styles.chart_size;
        let keep = if chart.is_some() {
            chart_height
        } else {
            styles.body.leading
        };
        composer.heading("Equipment Type Distribution", &styles.heading, keep);
        match chart {
            Some(chart) => composer.chart(chart, chart_width, chart_height),
            None => composer.paragraph(NO_DISTRIBUTION_PLACEHOLDER, &styles.body),
        }
        composer.spacer(14.4);

        // Footer
        composer.spacer(36.0);
        composer.divider(styles.divider_width, 1.0, styles.divider_color);
        composer.spacer(7.2);
        composer.lines(
            &[
                ATTRIBUTION.to_string(),
                format!("Generated on: {}", rendered_at.format(DISPLAY_FORMAT)),
            ],
            &styles.footer,
        );

        let pages = composer.finish();
        debug!(
            dataset = dataset_filename,
            pages = pages.len(),
            categories = distribution.len(),
            "Rendered analytics report"
        );

        pdf::write_document(pages, styles.page, REPORT_TITLE)
    }
}

fn summary_rows(summary: &Summary) -> Vec<[String; 2]> {
    vec![
        ["Metric".to_string(), "Value".to_string()],
        ["Total Equipment".to_string(), summary.total_count.to_string()],
        [
            "Average Flowrate".to_string(),
            format!("{:.2}", summary.average_flowrate),
        ],
        [
            "Average Pressure".to_string(),
            format!("{:.2}", summary.average_pressure),
        ],
        [
            "Average Temperature".to_string(),
            format!("{:.2}", summary.average_temperature),
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lopdf::content::Content;
    use lopdf::{Document, Object};

    fn sample_summary() -> Summary {
        Summary {
            total_count: 10,
            average_flowrate: 125.45,
            average_pressure: 850.3,
            average_temperature: 75.2,
            distribution: vec![
                CategoryCount::new("Pump", 4),
                CategoryCount::new("Valve", 3),
                CategoryCount::new("Compressor", 3),
            ],
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, 9, 5, 0).unwrap()
    }

    /// Every string shown with `Tj`, across all pages, in drawing order.
    fn shown_text(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        let mut texts = Vec::new();
        for (_, page_id) in doc.get_pages() {
            let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            for operation in content.operations {
                if operation.operator == "Tj" {
                    if let Some(Object::String(bytes, _)) = operation.operands.first() {
                        texts.push(String::from_utf8_lossy(bytes).into_owned());
                    }
                }
            }
        }
        texts
    }

    fn image_count(bytes: &[u8]) -> usize {
        let doc = Document::load_mem(bytes).unwrap();
        doc.objects
            .values()
            .filter(|object| match object {
                Object::Stream(stream) => stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|subtype| subtype.as_name())
                    .map(|name| name == b"Image")
                    .unwrap_or(false),
                _ => false,
            })
            .count()
    }

    #[test]
    fn test_sample_report_contains_table_values_and_chart() {
        let summary = sample_summary();
        let bytes = ReportRenderer::new()
            .render_at(
                "equipment.csv",
                "2024-01-15T10:30:00Z",
                &summary,
                &summary.distribution,
                fixed_time(),
            )
            .unwrap();

        let texts = shown_text(&bytes);
        for expected in ["10", "125.45", "850.30", "75.20", "Metric", "Value", "Total Equipment"] {
            assert!(texts.iter().any(|t| t == expected), "missing {expected}");
        }
        assert!(texts.iter().any(|t| t == "Dataset: equipment.csv"));
        assert!(texts
            .iter()
            .any(|t| t == "Generated: January 15, 2024 at 10:30 AM"));
        assert!(texts
            .iter()
            .any(|t| t == "Generated on: January 16, 2024 at 09:05 AM"));
        assert_eq!(image_count(&bytes), 1);
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let summary = sample_summary();
        let bytes = ReportRenderer::new()
            .render_at("a.csv", "2024-01-15T10:30:00Z", &summary, &summary.distribution, fixed_time())
            .unwrap();
        let texts = shown_text(&bytes);

        let position = |needle: &str| texts.iter().position(|t| t == needle).unwrap();
        let order = [
            position(REPORT_TITLE),
            position("Report Overview"),
            position("Summary Statistics"),
            position("Equipment Type Distribution"),
            position(ATTRIBUTION),
        ];
        assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_empty_distribution_renders_placeholder_without_image() {
        let summary = Summary::empty();
        let bytes = ReportRenderer::new()
            .render_at("empty.csv", "2024-01-15T10:30:00Z", &summary, &[], fixed_time())
            .unwrap();

        let texts = shown_text(&bytes);
        assert!(texts.iter().any(|t| t == NO_DISTRIBUTION_PLACEHOLDER));
        assert!(texts.iter().any(|t| t == "Equipment Type Distribution"));
        assert!(texts.iter().any(|t| t == "0.00"));
        assert_eq!(image_count(&bytes), 0);
    }

    #[test]
    fn test_render_at_is_deterministic() {
        let renderer = ReportRenderer::new();
        let summary = sample_summary();
        let first = renderer
            .render_at("a.csv", "2024-01-15T10:30:00Z", &summary, &summary.distribution, fixed_time())
            .unwrap();
        let second = renderer
            .render_at("a.csv", "2024-01-15T10:30:00Z", &summary, &summary.distribution, fixed_time())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_many_categories_still_render() {
        let distribution: Vec<CategoryCount> = (0..12)
            .map(|i| CategoryCount::new(format!("Type {i}"), 12 - i))
            .collect();
        let summary = Summary {
            total_count: distribution.iter().map(|c| c.count).sum(),
            distribution: distribution.clone(),
            ..Summary::empty()
        };

        let bytes = ReportRenderer::new()
            .render("many.csv", "garbage", &summary, &distribution)
            .unwrap();
        let texts = shown_text(&bytes);
        assert!(texts.iter().any(|t| t == "Type 11"));
        assert!(texts.iter().any(|t| t == "Generated: garbage"));
    }

    #[test]
    fn test_format_upload_timestamp() {
        assert_eq!(
            format_upload_timestamp("2024-01-15T10:30:00Z"),
            "January 15, 2024 at 10:30 AM"
        );
        assert_eq!(
            format_upload_timestamp("2024-03-02T15:04:05.123456+00:00"),
            "March 02, 2024 at 03:04 PM"
        );
        assert_eq!(
            format_upload_timestamp("2024-03-02T15:04:05.5"),
            "March 02, 2024 at 03:04 PM"
        );
        assert_eq!(format_upload_timestamp("2024-03-02"), "March 02, 2024 at 12:00 AM");
        assert_eq!(format_upload_timestamp("yesterday"), "yesterday");
    }
}
