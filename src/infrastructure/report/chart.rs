// ============================================================
// DISTRIBUTION CHART
// ============================================================
// Bar chart raster (JPEG) plus text labels drawn as PDF text

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use super::pdf::{Anchor, JpegImage, PageCanvas};
use super::styles::{Color, Font};
use crate::domain::error::{AppError, Result};
use crate::domain::summary::CategoryCount;

const IMAGE_WIDTH: u32 = 600;
const IMAGE_HEIGHT: u32 = 350;
const JPEG_QUALITY: u8 = 90;

// Plot area in pixels, y growing downward.
const PLOT_LEFT: u32 = 70;
const PLOT_RIGHT: u32 = 580;
const PLOT_TOP: u32 = 40;
const PLOT_BOTTOM: u32 = 250;

const BAR_FILL: Rgb<u8> = Rgb([125, 168, 202]);
const BAR_EDGE: Rgb<u8> = Rgb([0, 0, 128]);
const GRID: Rgb<u8> = Rgb([217, 217, 217]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Category labels are rotated once there are more bars than this.
const ROTATE_LABELS_ABOVE: usize = 3;
const MAX_LABEL_CHARS: usize = 18;

pub const CHART_TITLE: &str = "Distribution by Equipment Type";
pub const X_AXIS_TITLE: &str = "Equipment Type";
pub const Y_AXIS_TITLE: &str = "Count";

/// Text drawn over the raster, in pixel coordinates of the chart image.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font: Font,
    pub size: f32,
    pub anchor: Anchor,
    pub rotation: f32,
}

/// Rendered bar chart ready to be placed on a page.
#[derive(Debug, Clone)]
pub struct BarChart {
    pub image: JpegImage,
    pub labels: Vec<ChartLabel>,
}

impl BarChart {
    /// Place the chart with its lower-left corner at `(x, y)`, scaled to
    /// `width` x `height` points.
    pub fn draw(self, canvas: &mut PageCanvas, x: f32, y: f32, width: f32, height: f32) {
        let scale_x = width / IMAGE_WIDTH as f32;
        let scale_y = height / IMAGE_HEIGHT as f32;
        let scale = scale_x.min(scale_y);

        canvas.image(self.image, x, y, width, height);

        for label in self.labels {
            let px = x + label.x * scale_x;
            let py = y + (IMAGE_HEIGHT as f32 - label.y) * scale_y;
            canvas.text(
                &label.text,
                px,
                py,
                label.font,
                label.size * scale,
                Color::BLACK,
                label.anchor,
                label.rotation,
            );
        }
    }
}

/// Pick a 1/2/5 x 10^k tick step, never below 1.
fn nice_step(raw: f64) -> f64 {
    if raw <= 1.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let head: String = label.chars().take(MAX_LABEL_CHARS - 3).collect();
    format!("{}...", head)
}

fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1.min(img.height()) {
        for x in x0..x1.min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

fn outline_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, thickness: u32, color: Rgb<u8>) {
    fill_rect(img, x0, y0, x1, y0 + thickness, color);
    fill_rect(img, x0, y1.saturating_sub(thickness), x1, y1, color);
    fill_rect(img, x0, y0, x0 + thickness, y1, color);
    fill_rect(img, x1.saturating_sub(thickness), y0, x1, y1, color);
}

fn dashed_hline(img: &mut RgbImage, y: u32, x0: u32, x1: u32, color: Rgb<u8>) {
    for x in x0..x1 {
        if (x - x0) % 8 < 4 {
            img.put_pixel(x, y, color);
        }
    }
}

/// Render the distribution as a bar chart. Returns `None` for an empty
/// distribution.
pub fn render_bar_chart(distribution: &[CategoryCount]) -> Result<Option<BarChart>> {
    if distribution.is_empty() {
        return Ok(None);
    }

    let mut img = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, BACKGROUND);
    let mut labels = Vec::new();

    let plot_height = (PLOT_BOTTOM - PLOT_TOP) as f64;
    let plot_width = (PLOT_RIGHT - PLOT_LEFT) as f64;

    let max_count = distribution.iter().map(|c| c.count).max().unwrap_or(0).max(1) as f64;
    let headroom = max_count * 1.15;
    let step = nice_step(headroom / 5.0);
    let y_max = (headroom / step).ceil() * step;
    let to_pixel_y = |value: f64| PLOT_BOTTOM as f64 - value / y_max * plot_height;

    // Grid and y ticks
    let mut tick = 0.0;
    while tick <= y_max + f64::EPSILON {
        let y = to_pixel_y(tick).round() as u32;
        if tick > 0.0 {
            dashed_hline(&mut img, y, PLOT_LEFT, PLOT_RIGHT, GRID);
        }
        fill_rect(&mut img, PLOT_LEFT - 5, y, PLOT_LEFT, y + 1, AXIS);
        labels.push(ChartLabel {
            text: format!("{}", tick as u64),
            x: (PLOT_LEFT - 8) as f32,
            y: y as f32 + 4.0,
            font: Font::Regular,
            size: 12.0,
            anchor: Anchor::End,
            rotation: 0.0,
        });
        tick += step;
    }

    // Bars
    let rotate = distribution.len() > ROTATE_LABELS_ABOVE;
    let slot = plot_width / distribution.len() as f64;
    let bar_width = slot * 0.6;

    for (index, category) in distribution.iter().enumerate() {
        let center = PLOT_LEFT as f64 + slot * (index as f64 + 0.5);
        let x0 = (center - bar_width / 2.0).round() as u32;
        let x1 = (center + bar_width / 2.0).round() as u32;
        let top = to_pixel_y(category.count as f64).round() as u32;

        if top < PLOT_BOTTOM {
            fill_rect(&mut img, x0, top, x1, PLOT_BOTTOM, BAR_FILL);
            outline_rect(&mut img, x0, top, x1, PLOT_BOTTOM, 2, BAR_EDGE);
        }

        labels.push(ChartLabel {
            text: category.count.to_string(),
            x: center as f32,
            y: top as f32 - 5.0,
            font: Font::Regular,
            size: 13.0,
            anchor: Anchor::Middle,
            rotation: 0.0,
        });

        let name = truncate_label(&category.category);
        if rotate {
            labels.push(ChartLabel {
                text: name,
                x: center as f32 + 4.0,
                y: (PLOT_BOTTOM + 12) as f32,
                font: Font::Regular,
                size: 12.0,
                anchor: Anchor::End,
                rotation: 45.0,
            });
        } else {
            labels.push(ChartLabel {
                text: name,
                x: center as f32,
                y: (PLOT_BOTTOM + 20) as f32,
                font: Font::Regular,
                size: 12.0,
                anchor: Anchor::Middle,
                rotation: 0.0,
            });
        }
        fill_rect(&mut img, center as u32, PLOT_BOTTOM, center as u32 + 1, PLOT_BOTTOM + 5, AXIS);
    }

    outline_rect(&mut img, PLOT_LEFT, PLOT_TOP, PLOT_RIGHT + 1, PLOT_BOTTOM + 1, 1, AXIS);

    let center_x = (PLOT_LEFT + PLOT_RIGHT) as f32 / 2.0;
    labels.push(ChartLabel {
        text: CHART_TITLE.to_string(),
        x: center_x,
        y: (PLOT_TOP - 14) as f32,
        font: Font::Bold,
        size: 15.0,
        anchor: Anchor::Middle,
        rotation: 0.0,
    });
    labels.push(ChartLabel {
        text: X_AXIS_TITLE.to_string(),
        x: center_x,
        y: (IMAGE_HEIGHT - 8) as f32,
        font: Font::Bold,
        size: 14.0,
        anchor: Anchor::Middle,
        rotation: 0.0,
    });
    labels.push(ChartLabel {
        text: Y_AXIS_TITLE.to_string(),
        x: 20.0,
        y: (PLOT_TOP + PLOT_BOTTOM) as f32 / 2.0,
        font: Font::Bold,
        size: 14.0,
        anchor: Anchor::Middle,
        rotation: 90.0,
    });

    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, JPEG_QUALITY)
        .encode_image(&img)
        .map_err(|e| AppError::Internal(format!("Failed to encode chart image: {}", e)))?;

    Ok(Some(BarChart {
        image: JpegImage {
            data,
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
        },
        labels,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<CategoryCount> {
        vec![
            CategoryCount::new("Pump", 4),
            CategoryCount::new("Valve", 3),
            CategoryCount::new("Compressor", 3),
        ]
    }

    #[test]
    fn test_empty_distribution_has_no_chart() {
        assert!(render_bar_chart(&[]).unwrap().is_none());
    }

    #[test]
    fn test_chart_is_jpeg_with_value_labels() {
        let chart = render_bar_chart(&sample()).unwrap().unwrap();

        assert!(chart.image.data.starts_with(&[0xFF, 0xD8]));
        assert_eq!((chart.image.width, chart.image.height), (IMAGE_WIDTH, IMAGE_HEIGHT));

        let texts: Vec<&str> = chart.labels.iter().map(|l| l.text.as_str()).collect();
        for expected in ["4", "3", "Pump", "Valve", "Compressor", CHART_TITLE, X_AXIS_TITLE, Y_AXIS_TITLE] {
            assert!(texts.contains(&expected), "missing label {expected}");
        }
    }

    #[test]
    fn test_labels_rotate_above_three_categories() {
        let three = render_bar_chart(&sample()).unwrap().unwrap();
        assert!(three
            .labels
            .iter()
            .filter(|l| l.text == "Pump")
            .all(|l| l.rotation == 0.0));

        let mut four = sample();
        four.push(CategoryCount::new("Heat Exchanger", 1));
        let chart = render_bar_chart(&four).unwrap().unwrap();
        let label = chart.labels.iter().find(|l| l.text == "Heat Exchanger").unwrap();
        assert_eq!(label.rotation, 45.0);
        assert_eq!(label.anchor, Anchor::End);
    }

    #[test]
    fn test_nice_step() {
        assert_eq!(nice_step(0.5), 1.0);
        assert_eq!(nice_step(1.7), 2.0);
        assert_eq!(nice_step(3.0), 5.0);
        assert_eq!(nice_step(23.0), 50.0);
        assert_eq!(nice_step(120.0), 200.0);
    }

    #[test]
    fn test_long_labels_are_truncated() {
        assert_eq!(truncate_label("Pump"), "Pump");
        assert_eq!(truncate_label("Centrifugal Compressor Unit"), "Centrifugal Com...");
    }
}
