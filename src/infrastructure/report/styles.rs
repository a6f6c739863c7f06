// ============================================================
// REPORT STYLES
// ============================================================
// Page geometry, fonts, palette, and text metrics

use encoding_rs::{EncoderResult, WINDOWS_1252};

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to `0.0..=1.0` for PDF color operators.
    pub fn unit(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITESMOKE: Color = Color::rgb(245, 245, 245);
    pub const BEIGE: Color = Color::rgb(245, 245, 220);
    pub const LIGHTGREY: Color = Color::rgb(211, 211, 211);
    pub const GREY: Color = Color::rgb(128, 128, 128);
    pub const MIDNIGHT: Color = Color::rgb(0x2c, 0x3e, 0x50);
    pub const DIM_GREY: Color = Color::rgb(0x55, 0x55, 0x55);
    pub const CHARCOAL: Color = Color::rgb(0x33, 0x33, 0x33);
}

/// Standard Type1 Helvetica faces; no font embedding required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    pub const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Oblique];

    /// Name used in page resource dictionaries.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Oblique => "F3",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Oblique => "Helvetica-Oblique",
        }
    }

    /// Advance width of `text` in points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let table = match self {
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
            Font::Regular | Font::Oblique => &HELVETICA_WIDTHS,
        };

        let units: u32 = text
            .chars()
            .map(|c| match c as u32 {
                code @ 32..=126 => table[(code - 32) as usize] as u32,
                _ => DEFAULT_GLYPH_WIDTH as u32,
            })
            .sum();

        units as f32 * size / 1000.0
    }
}

const DEFAULT_GLYPH_WIDTH: u16 = 556;

// Glyph widths for ASCII 32..=126, in 1/1000 em (Adobe AFM metrics).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Encode text for a WinAnsi-encoded base font. Characters outside
/// Windows-1252 become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut encoder = WINDOWS_1252.new_encoder();
    let mut encoded = Vec::with_capacity(text.len());
    let mut buffer = [0u8; 512];
    let mut remaining = text;

    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(remaining, &mut buffer, true);
        encoded.extend_from_slice(&buffer[..written]);
        remaining = &remaining[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(_) => encoded.push(b'?'),
        }
    }
    encoded
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size: f32,
    pub leading: f32,
    pub color: Color,
    pub align: Align,
    pub space_before: f32,
    pub space_after: f32,
}

/// Page geometry in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// US Letter with one-inch margins.
    pub const LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
        margin: 72.0,
    };

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_left(&self) -> f32 {
        self.margin
    }

    pub fn content_top(&self) -> f32 {
        self.height - self.margin
    }

    pub fn content_bottom(&self) -> f32 {
        self.margin
    }

    pub fn center_x(&self) -> f32 {
        self.width / 2.0
    }
}

/// Summary table look.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub column_widths: [f32; 2],
    pub header: TextStyle,
    pub header_background: Color,
    pub header_row_height: f32,
    pub cell: TextStyle,
    pub row_height: f32,
    pub row_backgrounds: [Color; 2],
    pub grid_color: Color,
    pub grid_width: f32,
    pub padding: f32,
}

/// Immutable style set for one report renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStyles {
    pub page: PageGeometry,
    pub title: TextStyle,
    pub subtitle: TextStyle,
    pub heading: TextStyle,
    pub body: TextStyle,
    pub footer: TextStyle,
    pub table: TableStyle,
    pub divider_width: f32,
    pub divider_color: Color,
    /// Displayed chart size in points
    pub chart_size: (f32, f32),
}

impl Default for ReportStyles {
    fn default() -> Self {
        let body = TextStyle {
            font: Font::Regular,
            size: 10.0,
            leading: 12.0,
            color: Color::CHARCOAL,
            align: Align::Left,
            space_before: 0.0,
            space_after: 10.0,
        };

        Self {
            page: PageGeometry::LETTER,
            title: TextStyle {
                font: Font::Bold,
                size: 20.0,
                leading: 24.0,
                color: Color::MIDNIGHT,
                align: Align::Center,
                space_before: 0.0,
                space_after: 12.0,
            },
            subtitle: TextStyle {
                font: Font::Regular,
                size: 11.0,
                leading: 14.0,
                color: Color::DIM_GREY,
                align: Align::Center,
                space_before: 0.0,
                space_after: 20.0,
            },
            heading: TextStyle {
                font: Font::Bold,
                size: 14.0,
                leading: 17.0,
                color: Color::MIDNIGHT,
                align: Align::Left,
                space_before: 15.0,
                space_after: 10.0,
            },
            body,
            footer: TextStyle {
                font: Font::Oblique,
                size: 11.0,
                leading: 14.0,
                color: Color::DIM_GREY,
                align: Align::Center,
                space_before: 0.0,
                space_after: 0.0,
            },
            table: TableStyle {
                column_widths: [216.0, 144.0],
                header: TextStyle {
                    font: Font::Bold,
                    size: 11.0,
                    color: Color::WHITESMOKE,
                    ..body
                },
                header_background: Color::MIDNIGHT,
                header_row_height: 26.0,
                cell: body,
                row_height: 26.0,
                row_backgrounds: [Color::BEIGE, Color::LIGHTGREY],
                grid_color: Color::GREY,
                grid_width: 0.5,
                padding: 6.0,
            },
            divider_width: 432.0,
            divider_color: Color::GREY,
            chart_size: (360.0, 210.0),
        }
    }
}

impl ReportStyles {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width_uses_font_metrics() {
        // "10" is two digits at 556 units each
        assert!((Font::Regular.text_width("10", 10.0) - 11.12).abs() < 1e-4);
        assert!(Font::Bold.text_width("Metric", 11.0) > Font::Regular.text_width("Metric", 11.0));
        assert_eq!(Font::Regular.text_width("", 12.0), 0.0);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Pump 4"), b"Pump 4".to_vec());
        assert_eq!(encode_win_ansi("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("a\u{2013}b"), vec![b'a', 0x96, b'b']);
        assert_eq!(encode_win_ansi("泵"), b"?".to_vec());
        assert_eq!(
            encode_win_ansi("Pump\u{2122} \u{0160}koda"),
            vec![b'P', b'u', b'm', b'p', 0x99, b' ', 0x8A, b'k', b'o', b'd', b'a']
        );
        assert_eq!(encode_win_ansi("\u{20AC}5 \u{017D}"), vec![0x80, b'5', b' ', 0x8E]);

        let long = "Compressor \u{2014} ".repeat(200);
        let encoded = encode_win_ansi(&long);
        assert_eq!(encoded.len(), long.chars().count());
        assert!(encoded.iter().all(|&byte| byte != b'?'));
    }

    #[test]
    fn test_letter_geometry() {
        let page = PageGeometry::LETTER;
        assert_eq!(page.content_width(), 468.0);
        assert_eq!(page.content_top(), 720.0);
        assert_eq!(page.content_bottom(), 72.0);
    }
}
