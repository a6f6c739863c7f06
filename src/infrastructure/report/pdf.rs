// ============================================================
// PDF WRITER
// ============================================================
// Content stream operators and document assembly on top of lopdf

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use super::styles::{encode_win_ansi, Color, Font, PageGeometry};
use crate::domain::error::{AppError, Result};

fn real(value: f32) -> Object {
    Object::from(value)
}

/// Baseline anchor for a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// JPEG image placed as a `DCTDecode` XObject.
#[derive(Debug, Clone)]
pub struct JpegImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Operators and images for one page.
#[derive(Debug, Default)]
pub struct PageCanvas {
    operations: Vec<Operation>,
    images: Vec<(String, JpegImage)>,
}

impl PageCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let [r, g, b] = color.unit();
        self.operations.extend([
            Operation::new("rg", vec![real(r), real(g), real(b)]),
            Operation::new("re", vec![real(x), real(y), real(width), real(height)]),
            Operation::new("f", vec![]),
        ]);
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line: f32, color: Color) {
        let [r, g, b] = color.unit();
        self.operations.extend([
            Operation::new("w", vec![real(line)]),
            Operation::new("RG", vec![real(r), real(g), real(b)]),
            Operation::new("re", vec![real(x), real(y), real(width), real(height)]),
            Operation::new("S", vec![]),
        ]);
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), line: f32, color: Color) {
        let [r, g, b] = color.unit();
        self.operations.extend([
            Operation::new("w", vec![real(line)]),
            Operation::new("RG", vec![real(r), real(g), real(b)]),
            Operation::new("m", vec![real(from.0), real(from.1)]),
            Operation::new("l", vec![real(to.0), real(to.1)]),
            Operation::new("S", vec![]),
        ]);
    }

    /// Draw a single text run with its baseline anchor at `(x, y)`, rotated
    /// counter-clockwise by `rotation` degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        color: Color,
        anchor: Anchor,
        rotation: f32,
    ) {
        let width = font.text_width(text, size);
        let offset = match anchor {
            Anchor::Start => 0.0,
            Anchor::Middle => width / 2.0,
            Anchor::End => width,
        };

        let (sin, cos) = rotation.to_radians().sin_cos();
        let start_x = x - offset * cos;
        let start_y = y - offset * sin;
        let [r, g, b] = color.unit();

        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.resource_name().as_bytes().to_vec()), real(size)],
            ),
            Operation::new("rg", vec![real(r), real(g), real(b)]),
            Operation::new(
                "Tm",
                vec![real(cos), real(sin), real(-sin), real(cos), real(start_x), real(start_y)],
            ),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Place `image` with its lower-left corner at `(x, y)`.
    pub fn image(&mut self, image: JpegImage, x: f32, y: f32, width: f32, height: f32) {
        let name = format!("Im{}", self.images.len() + 1);
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(width), real(0.0), real(0.0), real(height), real(x), real(y)],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        self.images.push((name, image));
    }
}

/// Assemble pages into a complete, uncompressed PDF.
pub fn write_document(pages: Vec<PageCanvas>, geometry: PageGeometry, title: &str) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let fonts_id = doc.add_object(fonts);

    let media_box = vec![
        Object::Integer(0),
        Object::Integer(0),
        real(geometry.width),
        real(geometry.height),
    ];

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let has_images = !page.images.is_empty();
        let mut xobjects = Dictionary::new();
        for (name, image) in page.images {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            };
            let image_id = doc.add_object(Stream::new(dict, image.data));
            xobjects.set(name, image_id);
        }

        let content = Content {
            operations: page.operations,
        };
        let encoded = content
            .encode()
            .map_err(|e| AppError::Internal(format!("Failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut resources = dictionary! {
            "Font" => fonts_id,
        };
        if has_images {
            resources.set("XObject", xobjects);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_win_ansi(title)),
        "Producer" => Object::string_literal("Equipment Analytics"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to write PDF: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_anchor_shifts_start() {
        let mut canvas = PageCanvas::new();
        canvas.text("10", 100.0, 50.0, Font::Regular, 10.0, Color::BLACK, Anchor::End, 0.0);

        let tm = canvas
            .operations()
            .iter()
            .find(|op| op.operator == "Tm")
            .unwrap();
        let start_x = match tm.operands[4] {
            Object::Real(value) => value as f32,
            ref other => panic!("unexpected operand {other:?}"),
        };
        assert!((start_x - (100.0 - 11.12)).abs() < 1e-3);
    }

    #[test]
    fn test_write_document_loads_back() {
        let mut first = PageCanvas::new();
        first.text("Hello", 72.0, 700.0, Font::Bold, 12.0, Color::BLACK, Anchor::Start, 0.0);
        let mut second = PageCanvas::new();
        second.line((72.0, 400.0), (540.0, 400.0), 1.0, Color::GREY);

        let bytes = write_document(vec![first, second], PageGeometry::LETTER, "Test").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
