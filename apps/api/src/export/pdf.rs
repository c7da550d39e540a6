//! PDF renderer — turns a `DocumentLayout` into PDF bytes with `lopdf`.
//!
//! One PDF page per laid-out page. Text uses the four standard Helvetica faces with
//! WinAnsiEncoding, so no font files are embedded. Illustrations are re-encoded to JPEG
//! once per slot and placed as DCTDecode image XObjects. An illustration that cannot be
//! embedded is logged and left out; the rest of the document is still produced.

use std::collections::BTreeMap;
use std::io::Cursor;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;
use tracing::{debug, warn};

use crate::layout::{DocumentLayout, DrawOp, FontStyle, PageConfig};
use crate::story::{ImageMap, ImagePayload, PageSlot};

const PT_PER_MM: f32 = 72.0 / 25.4;
const JPEG_QUALITY: u8 = 90;
const PRODUCER: &str = "DreamWeaver Storybook";

const FONT_FACES: [FontStyle; 4] = [
    FontStyle::Normal,
    FontStyle::Bold,
    FontStyle::Italic,
    FontStyle::BoldItalic,
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode page content: {0}")]
    Content(#[from] lopdf::Error),

    #[error("failed to serialize PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// One illustration could not be embedded. Never fatal to the export.
#[derive(Debug, Error)]
pub enum ImageEmbedError {
    #[error("illustration for {0} is missing from the image map")]
    Missing(PageSlot),

    #[error("illustration could not be decoded or re-encoded: {0}")]
    Image(#[from] image::ImageError),
}

struct EmbeddedImage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry point
// ────────────────────────────────────────────────────────────────────────────

/// Renders `layout` to PDF bytes, resolving image ops against `images`.
pub fn render_pdf(
    layout: &DocumentLayout,
    images: &ImageMap,
    config: &PageConfig,
    title: &str,
) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for face in FONT_FACES {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font_resource_name(face), Object::Reference(font_id));
    }
    let fonts_id = doc.add_object(fonts);

    let xobjects = embed_images(&mut doc, layout, images);

    let page_width_pt = config.page_width_mm * PT_PER_MM;
    let page_height_pt = config.page_height_mm * PT_PER_MM;
    let mut kids = Vec::with_capacity(layout.pages.len());

    for page in &layout.pages {
        let mut operations = Vec::new();
        let mut page_xobjects = Dictionary::new();

        for op in &page.ops {
            match op {
                DrawOp::Text {
                    text,
                    x_mm,
                    y_mm,
                    font_size_pt,
                    style,
                    color,
                } => {
                    let (r, g, b) = color.unit();
                    operations.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new(
                        "Tf",
                        vec![font_resource_name(*style).into(), (*font_size_pt).into()],
                    ));
                    operations.push(Operation::new(
                        "Td",
                        vec![
                            (x_mm * PT_PER_MM).into(),
                            (page_height_pt - y_mm * PT_PER_MM).into(),
                        ],
                    ));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
                DrawOp::Image {
                    slot,
                    x_mm,
                    y_mm,
                    width_mm,
                    height_mm,
                } => {
                    let Some(image_id) = xobjects.get(slot) else {
                        continue;
                    };
                    let name = image_resource_name(*slot);
                    page_xobjects.set(name.as_str(), Object::Reference(*image_id));

                    let width_pt = width_mm * PT_PER_MM;
                    let height_pt = height_mm * PT_PER_MM;
                    let bottom_pt = page_height_pt - (y_mm + height_mm) * PT_PER_MM;
                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new(
                        "cm",
                        vec![
                            width_pt.into(),
                            0.into(),
                            0.into(),
                            height_pt.into(),
                            (x_mm * PT_PER_MM).into(),
                            bottom_pt.into(),
                        ],
                    ));
                    operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                    operations.push(Operation::new("Q", vec![]));
                }
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut resources = dictionary! { "Font" => fonts_id };
        if !page_xobjects.is_empty() {
            resources.set("XObject", page_xobjects);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page_width_pt.into(), page_height_pt.into()],
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

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_text_string(title), StringFormat::Hexadecimal),
        "Producer" => Object::string_literal(PRODUCER),
        "CreationDate" => Object::string_literal(
            chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()
        ),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    debug!(pages = page_count, bytes = bytes.len(), "PDF rendered");
    Ok(bytes)
}

// ────────────────────────────────────────────────────────────────────────────
// Images
// ────────────────────────────────────────────────────────────────────────────

/// Adds one image XObject per slot referenced by the layout. Failed slots are logged and omitted.
fn embed_images(
    doc: &mut Document,
    layout: &DocumentLayout,
    images: &ImageMap,
) -> BTreeMap<PageSlot, ObjectId> {
    let mut embedded = BTreeMap::new();
    let referenced = layout.pages.iter().flat_map(|p| p.ops.iter()).filter_map(|op| match op {
        DrawOp::Image { slot, .. } => Some(*slot),
        DrawOp::Text { .. } => None,
    });

    for slot in referenced {
        if embedded.contains_key(&slot) {
            continue;
        }
        let result = images
            .get(slot)
            .ok_or(ImageEmbedError::Missing(slot))
            .and_then(to_jpeg);
        match result {
            Ok(image) => {
                let mut stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(image.width),
                        "Height" => i64::from(image.height),
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                        "Filter" => "DCTDecode",
                    },
                    image.jpeg,
                );
                stream.allows_compression = false;
                embedded.insert(slot, doc.add_object(stream));
            }
            Err(e) => warn!(%slot, error = %e, "Skipping illustration that cannot be embedded"),
        }
    }
    embedded
}

fn to_jpeg(payload: &ImagePayload) -> Result<EmbeddedImage, ImageEmbedError> {
    let rgb = image::load_from_memory(&payload.bytes)?.to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(EmbeddedImage {
        width: rgb.width(),
        height: rgb.height(),
        jpeg: buf.into_inner(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Names and text encoding
// ────────────────────────────────────────────────────────────────────────────

fn font_resource_name(face: FontStyle) -> &'static str {
    match face {
        FontStyle::Normal => "F1",
        FontStyle::Bold => "F2",
        FontStyle::Italic => "F3",
        FontStyle::BoldItalic => "F4",
    }
}

fn image_resource_name(slot: PageSlot) -> String {
    format!("Im{}", slot.index())
}

/// Encodes text for a WinAnsiEncoding font. Unmappable characters become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\t' => b' ',
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

/// UTF-16BE with byte-order mark, for document-level text strings.
fn encode_text_string(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
