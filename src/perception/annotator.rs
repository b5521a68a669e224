/// Draw element boxes and id labels on a screenshot.
///
/// Boxes come from the canonical `[x1,y1][x2,y2]` bounds. When the hierarchy
/// reports coordinates in a different space than the screenshot's pixels
/// (logical points on iOS, a scaled-down capture on Android), the boxes are
/// mapped through [`Scaling::Rescale`] first.
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::errors::{EuporieError, EuporieResult};
use crate::perception::debug_store::DebugStore;
use crate::perception::types::{Bounds, ElementDescriptor, ElementMap, ReferenceFrame};

const JPEG_QUALITY: u8 = 90;

/// How hierarchy coordinates relate to image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    /// Bounds are already in image pixels.
    Identity,
    /// Bounds are in `frame` space and get scaled to the image size.
    Rescale(ReferenceFrame),
}

impl Scaling {
    /// Pick a policy: rescale when asked to and a frame is known.
    pub fn choose(rescale: bool, frame: Option<ReferenceFrame>) -> Self {
        match (rescale, frame) {
            (true, Some(frame)) => Scaling::Rescale(frame),
            (true, None) => {
                tracing::debug!("no reference frame; drawing boxes unscaled");
                Scaling::Identity
            }
            (false, _) => Scaling::Identity,
        }
    }

    /// Map a box into an image of `width`×`height`, clamped to its edges.
    pub fn project(&self, bounds: &Bounds, width: u32, height: u32) -> Bounds {
        let (sx, sy) = match self {
            Scaling::Identity => (1.0, 1.0),
            Scaling::Rescale(frame) => (
                width as f64 / frame.width as f64,
                height as f64 / frame.height as f64,
            ),
        };
        let x = |v: i64| ((v as f64 * sx).round() as i64).clamp(0, width as i64);
        let y = |v: i64| ((v as f64 * sy).round() as i64).clamp(0, height as i64);
        Bounds::new(x(bounds.x1), y(bounds.y1), x(bounds.x2), y(bounds.y2))
    }
}

/// Decode an inline image payload. A `data:<mime>;base64,` prefix and
/// embedded whitespace are tolerated.
pub fn decode_base64_image(payload: &str) -> EuporieResult<Vec<u8>> {
    let data = match payload.trim().strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, d)| d).unwrap_or(rest),
        None => payload,
    };
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

/// MIME type of encoded image bytes, defaulting to JPEG.
pub fn mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/jpeg")
}

pub struct ImageAnnotator {
    debug: Option<DebugStore>,
}

impl ImageAnnotator {
    pub fn new(debug: Option<DebugStore>) -> Self {
        Self { debug }
    }

    /// Annotate a base64 image and return the annotated JPEG as base64.
    pub fn annotate(
        &self,
        image_b64: &str,
        elements: &ElementMap,
        scaling: Scaling,
    ) -> EuporieResult<String> {
        let bytes = decode_base64_image(image_b64)?;
        self.annotate_bytes(&bytes, elements, scaling)
    }

    /// Same as [`annotate`](Self::annotate), for already decoded bytes.
    pub fn annotate_bytes(
        &self,
        bytes: &[u8],
        elements: &ElementMap,
        scaling: Scaling,
    ) -> EuporieResult<String> {
        let jpeg = annotate_image(bytes, elements, scaling)?;
        if let Some(store) = &self.debug {
            store.persist_or_log(&jpeg);
        }
        Ok(base64::engine::general_purpose::STANDARD.encode(&jpeg))
    }
}

/// Annotate encoded image bytes and return JPEG bytes.
pub fn annotate_image(
    src_bytes: &[u8],
    elements: &ElementMap,
    scaling: Scaling,
) -> EuporieResult<Vec<u8>> {
    let img = image::load_from_memory(src_bytes)
        .map_err(|e| EuporieError::Annotation(format!("annotate load: {e}")))?;
    // JPEG has no alpha; flatten first
    let mut canvas = img.to_rgb8();
    let drawn = draw_elements(&mut canvas, elements, scaling);
    tracing::debug!(
        drawn,
        width = canvas.width(),
        height = canvas.height(),
        ?scaling,
        "screenshot annotated"
    );

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&canvas)
        .map_err(|e| EuporieError::Annotation(format!("JPEG encode: {e}")))?;
    Ok(out)
}

/// Draw every element with parseable bounds; returns how many were drawn.
pub fn draw_elements(canvas: &mut RgbImage, elements: &ElementMap, scaling: Scaling) -> usize {
    let (w, h) = canvas.dimensions();

    // Use 2× scale for labels on high-res screens (> 1600 px wide)
    let label_scale: u32 = if w > 1600 { 2 } else { 1 };
    let box_thickness: i32 = if w > 1600 { 3 } else { 2 };

    let mut drawn = 0;
    for (id, elem) in elements {
        if elem.bounds.is_empty() {
            continue;
        }
        let Some(parsed) = Bounds::parse(&elem.bounds) else {
            tracing::debug!(id = %id, bounds = %elem.bounds, "unparseable bounds skipped");
            continue;
        };
        let b = scaling.project(&parsed, w, h);
        let (Some(x1), Some(y1), Some(x2), Some(y2)) =
            (pixel(b.x1), pixel(b.y1), pixel(b.x2), pixel(b.y2))
        else {
            continue;
        };
        let col = element_colour(elem);

        draw_rect(canvas, x1, y1, x2, y2, col, box_thickness);

        let label_h_px = (5 * label_scale + 4) as i32;
        draw_label_bg(
            canvas,
            x1,
            y1.saturating_sub(label_h_px).max(0),
            id,
            col,
            label_scale,
        );
        drawn += 1;
    }
    drawn
}

fn pixel(v: i64) -> Option<i32> {
    i32::try_from(v).ok()
}

fn element_colour(elem: &ElementDescriptor) -> [u8; 3] {
    if elem.password {
        [220, 30, 30] // red
    } else if !elem.enabled {
        [130, 130, 130] // grey
    } else if elem.element_type.contains("Text") || elem.element_type.contains("Search") {
        [0, 170, 0] // green
    } else {
        [30, 60, 230] // blue
    }
}

/// Box outline `thickness` pixels wide, drawn inward from the bounds.
fn draw_rect(
    canvas: &mut RgbImage,
    x1: i32, y1: i32, x2: i32, y2: i32,
    col: [u8; 3],
    thickness: i32,
) {
    let inset = thickness - 1;
    fill(canvas, (x1, x2), (y1, y1 + inset), col);
    fill(canvas, (x1, x2), (y2 - inset, y2), col);
    fill(canvas, (x1, x1 + inset), (y1, y2), col);
    fill(canvas, (x2 - inset, x2), (y1, y2), col);
}

/// Paint the inclusive rectangle, restricted to the canvas.
fn fill(canvas: &mut RgbImage, (x0, x1): (i32, i32), (y0, y1): (i32, i32), col: [u8; 3]) {
    let (w, h) = canvas.dimensions();
    let max_x = i32::try_from(w).unwrap_or(i32::MAX) - 1;
    let max_y = i32::try_from(h).unwrap_or(i32::MAX) - 1;
    for y in y0.max(0)..=y1.min(max_y) {
        for x in x0.max(0)..=x1.min(max_x) {
            set_pixel(canvas, x as u32, y as u32, col);
        }
    }
}

fn draw_label_bg(
    canvas: &mut RgbImage,
    x: i32, y: i32,
    text: &str,
    col: [u8; 3],
    scale: u32,
) {
    let (w, h) = canvas.dimensions();
    let char_w = 5 * scale + 1; // glyph width + 1px gap
    let char_h = 5 * scale;     // glyph height
    let pad = 2 * scale;
    let glyphs = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    let label_w = glyphs.saturating_mul(char_w).saturating_add(pad * 2);
    let label_h = char_h + pad * 2;

    // Dark background, limited to what fits on the canvas
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    for py in y0..(y0.saturating_add(label_h)).min(h) {
        for px in x0..(x0.saturating_add(label_w)).min(w) {
            let p = canvas.get_pixel_mut(px, py);
            *p = image::Rgb(p.0.map(|c| (c as f32 * 0.2) as u8));
        }
    }

    let text_x = x0 + pad;
    let text_y = y0 + pad;

    for (i, c) in text.to_uppercase().chars().enumerate() {
        let gx = text_x + i as u32 * char_w;
        if gx + 5 * scale >= w { break; }
        draw_mini_glyph(canvas, c, gx, text_y, label_ink(col), scale);
    }
}

/// Glyphs are drawn in a lightened tone of the box colour so they read on
/// the darkened background.
fn label_ink(col: [u8; 3]) -> [u8; 3] {
    col.map(|c| c.saturating_add(90))
}

/// Built-in 5×5 bitmap font; characters without a glyph are skipped.
fn draw_mini_glyph(canvas: &mut RgbImage, c: char, px: u32, py: u32, col: [u8; 3], scale: u32) {
    let glyph = match c {
        '0'..='9' => MINI_FONT[(c as u8 - b'0') as usize],
        'A'..='Z' => MINI_FONT[10 + (c as u8 - b'A') as usize],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        '-' => [0b00000, 0b00000, 0b11111, 0b00000, 0b00000],
        _   => return,
    };
    let (w, h) = canvas.dimensions();
    for (row, &bits) in glyph.iter().enumerate() {
        for bit in 0..5u32 {
            if (bits >> (4 - bit)) & 1 == 0 { continue; }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + bit * scale + sx;
                    let y = py + row as u32 * scale + sy;
                    if x < w && y < h {
                        set_pixel(canvas, x, y, col);
                    }
                }
            }
        }
    }
}

fn set_pixel(canvas: &mut RgbImage, x: u32, y: u32, col: [u8; 3]) {
    canvas.put_pixel(x, y, image::Rgb(col));
}

const MINI_FONT: [[u8; 5]; 36] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // 0
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110], // 1
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111], // 2
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110], // 3
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010], // 4
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110], // 5
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110], // 6
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100], // 7
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110], // 8
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110], // 9
    [0b01110, 0b10001, 0b11111, 0b10001, 0b10001], // A
    [0b11110, 0b10001, 0b11110, 0b10001, 0b11110], // B
    [0b01110, 0b10000, 0b10000, 0b10000, 0b01110], // C
    [0b11100, 0b10010, 0b10001, 0b10010, 0b11100], // D
    [0b11111, 0b10000, 0b11110, 0b10000, 0b11111], // E
    [0b11111, 0b10000, 0b11110, 0b10000, 0b10000], // F
    [0b01110, 0b10000, 0b10011, 0b10001, 0b01110], // G
    [0b10001, 0b10001, 0b11111, 0b10001, 0b10001], // H
    [0b01110, 0b00100, 0b00100, 0b00100, 0b01110], // I
    [0b00111, 0b00010, 0b00010, 0b10010, 0b01100], // J
    [0b10001, 0b10010, 0b11100, 0b10010, 0b10001], // K
    [0b10000, 0b10000, 0b10000, 0b10000, 0b11111], // L
    [0b10001, 0b11011, 0b10101, 0b10001, 0b10001], // M
    [0b10001, 0b11001, 0b10101, 0b10011, 0b10001], // N
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // O
    [0b11110, 0b10001, 0b11110, 0b10000, 0b10000], // P
    [0b01110, 0b10001, 0b10101, 0b10010, 0b01101], // Q
    [0b11110, 0b10001, 0b11110, 0b10010, 0b10001], // R
    [0b01111, 0b10000, 0b01110, 0b00001, 0b11110], // S
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100], // T
    [0b10001, 0b10001, 0b10001, 0b10001, 0b01110], // U
    [0b10001, 0b10001, 0b10001, 0b01010, 0b00100], // V
    [0b10001, 0b10001, 0b10101, 0b11011, 0b10001], // W
    [0b10001, 0b01010, 0b00100, 0b01010, 0b10001], // X
    [0b10001, 0b01010, 0b00100, 0b00100, 0b00100], // Y
    [0b11111, 0b00010, 0b00100, 0b01000, 0b11111], // Z
];
