//! Bitmap text for overlay labels
//!
//! Glyphs come from the 8x8 public-domain font in `font8x8` and are drawn as
//! filled tiny-skia rectangles, scaled by an integer factor.

use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

use crate::domain::{Bounds, Position};

/// Glyph cell size in font pixels
pub const GLYPH_SIZE: u32 = 8;

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Width and height of `text` rendered at `scale`
pub fn text_size(text: &str, scale: u32) -> (f64, f64) {
    let cell = f64::from(GLYPH_SIZE * scale.max(1));
    (text.chars().count() as f64 * cell, cell)
}

/// Path covering the lit glyph pixels of `text` with its top-left corner at `origin`
pub fn text_path(text: &str, origin: Position, scale: u32) -> Option<tiny_skia::Path> {
    let px = f64::from(scale.max(1));
    let cell = f64::from(GLYPH_SIZE) * px;
    let mut pb = PathBuilder::new();

    for (i, c) in text.chars().enumerate() {
        let left = origin.x + i as f64 * cell;
        for (row, &bits) in glyph(c).iter().enumerate() {
            let top = origin.y + row as f64 * px;
            // Merge horizontal runs of lit pixels into one rectangle
            let mut col = 0;
            while col < GLYPH_SIZE {
                if bits & (1u8 << col) == 0 {
                    col += 1;
                    continue;
                }
                let run_start = col;
                while col < GLYPH_SIZE && bits & (1u8 << col) != 0 {
                    col += 1;
                }
                let run = f64::from(col - run_start);
                let x = left + f64::from(run_start) * px;
                if let Some(rect) =
                    Rect::from_xywh(x as f32, top as f32, (run * px) as f32, px as f32)
                {
                    pb.push_rect(rect);
                }
            }
        }
    }

    pb.finish()
}

/// Fill `text` with its top-left corner at `origin`
pub fn fill_text(pixmap: &mut Pixmap, text: &str, origin: Position, scale: u32, rgba: [u8; 4]) {
    let Some(path) = text_path(text, origin, scale) else {
        return;
    };
    let mut paint = Paint::default();
    let [r, g, b, a] = rgba;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = false;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

/// Bounds of `text` centered on `center`
pub fn centered_bounds(text: &str, center: Position, scale: u32) -> Bounds {
    let (w, h) = text_size(text, scale);
    Bounds::centered(center, w, h)
}

/// Fill `text` centered on `center`
pub fn fill_text_centered(
    pixmap: &mut Pixmap,
    text: &str,
    center: Position,
    scale: u32,
    rgba: [u8; 4],
) {
    let bounds = centered_bounds(text, center, scale);
    fill_text(pixmap, text, Position::new(bounds.left, bounds.top), scale, rgba);
}
