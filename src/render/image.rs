//! Overlay rendering for measurements using tiny-skia
//!
//! These functions draw landmarks, connecting lines, the angle arc and labels
//! onto an RgbaImage, either as the interactive canvas or as the baked
//! export image.

use image::RgbaImage;
use tiny_skia::{ColorU8, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::geometry::{self, AngleArc, BEZIER_K, arc, export, line, marker};
use super::text;
use crate::config::MeasureConfig;
use crate::domain::{Bounds, LANDMARK_COUNT, Landmark, Position};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const SHADOW: [u8; 4] = [0, 0, 0, 200];
const LABEL_BACKGROUND: [u8; 4] = [0, 0, 0, 170];
const BADGE_BACKGROUND: [u8; 4] = [0, 0, 0, 215];
const WATERMARK_BACKGROUND: [u8; 4] = [0, 0, 0, 150];
const WATERMARK_TEXT: [u8; 4] = [255, 255, 255, 230];

/// Sizes and colors used for overlays, resolved from [`MeasureConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub point_radius: f64,
    pub arc_radius: f64,
    pub line_color: [u8; 4],
    pub point_color: [u8; 4],
    pub arc_color: [u8; 4],
}

impl OverlayStyle {
    pub fn from_config(config: &MeasureConfig) -> Self {
        Self {
            point_radius: config.point_radius,
            arc_radius: config.arc_radius,
            line_color: config.line_color.to_rgba_u8(),
            point_color: config.point_color.to_rgba_u8(),
            arc_color: config.arc_color.to_rgba_u8(),
        }
    }

    /// Pointer-down distance (strictly less) that grabs an existing marker
    pub fn hit_radius(&self) -> f64 {
        self.point_radius * marker::HIT_FACTOR
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from_config(&MeasureConfig::default())
    }
}

/// Text shown for an angle value
pub fn format_angle(angle: f64) -> String {
    format!("{angle:.1}°")
}

fn premultiplied(rgba: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = rgba;
    let c = ColorU8::from_rgba(r, g, b, a).premultiply();
    [c.red(), c.green(), c.blue(), c.alpha()]
}

/// Convert RgbaImage to Pixmap, apply drawing function, and copy back
///
/// `RgbaImage` holds straight alpha while tiny-skia works premultiplied, so
/// pixels are converted both ways. Pixels the drawing left alone keep their
/// exact original value.
fn with_pixmap(img: &mut RgbaImage, f: impl FnOnce(&mut Pixmap)) {
    let (w, h) = (img.width(), img.height());
    let Some(size) = tiny_skia::IntSize::from_wh(w, h) else {
        return;
    };
    let data = img.pixels().flat_map(|p| premultiplied(p.0)).collect();
    let Some(mut pixmap) = Pixmap::from_vec(data, size) else {
        return;
    };

    f(&mut pixmap);

    // Copy back
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let drawn = [src.red(), src.green(), src.blue(), src.alpha()];
        if drawn != premultiplied(dst.0) {
            let c = src.demultiply();
            dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
        }
    }
}

fn paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    let [r, g, b, a] = rgba;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn round_stroke(width: f64) -> Stroke {
    Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

fn stroke(pixmap: &mut Pixmap, path: &tiny_skia::Path, rgba: [u8; 4], width: f64) {
    pixmap.stroke_path(
        path,
        &paint(rgba),
        &round_stroke(width),
        Transform::identity(),
        None,
    );
}

fn fill(pixmap: &mut Pixmap, path: &tiny_skia::Path, rgba: [u8; 4]) {
    pixmap.fill_path(
        path,
        &paint(rgba),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
}

/// Build an open polyline through `points` in order
fn build_polyline_path(points: &[Position]) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    pb.finish()
}

fn circle_path(center: Position, radius: f64) -> Option<tiny_skia::Path> {
    PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32)
}

fn build_arc_path(center: Position, radius: f64, angle_arc: &AngleArc) -> Option<tiny_skia::Path> {
    build_polyline_path(&angle_arc.points(center, radius))
}

/// Build a rounded rectangle path using cubic bezier corners
fn build_rounded_rect_path(bounds: Bounds, radius: f64) -> Option<tiny_skia::Path> {
    let r = radius.min(bounds.width * 0.5).min(bounds.height * 0.5).max(0.0) as f32;
    let k = r * BEZIER_K as f32;
    let (l, t, rt, b) = (
        bounds.left as f32,
        bounds.top as f32,
        bounds.right() as f32,
        bounds.bottom() as f32,
    );

    let mut pb = PathBuilder::new();
    pb.move_to(l + r, t);
    pb.line_to(rt - r, t);
    pb.cubic_to(rt - r + k, t, rt, t + r - k, rt, t + r);
    pb.line_to(rt, b - r);
    pb.cubic_to(rt, b - r + k, rt - r + k, b, rt - r, b);
    pb.line_to(l + r, b);
    pb.cubic_to(l + r - k, b, l, b - r + k, l, b - r);
    pb.line_to(l, t + r);
    pb.cubic_to(l, t + r - k, l + r - k, t, l + r, t);
    pb.close();
    pb.finish()
}

/// Arc between the first and last landmark around the vertex, when all three exist
fn measured_arc(points: &[Position]) -> Option<(Position, AngleArc)> {
    let [first, vertex, last] = points else {
        return None;
    };
    AngleArc::between(*first, *vertex, *last).map(|a| (*vertex, a))
}

/// Draw the interactive overlay: lines, numbered markers, and the angle arc with its label
///
/// `angle` is only drawn for three points; `drag_index` gets a highlight ring.
pub fn draw_measurement_overlay(
    img: &mut RgbaImage,
    points: &[Position],
    angle: Option<f64>,
    drag_index: Option<usize>,
    style: &OverlayStyle,
) {
    if points.is_empty() {
        return;
    }

    with_pixmap(img, |pixmap| {
        if let Some(path) = build_polyline_path(points) {
            stroke(pixmap, &path, style.line_color, line::THICKNESS);
        }

        for (index, point) in points.iter().enumerate() {
            if let Some(path) = circle_path(*point, style.point_radius) {
                fill(pixmap, &path, style.point_color);
                stroke(pixmap, &path, WHITE, marker::OUTLINE);
            }

            if drag_index == Some(index)
                && let Some(ring) = circle_path(*point, style.point_radius + marker::DRAG_RING)
            {
                stroke(pixmap, &ring, style.point_color, marker::OUTLINE * 0.5);
            }

            text::fill_text_centered(
                pixmap,
                &(index + 1).to_string(),
                *point,
                marker::ORDINAL_SCALE,
                WHITE,
            );
        }

        if let Some(angle) = angle
            && let Some((vertex, angle_arc)) = measured_arc(points)
        {
            if let Some(path) = build_arc_path(vertex, style.arc_radius, &angle_arc) {
                stroke(pixmap, &path, style.arc_color, arc::THICKNESS);
            }
            let label_at = geometry::polar(
                vertex,
                angle_arc.bisector(),
                style.arc_radius + arc::LABEL_OFFSET,
            );
            text::fill_text_centered(
                pixmap,
                &format_angle(angle),
                label_at,
                arc::LABEL_SCALE,
                style.arc_color,
            );
        }
    });
}

/// Styling of a text label drawn inside a filled rounded box
struct TextBox {
    scale: u32,
    padding: f64,
    corner_radius: f64,
    background: [u8; 4],
    foreground: [u8; 4],
}

impl TextBox {
    /// Box size needed for `label`
    fn size(&self, label: &str) -> (f64, f64) {
        let (tw, th) = text::text_size(label, self.scale);
        (tw + self.padding * 2.0, th + self.padding * 2.0)
    }

    /// Draw `label` in `bounds` shifted inside the surface; returns the final bounds
    fn draw(&self, pixmap: &mut Pixmap, label: &str, bounds: Bounds) -> Bounds {
        let boxed = bounds.clamp_within(f64::from(pixmap.width()), f64::from(pixmap.height()));
        if let Some(path) = build_rounded_rect_path(boxed, self.corner_radius) {
            fill(pixmap, &path, self.background);
        }
        text::fill_text(
            pixmap,
            label,
            Position::new(boxed.left + self.padding, boxed.top + self.padding),
            self.scale,
            self.foreground,
        );
        boxed
    }
}

fn text_scale(base: f64, s: f64) -> u32 {
    ((base * s).round() as u32).max(base as u32)
}

/// Draw the archival annotations of a complete measurement
///
/// Heavier outlined strokes than the interactive canvas, anatomical labels
/// alternating above and below the markers, the angle in a rounded badge
/// beyond the arc, and `timestamp` as a watermark in the bottom-right corner.
pub fn draw_export_annotations(
    img: &mut RgbaImage,
    points: &[Position],
    angle: f64,
    timestamp: &str,
    style: &OverlayStyle,
) {
    if points.len() != LANDMARK_COUNT {
        return;
    }
    let s = geometry::export_scale(img.width(), img.height());
    let outline = export::OUTLINE * s;
    let radius = style.point_radius * export::MARKER_SCALE * s;
    let arc_radius = style.arc_radius * s;
    let padding = export::PADDING * s;
    let corner = export::CORNER_RADIUS * s;

    with_pixmap(img, |pixmap| {
        // Lines, dark outline first
        if let Some(path) = build_polyline_path(points) {
            let width = export::LINE_THICKNESS * s;
            stroke(pixmap, &path, SHADOW, width + outline * 2.0);
            stroke(pixmap, &path, style.line_color, width);
        }

        let vertex_arc = measured_arc(points);
        if let Some((vertex, angle_arc)) = vertex_arc
            && let Some(path) = build_arc_path(vertex, arc_radius, &angle_arc)
        {
            let width = export::ARC_THICKNESS * s;
            stroke(pixmap, &path, SHADOW, width + outline * 2.0);
            stroke(pixmap, &path, style.arc_color, width);
        }

        let ordinal_scale = text_scale(f64::from(marker::ORDINAL_SCALE), s);
        for (index, point) in points.iter().enumerate() {
            if let Some(path) = circle_path(*point, radius + outline) {
                fill(pixmap, &path, SHADOW);
            }
            if let Some(path) = circle_path(*point, radius) {
                fill(pixmap, &path, style.point_color);
                stroke(pixmap, &path, WHITE, marker::OUTLINE * s);
            }
            text::fill_text_centered(pixmap, &(index + 1).to_string(), *point, ordinal_scale, WHITE);
        }

        // Anatomical labels: even indices above their marker, odd below
        let label_box = TextBox {
            scale: text_scale(2.0, s),
            padding,
            corner_radius: corner,
            background: LABEL_BACKGROUND,
            foreground: WHITE,
        };
        for (index, point) in points.iter().enumerate() {
            let Some(landmark) = Landmark::from_index(index) else {
                continue;
            };
            let name = landmark.display_name();
            let (bw, bh) = label_box.size(name);
            let gap = radius + outline + export::LABEL_GAP * s;
            let center_y = if index % 2 == 0 {
                point.y - gap - bh * 0.5
            } else {
                point.y + gap + bh * 0.5
            };
            label_box.draw(
                pixmap,
                name,
                Bounds::centered(Position::new(point.x, center_y), bw, bh),
            );
        }

        // Angle badge along the arc bisector
        if let Some((vertex, angle_arc)) = vertex_arc {
            let badge = TextBox {
                scale: text_scale(3.0, s),
                padding,
                corner_radius: corner,
                background: BADGE_BACKGROUND,
                foreground: WHITE,
            };
            let label = format_angle(angle);
            let (bw, bh) = badge.size(&label);
            let distance = arc_radius + export::BADGE_OFFSET * s + bw.max(bh) * 0.5;
            let center = geometry::polar(vertex, angle_arc.bisector(), distance);
            let boxed = badge.draw(pixmap, &label, Bounds::centered(center, bw, bh));
            if let Some(path) = build_rounded_rect_path(boxed, corner) {
                stroke(pixmap, &path, style.arc_color, 2.0 * s);
            }
        }

        // Timestamp watermark
        let stamp = TextBox {
            scale: text_scale(2.0, s),
            padding,
            corner_radius: corner,
            background: WATERMARK_BACKGROUND,
            foreground: WATERMARK_TEXT,
        };
        let (bw, bh) = stamp.size(timestamp);
        let margin = export::MARGIN * s;
        let bounds = Bounds {
            left: f64::from(pixmap.width()) - margin - bw,
            top: f64::from(pixmap.height()) - margin - bh,
            width: bw,
            height: bh,
        };
        stamp.draw(pixmap, timestamp, bounds);
    });
}
