//! Photo import: decode, bound the size, and correct EXIF orientation
//!
//! The loader produces an [`OrientedImage`] whose longest side never exceeds
//! the configured maximum. Imports then sit in a [`PendingImport`] until the
//! operator has ticked the quality checklist.

use std::path::Path;

use image::RgbaImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::config::MeasureConfig;
use crate::domain::{OrientedImage, Orientation};
use crate::exif::parse_exif_orientation;

/// Default longest side of an imported surface
pub const DEFAULT_MAX_DIMENSION: u32 = 2048;

/// Import failures surfaced to the operator
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read image file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image file is empty")]
    Empty,
}

/// Scale `width` x `height` down so neither side exceeds `max_dimension`
///
/// Sizes already within the bound are returned unchanged; otherwise both sides
/// are scaled by the same ratio and rounded to the nearest pixel.
pub fn compute_bounded_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    if width == 0 || height == 0 {
        return (width.min(max_dimension), height.min(max_dimension));
    }

    let ratio = (max_dimension as f64 / width as f64).min(max_dimension as f64 / height as f64);
    let scaled_w = ((width as f64 * ratio).round() as u32).clamp(1, max_dimension);
    let scaled_h = ((height as f64 * ratio).round() as u32).clamp(1, max_dimension);
    (scaled_w, scaled_h)
}

/// Draw `source`, scaled to `width` x `height`, onto an upright surface
///
/// The target is `height` x `width` for quarter-turn orientations. Each target
/// pixel center is mapped back through the inverse of the orientation's
/// affine transform, so the result is an exact pixel permutation of the
/// scaled source.
pub fn render_oriented(
    source: &RgbaImage,
    width: u32,
    height: u32,
    orientation: Orientation,
) -> OrientedImage {
    if width == 0 || height == 0 {
        let (target_w, target_h) = orientation.target_size(width, height);
        return OrientedImage::new(RgbaImage::new(target_w, target_h), orientation);
    }

    let scaled;
    let source = if source.dimensions() == (width, height) {
        source
    } else {
        log::debug!(
            "Downsampling {}x{} to {}x{}",
            source.width(),
            source.height(),
            width,
            height
        );
        scaled = image::imageops::resize(source, width, height, FilterType::Triangle);
        &scaled
    };

    let (target_w, target_h) = orientation.target_size(width, height);
    let mut target = RgbaImage::new(target_w, target_h);

    // All table entries are signed permutations, so they are always invertible
    let Some(inverse) = orientation.transform(width, height).invert() else {
        log::warn!("Orientation transform for {:?} is not invertible", orientation);
        return OrientedImage::new(source.clone(), Orientation::Normal);
    };

    for ty in 0..target_h {
        for tx in 0..target_w {
            let cx = tx as f32 + 0.5;
            let cy = ty as f32 + 0.5;
            let sx = inverse.sx * cx + inverse.kx * cy + inverse.tx;
            let sy = inverse.ky * cx + inverse.sy * cy + inverse.ty;
            let sx = (sx.floor().max(0.0) as u32).min(width - 1);
            let sy = (sy.floor().max(0.0) as u32).min(height - 1);
            target.put_pixel(tx, ty, *source.get_pixel(sx, sy));
        }
    }

    OrientedImage::new(target, orientation)
}

/// Turns user-selected image files into upright, size-bounded surfaces
///
/// One loader is created per session from [`MeasureConfig`].
#[derive(Clone, Copy, Debug)]
pub struct ImageOrientationLoader {
    max_dimension: u32,
}

impl Default for ImageOrientationLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl ImageOrientationLoader {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    pub fn from_config(config: &MeasureConfig) -> Self {
        Self::new(config.max_dimension)
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Read and import an image file
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<OrientedImage, ImportError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        log::debug!("Read {} bytes from {}", bytes.len(), path.display());
        self.load_bytes(&bytes)
    }

    /// Import an in-memory image file
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<OrientedImage, ImportError> {
        if bytes.is_empty() {
            return Err(ImportError::Empty);
        }

        let orientation = parse_exif_orientation(bytes);
        let decoded = image::load_from_memory(bytes)
            .inspect_err(|err| log::warn!("Image decode failed: {}", err))?
            .to_rgba8();

        let (width, height) =
            compute_bounded_size(decoded.width(), decoded.height(), self.max_dimension);
        let oriented = render_oriented(&decoded, width, height, orientation);
        log::debug!(
            "Imported {}x{} image as {}x{} (orientation {})",
            decoded.width(),
            decoded.height(),
            oriented.width(),
            oriented.height(),
            orientation.code()
        );
        Ok(oriented)
    }
}

/// Quality checks the operator confirms before an imported photo is measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportChecklist {
    /// Photo was taken from the side
    pub side_view: bool,
    /// Whole foot visible, from below the knee to the toes
    pub whole_foot: bool,
    /// No obvious lens or perspective distortion
    pub no_distortion: bool,
}

/// A single checklist item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportCheck {
    SideView,
    WholeFoot,
    NoDistortion,
}

impl ImportChecklist {
    pub fn set(&mut self, check: ImportCheck, value: bool) {
        match check {
            ImportCheck::SideView => self.side_view = value,
            ImportCheck::WholeFoot => self.whole_foot = value,
            ImportCheck::NoDistortion => self.no_distortion = value,
        }
    }

    /// All items ticked
    pub fn all_checked(&self) -> bool {
        self.side_view && self.whole_foot && self.no_distortion
    }

    /// Checklist with every item ticked
    pub fn all() -> Self {
        Self {
            side_view: true,
            whole_foot: true,
            no_distortion: true,
        }
    }
}

/// An imported image awaiting the operator's checklist confirmation
#[derive(Debug)]
pub struct PendingImport {
    image: OrientedImage,
    checklist: ImportChecklist,
}

/// An import the operator has confirmed
#[derive(Debug, Clone)]
pub struct ConfirmedImport {
    pub image: OrientedImage,
    pub checklist: ImportChecklist,
}

impl PendingImport {
    /// Start a confirmation with a cleared checklist
    pub fn new(image: OrientedImage) -> Self {
        Self {
            image,
            checklist: ImportChecklist::default(),
        }
    }

    pub fn image(&self) -> &OrientedImage {
        &self.image
    }

    pub fn checklist(&self) -> ImportChecklist {
        self.checklist
    }

    pub fn set_check(&mut self, check: ImportCheck, value: bool) {
        self.checklist.set(check, value);
    }

    pub fn can_confirm(&self) -> bool {
        self.checklist.all_checked()
    }

    /// Release the image once every check is ticked; otherwise hand the pending import back
    pub fn confirm(self) -> Result<ConfirmedImport, PendingImport> {
        if !self.can_confirm() {
            return Err(self);
        }
        Ok(ConfirmedImport {
            image: self.image,
            checklist: self.checklist,
        })
    }

    /// Abandon the import, discarding the loaded surface
    pub fn cancel(self) {
        log::debug!(
            "Import cancelled, discarding {}x{} image",
            self.image.width(),
            self.image.height()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::tests::insert_orientation;
    use image::{DynamicImage, ImageFormat, Rgba};
    use std::io::Cursor;

    /// Image where every pixel encodes its own coordinates
    fn coordinate_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 7, 255]))
    }

    fn encode(img: &RgbaImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
        rgb.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_bounded_size_clamps_long_side() {
        assert_eq!(compute_bounded_size(4000, 3000, 2048), (2048, 1536));
        assert_eq!(compute_bounded_size(3000, 4000, 2048), (1536, 2048));
    }

    #[test]
    fn test_bounded_size_keeps_small_images() {
        assert_eq!(compute_bounded_size(800, 600, 2048), (800, 600));
        assert_eq!(compute_bounded_size(2048, 2048, 2048), (2048, 2048));
    }

    #[test]
    fn test_bounded_size_never_collapses_to_zero() {
        assert_eq!(compute_bounded_size(10000, 1, 100), (100, 1));
    }

    #[test]
    fn test_render_matches_reference_orientation() {
        // The affine table must agree with the image crate's EXIF semantics
        let source = coordinate_image(5, 3);
        for code in 1..=8u16 {
            let orientation = Orientation::from_exif(code).unwrap();
            let rendered = render_oriented(&source, 5, 3, orientation);

            let mut reference = DynamicImage::ImageRgba8(source.clone());
            reference.apply_orientation(
                image::metadata::Orientation::from_exif(code as u8).unwrap(),
            );
            let reference = reference.to_rgba8();

            assert_eq!(rendered.rgba().dimensions(), reference.dimensions(), "code {code}");
            assert_eq!(rendered.rgba().as_raw(), reference.as_raw(), "code {code}");
            assert_eq!(rendered.source_orientation(), orientation);
        }
    }

    #[test]
    fn test_render_then_inverse_restores_corners() {
        let source = coordinate_image(6, 4);
        let inverse = |o: Orientation| match o {
            Orientation::Rotate90 => Orientation::Rotate270,
            Orientation::Rotate270 => Orientation::Rotate90,
            other => other,
        };
        for code in 1..=8u16 {
            let orientation = Orientation::from_exif(code).unwrap();
            let upright = render_oriented(&source, 6, 4, orientation);
            let (w, h) = upright.rgba().dimensions();
            let restored = render_oriented(upright.rgba(), w, h, inverse(orientation));

            assert_eq!(restored.rgba().dimensions(), (6, 4), "code {code}");
            for (x, y) in [(0, 0), (5, 0), (0, 3), (5, 3)] {
                assert_eq!(
                    restored.rgba().get_pixel(x, y),
                    source.get_pixel(x, y),
                    "code {code} corner ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn test_rotate90_pixel_mapping() {
        let source = coordinate_image(4, 2);
        let upright = render_oriented(&source, 4, 2, Orientation::Rotate90);
        assert_eq!(upright.rgba().dimensions(), (2, 4));
        // Source top-left ends up top-right
        assert_eq!(upright.rgba().get_pixel(1, 0), source.get_pixel(0, 0));
        // Source bottom-left ends up top-left
        assert_eq!(upright.rgba().get_pixel(0, 0), source.get_pixel(0, 1));
    }

    #[test]
    fn test_render_downsamples_before_orienting() {
        let source = RgbaImage::from_pixel(40, 20, Rgba([200, 10, 10, 255]));
        let upright = render_oriented(&source, 20, 10, Orientation::Rotate270);
        assert_eq!(upright.rgba().dimensions(), (10, 20));
        assert_eq!(upright.rgba().get_pixel(5, 5), &Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn test_load_png_is_bounded() {
        let bytes = encode(&coordinate_image(200, 100), ImageFormat::Png);
        let loader = ImageOrientationLoader::new(64);
        let image = loader.load_bytes(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (64, 32));
        assert_eq!(image.source_orientation(), Orientation::Normal);
    }

    #[test]
    fn test_load_jpeg_applies_exif_rotation() {
        let jpeg = encode(&coordinate_image(40, 20), ImageFormat::Jpeg);
        let bytes = insert_orientation(&jpeg, 6);
        let image = ImageOrientationLoader::default().load_bytes(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (20, 40));
        assert_eq!(image.source_orientation(), Orientation::Rotate90);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let loader = ImageOrientationLoader::default();
        assert!(matches!(loader.load_bytes(&[]), Err(ImportError::Empty)));
        assert!(matches!(
            loader.load_bytes(b"definitely not an image"),
            Err(ImportError::Decode(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageOrientationLoader::default().load_path(dir.path().join("missing.jpg"));
        assert!(matches!(result, Err(ImportError::Read(_))));
    }

    #[test]
    fn test_pending_import_requires_full_checklist() {
        let image = OrientedImage::from(coordinate_image(4, 4));
        let mut pending = PendingImport::new(image);
        assert!(!pending.can_confirm());

        pending.set_check(ImportCheck::SideView, true);
        pending.set_check(ImportCheck::WholeFoot, true);
        let mut pending = pending.confirm().unwrap_err();
        // A refused confirmation keeps the surface and the ticks so far
        assert_eq!(pending.image().rgba(), &coordinate_image(4, 4));
        assert!(pending.checklist().side_view && pending.checklist().whole_foot);
        assert!(!pending.checklist().no_distortion);

        pending.set_check(ImportCheck::NoDistortion, true);
        let confirmed = pending.confirm().unwrap();
        assert_eq!(confirmed.checklist, ImportChecklist::all());
        assert_eq!(confirmed.image.width(), 4);
    }

    #[test]
    fn test_unticking_blocks_confirmation_again() {
        let mut pending = PendingImport::new(OrientedImage::from(coordinate_image(2, 2)));
        for check in [ImportCheck::SideView, ImportCheck::WholeFoot, ImportCheck::NoDistortion] {
            pending.set_check(check, true);
        }
        pending.set_check(ImportCheck::WholeFoot, false);
        assert!(!pending.can_confirm());
        assert!(!pending.checklist().whole_foot);
        pending.cancel();
    }
}
