//! EXIF orientation codes and the oriented pixel surface

use image::RgbaImage;
use tiny_skia::Transform;

/// EXIF orientation (tag 0x0112), codes 1 through 8
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// 1: stored pixels are already upright
    #[default]
    Normal,
    /// 2: mirrored left to right
    FlipHorizontal,
    /// 3: rotated 180 degrees
    Rotate180,
    /// 4: mirrored top to bottom
    FlipVertical,
    /// 5: mirrored along the main diagonal
    Transpose,
    /// 6: needs a 90 degree clockwise rotation
    Rotate90,
    /// 7: mirrored along the anti-diagonal
    Transverse,
    /// 8: needs a 90 degree counter-clockwise rotation
    Rotate270,
}

impl Orientation {
    /// Map an EXIF orientation value, `None` when outside 1..=8
    pub fn from_exif(code: u16) -> Option<Self> {
        match code {
            1 => Some(Orientation::Normal),
            2 => Some(Orientation::FlipHorizontal),
            3 => Some(Orientation::Rotate180),
            4 => Some(Orientation::FlipVertical),
            5 => Some(Orientation::Transpose),
            6 => Some(Orientation::Rotate90),
            7 => Some(Orientation::Transverse),
            8 => Some(Orientation::Rotate270),
            _ => None,
        }
    }

    /// The EXIF code for this orientation
    pub fn code(self) -> u16 {
        match self {
            Orientation::Normal => 1,
            Orientation::FlipHorizontal => 2,
            Orientation::Rotate180 => 3,
            Orientation::FlipVertical => 4,
            Orientation::Transpose => 5,
            Orientation::Rotate90 => 6,
            Orientation::Transverse => 7,
            Orientation::Rotate270 => 8,
        }
    }

    /// Codes 5-8 contain a quarter turn, so the upright surface swaps width and height
    pub fn swaps_dimensions(self) -> bool {
        self.code() > 4
    }

    /// Upright surface size for a `width` x `height` source
    pub fn target_size(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Affine transform taking source pixel space (`width` x `height`) to the upright surface
    ///
    /// Rows are `(sx, ky, kx, sy, tx, ty)`, i.e. `x' = sx*x + kx*y + tx` and
    /// `y' = ky*x + sy*y + ty`.
    pub fn transform(self, width: u32, height: u32) -> Transform {
        let w = width as f32;
        let h = height as f32;
        match self {
            Orientation::Normal => Transform::identity(),
            Orientation::FlipHorizontal => Transform::from_row(-1.0, 0.0, 0.0, 1.0, w, 0.0),
            Orientation::Rotate180 => Transform::from_row(-1.0, 0.0, 0.0, -1.0, w, h),
            Orientation::FlipVertical => Transform::from_row(1.0, 0.0, 0.0, -1.0, 0.0, h),
            Orientation::Transpose => Transform::from_row(0.0, 1.0, 1.0, 0.0, 0.0, 0.0),
            Orientation::Rotate90 => Transform::from_row(0.0, 1.0, -1.0, 0.0, h, 0.0),
            Orientation::Transverse => Transform::from_row(0.0, -1.0, -1.0, 0.0, h, w),
            Orientation::Rotate270 => Transform::from_row(0.0, -1.0, 1.0, 0.0, 0.0, w),
        }
    }
}

/// An upright, size-bounded pixel surface
///
/// Produced once per import and never mutated afterwards; the measurement
/// engine draws onto copies of it.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientedImage {
    rgba: RgbaImage,
    /// Orientation that was corrected to produce this surface
    source_orientation: Orientation,
}

impl OrientedImage {
    /// Wrap an already upright surface
    pub fn new(rgba: RgbaImage, source_orientation: Orientation) -> Self {
        Self {
            rgba,
            source_orientation,
        }
    }

    /// Get the width of the image
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    /// Get the height of the image
    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    pub fn source_orientation(&self) -> Orientation {
        self.source_orientation
    }
}

impl From<RgbaImage> for OrientedImage {
    fn from(rgba: RgbaImage) -> Self {
        Self::new(rgba, Orientation::Normal)
    }
}
