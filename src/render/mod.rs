//! Measurement rendering module
//!
//! This module contains:
//! - Geometry calculations shared between the interactive canvas and export image
//! - Overlay rendering using tiny-skia
//! - Bitmap text for labels

pub mod geometry;
pub mod image;
pub mod text;

pub use self::image::{OverlayStyle, draw_export_annotations, draw_measurement_overlay, format_angle};
