//! Ankle angle measurement on orientation-corrected photos
//!
//! Images are decoded with their EXIF orientation applied and bounded in
//! size ([`import`]), measured by placing three anatomical landmarks
//! ([`measurement`]), and exported with an annotated copy ([`session`]).

pub mod config;
pub mod domain;
pub mod exif;
pub mod import;
pub mod measurement;
pub mod render;
pub mod session;
