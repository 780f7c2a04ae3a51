//! Pure domain types with minimal dependencies
//!
//! This module contains the value types shared by the loader, the
//! measurement engine, and the session/export layer. Nothing here
//! touches rendering or the filesystem.

pub mod geometry;
pub mod landmark;
pub mod oriented;

pub use geometry::*;
pub use landmark::*;
pub use oriented::*;
