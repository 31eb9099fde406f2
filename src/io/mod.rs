//! Input/output helpers.
//!
//! - SVG output (`export::write_svg`)
//! - selection JSON read/write (`export`)

pub mod export;

pub use export::*;
