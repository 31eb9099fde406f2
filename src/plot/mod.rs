//! Chart rendering.
//!
//! - numeric axis scales and ticks (`axis`)
//! - the visual tree of a faceted chart (`scene`)
//! - SVG output via Plotters (`svg`)

pub mod axis;
pub mod scene;
pub mod svg;

pub use scene::{ChartStyle, Click, Crosshair, Rendered, Scene, render_curves};
pub use svg::render_svg;
