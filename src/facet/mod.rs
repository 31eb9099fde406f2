//! Faceting: from a series query result to curves grouped into cells.
//!
//! Control flow per render: `flatten` -> `domain` -> `layout` ->
//! (per cell) `aggregate` -> `scale`. The renderer in `plot::scene` drives it.

pub mod aggregate;
pub mod domain;
pub mod flatten;
pub mod layout;
pub mod scale;

pub use flatten::{Curve, flatten};
