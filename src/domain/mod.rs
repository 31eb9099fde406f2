//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the API data model (`Job`, `JobStatus`, `JobSeries`, `Timeseries`, `Scalar`)
//! - the facet selection state and its reducer (`FacetSelection`, `Action`)

pub mod selection;
pub mod types;

pub use selection::*;
pub use types::*;
