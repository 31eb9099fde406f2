//! `jobplot` library crate.
//!
//! Faceted line charts of training-job metrics from a job-monitor API.
//! The binary is a thin wrapper around this library so that:
//!
//! - the recompute pipeline is testable without spawning processes
//! - data sources are swappable (GraphQL API, in-memory sample store)
//!
//! Flow: `domain::FacetSelection` -> `data::JobSource` -> `facet::flatten`
//! -> `plot::render_curves` -> `plot::render_svg`.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod facet;
pub mod io;
pub mod plot;
