//! File output: rendered charts and saved selections.
//!
//! A saved selection is the JSON form of `FacetSelection`; writing one and
//! passing it back with `--selection` reproduces the chart.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::FacetSelection;
use crate::error::AppError;

/// Write an SVG document, replacing any previous file.
pub fn write_svg(path: &Path, svg: &str) -> Result<(), AppError> {
    fs::write(path, svg)
        .map_err(|e| AppError::new(2, format!("Failed to write SVG '{}': {e}", path.display())))?;
    info!(path = %path.display(), bytes = svg.len(), "wrote chart");
    Ok(())
}

pub fn write_selection_json(path: &Path, selection: &FacetSelection) -> Result<(), AppError> {
    let text = selection.to_json()?;
    fs::write(path, text)
        .map_err(|e| AppError::new(2, format!("Failed to write selection JSON '{}': {e}", path.display())))
}

pub fn read_selection_json(path: &Path) -> Result<FacetSelection, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to open selection JSON '{}': {e}", path.display())))?;
    FacetSelection::from_json(&text)
}
