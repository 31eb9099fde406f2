//! Row x column grid of plot cells.
//!
//! Every cell has the same size. Given the container size and the margins,
//!
//! `rows * cell_height + (rows - 1) * row_gutter + top + bottom = height`
//!
//! and symmetrically for columns. Cells never get a negative size: a container
//! smaller than its margins yields zero-sized cells.

use serde::{Deserialize, Serialize};

use crate::domain::Scalar;
use crate::facet::flatten::Curve;

/// Pixels of cell width per x tick.
pub const X_TICK_SPACING: f64 = 80.0;
/// Pixels of cell height per y tick.
pub const Y_TICK_SPACING: f64 = 40.0;

/// Space around the grid and between cells, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    /// Gap between rows.
    pub row: f64,
    /// Gap between columns.
    pub col: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            left: 70.0,
            right: 20.0,
            top: 30.0,
            bottom: 50.0,
            row: 30.0,
            col: 30.0,
        }
    }
}

/// Size of the hosting container in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl ContainerSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Position of one cell in absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellFrame {
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CellFrame {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    pub cell_width: f64,
    pub cell_height: f64,
    pub x_ticks: usize,
    pub y_ticks: usize,
    pub margin: Margin,
}

impl GridLayout {
    /// Lay out `rows x cols` cells; zero rows or columns count as one.
    pub fn compute(rows: usize, cols: usize, size: ContainerSize, margin: Margin) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let cell_width = cell_extent(size.width, margin.left + margin.right, margin.col, cols);
        let cell_height = cell_extent(size.height, margin.top + margin.bottom, margin.row, rows);
        Self {
            rows,
            cols,
            cell_width,
            cell_height,
            x_ticks: tick_count(cell_width, X_TICK_SPACING),
            y_ticks: tick_count(cell_height, Y_TICK_SPACING),
            margin,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> CellFrame {
        CellFrame {
            row,
            col,
            x: self.margin.left + col as f64 * (self.cell_width + self.margin.col),
            y: self.margin.top + row as f64 * (self.cell_height + self.margin.row),
            width: self.cell_width,
            height: self.cell_height,
        }
    }

    /// All cells, row by row.
    pub fn cells(&self) -> impl Iterator<Item = CellFrame> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| self.cell(row, col)))
    }

    /// Cell under an absolute pixel position.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<CellFrame> {
        self.cells().find(|cell| cell.contains(x, y))
    }
}

fn cell_extent(available: f64, margins: f64, gutter: f64, count: usize) -> f64 {
    let gutters = gutter * (count.saturating_sub(1)) as f64;
    let extent = (available - margins - gutters) / count as f64;
    if extent.is_finite() { extent.max(0.0) } else { 0.0 }
}

/// Number of axis ticks for a cell side: one per `spacing` pixels, at least 2.
pub fn tick_count(pixels: f64, spacing: f64) -> usize {
    if !(pixels.is_finite() && spacing > 0.0) {
        return 2;
    }
    ((pixels / spacing).floor() as usize).max(2)
}

/// Whether a curve belongs to the cell of the given row/column values.
///
/// An unbound dimension (`None`) accepts every curve.
pub fn belongs_to(curve: &Curve, row: Option<(&str, &Scalar)>, col: Option<(&str, &Scalar)>) -> bool {
    let matches = |dim: Option<(&str, &Scalar)>| match dim {
        Some((property, value)) => curve.property(property) == value,
        None => true,
    };
    matches(row) && matches(col)
}
