//! Visual tree of a faceted chart.
//!
//! `render_curves` runs the whole faceting pipeline for one render pass and
//! returns plain geometry in absolute pixels: cells with their gridlines and
//! curve paths, shared axes, headers and legends. Nothing here draws; the
//! SVG writer in `plot::svg` walks the tree.
//!
//! The renderer keeps no state between passes except the optional cross-hair
//! position, which the caller passes back in.

use plotters::style::RGBColor;

use crate::domain::{Dimension, FacetSelection, MAX_SMOOTHING, Scalar};
use crate::facet::aggregate::xy_points;
use crate::facet::domain::{continuous_domain, dimension_domain};
use crate::facet::flatten::Curve;
use crate::facet::layout::{CellFrame, ContainerSize, GridLayout, Margin, belongs_to};
use crate::facet::scale::{CATEGORY10, DashPattern, hue_scale, pattern_scale};
use crate::plot::axis::{AxisScale, format_tick};

/// Height of one legend line above the grid.
pub const LEGEND_ROW_HEIGHT: f64 = 20.0;
/// Length of the stroke sample in a legend entry.
pub const LEGEND_SWATCH: f64 = 24.0;
/// Rough glyph width used to space legend entries.
const CHAR_WIDTH: f64 = 7.0;

/// Stroke colour used for pattern legend swatches.
pub const NEUTRAL: RGBColor = RGBColor(0x55, 0x55, 0x55);

pub type Line = [(f64, f64); 2];

/// Presentation options that are not part of the facet selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub margin: Margin,
    /// Defaults to the x field name.
    pub x_label: Option<String>,
    /// Defaults to the y field name.
    pub y_label: Option<String>,
    pub row_label_prefix: String,
    pub col_label_prefix: String,
    /// Defaults to the hue property name.
    pub hue_legend_name: Option<String>,
    pub hue_show_legend: bool,
    pub pattern_show_legend: bool,
    pub stroke_width: f64,
    pub clip: bool,
    /// Prefix of every clip identifier, so several charts on one page never
    /// share an id.
    pub chart_id: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            margin: Margin::default(),
            x_label: None,
            y_label: None,
            row_label_prefix: String::new(),
            col_label_prefix: String::new(),
            hue_legend_name: None,
            hue_show_legend: true,
            pattern_show_legend: true,
            stroke_width: 1.5,
            clip: true,
            chart_id: "chart".to_string(),
        }
    }
}

/// Result of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// The upstream query failed; show the message and nothing else.
    Failed { message: String },
    /// Nothing to draw.
    Empty { reason: String },
    Chart(Box<Scene>),
}

impl Rendered {
    pub fn scene(&self) -> Option<&Scene> {
        match self {
            Rendered::Chart(scene) => Some(scene),
            _ => None,
        }
    }
}

/// Data-space position of the cross-hair guide lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crosshair {
    pub x: f64,
    pub y: f64,
}

/// A pointer click in absolute pixels. Only modified clicks move the
/// cross-hair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub x: f64,
    pub y: f64,
    pub modifier: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub x: f64,
    /// Vertical centre of the text.
    pub y: f64,
    pub anchor: Anchor,
    /// Rotated a quarter turn counter-clockwise.
    pub vertical: bool,
}

impl Label {
    fn new(text: String, x: f64, y: f64, anchor: Anchor) -> Self {
        Self {
            text,
            x,
            y,
            anchor,
            vertical: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSide {
    Bottom,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    /// Where the tick meets the axis line.
    pub at: (f64, f64),
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub side: AxisSide,
    pub line: Line,
    pub ticks: Vec<Tick>,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    /// Left end of the swatch; the swatch is centred on the legend's `y`.
    pub x: f64,
    pub color: RGBColor,
    pub dash: DashPattern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: Label,
    pub y: f64,
    pub entries: Vec<LegendEntry>,
}

/// One curve as drawn in one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePath {
    pub curve_id: String,
    pub color: RGBColor,
    pub dash: DashPattern,
    pub opacity: f64,
    pub stroke_width: f64,
    /// Visible pieces of the polyline. Clipping can split a curve.
    pub segments: Vec<Vec<(f64, f64)>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub row_value: Option<Scalar>,
    pub col_value: Option<Scalar>,
    pub frame: CellFrame,
    /// `<chart_id>-clip-r<row>-c<col>` when clipping is on.
    pub clip_id: Option<String>,
    pub gridlines: Vec<Line>,
    pub paths: Vec<CurvePath>,
    pub crosshair: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub layout: GridLayout,
    /// Cell-local scales; every cell shares them.
    pub x_scale: AxisScale,
    pub y_scale: AxisScale,
    pub legends: Vec<Legend>,
    pub headers: Vec<Label>,
    pub axes: Vec<Axis>,
    pub cells: Vec<Cell>,
    pub crosshair: Option<Crosshair>,
}

impl Scene {
    /// Data-space position under a modified click, if it lands in a cell.
    pub fn crosshair_at(&self, click: Click) -> Option<Crosshair> {
        if !click.modifier {
            return None;
        }
        let frame = self.layout.cell_at(click.x, click.y)?;
        Some(Crosshair {
            x: self.x_scale.invert(click.x - frame.x),
            y: self.y_scale.invert(click.y - frame.y),
        })
    }

    pub fn path_count(&self) -> usize {
        self.cells.iter().map(|c| c.paths.len()).sum()
    }
}

/// A curve ready for placement: encodings resolved, points in cell-local
/// pixels.
struct Prepared<'a> {
    curve: &'a Curve,
    hue: &'a Scalar,
    pattern: &'a Scalar,
    color: RGBColor,
    dash: DashPattern,
    points: Vec<(f64, f64)>,
}

/// Lay out and encode a curve set.
///
/// Returns `Rendered::Empty` when there are no curves or no point has both a
/// usable x and y; never fails otherwise.
pub fn render_curves(
    curves: &[Curve],
    selection: &FacetSelection,
    size: ContainerSize,
    style: &ChartStyle,
    crosshair: Option<Crosshair>,
) -> Rendered {
    if curves.is_empty() {
        return Rendered::Empty {
            reason: "No curves match the selection.".to_string(),
        };
    }
    let x_domain = continuous_domain(curves, &selection.x_field, selection.x_bounds, false);
    let y_domain = continuous_domain(curves, &selection.y_field, selection.y_bounds, selection.y_log);
    let (Some(x_domain), Some(y_domain)) = (x_domain, y_domain) else {
        return Rendered::Empty {
            reason: format!("No points with both '{}' and '{}'.", selection.x_field, selection.y_field),
        };
    };

    let row_prop = selection.dimension(Dimension::Row);
    let col_prop = selection.dimension(Dimension::Col);
    let hue_prop = selection.dimension(Dimension::Hue);
    let pattern_prop = selection.dimension(Dimension::Pattern);

    let row_domain = dimension_domain(curves, row_prop);
    let col_domain = dimension_domain(curves, col_prop);
    let hues = hue_scale(dimension_domain(curves, hue_prop));
    let patterns = pattern_scale(dimension_domain(curves, pattern_prop));

    let mut legend_specs: Vec<(String, Vec<(String, RGBColor, DashPattern)>)> = Vec::new();
    if let Some(hue) = hue_prop.filter(|_| style.hue_show_legend) {
        let title = style.hue_legend_name.clone().unwrap_or_else(|| hue.to_string());
        let items = hues.entries().map(|(v, c)| (v.to_string(), c, DashPattern::Solid)).collect();
        legend_specs.push((title, items));
    }
    if let Some(pattern) = pattern_prop.filter(|_| style.pattern_show_legend) {
        let items = patterns.entries().map(|(v, d)| (v.to_string(), NEUTRAL, d)).collect();
        legend_specs.push((pattern.to_string(), items));
    }

    let mut margin = style.margin;
    margin.top += legend_specs.len() as f64 * LEGEND_ROW_HEIGHT;
    let layout = GridLayout::compute(row_domain.len(), col_domain.len(), size, margin);

    let x_scale = AxisScale::linear(x_domain, [0.0, layout.cell_width]);
    let y_range = [layout.cell_height, 0.0];
    let y_scale = if selection.y_log {
        AxisScale::log(y_domain, y_range)
    } else {
        AxisScale::linear(y_domain, y_range)
    };
    let x_ticks = x_scale.ticks(layout.x_ticks);
    let y_ticks = y_scale.ticks(layout.y_ticks);

    let prepared: Vec<Prepared> = curves
        .iter()
        .map(|curve| {
            let hue = hue_prop.map_or(&Scalar::Null, |p| curve.property(p));
            let pattern = pattern_prop.map_or(&Scalar::Null, |p| curve.property(p));
            Prepared {
                curve,
                hue,
                pattern,
                color: hues.get(hue).unwrap_or(CATEGORY10[0]),
                dash: patterns.get(pattern).unwrap_or(DashPattern::Solid),
                points: screen_points(curve, selection, &x_scale, &y_scale),
            }
        })
        .collect();

    let legends = legend_specs
        .into_iter()
        .enumerate()
        .map(|(i, (title, items))| legend(title, items, margin.left, LEGEND_ROW_HEIGHT * (i as f64 + 0.5)))
        .collect();

    let cells = layout
        .cells()
        .map(|frame| {
            let row_value = row_domain.get(frame.row).cloned();
            let col_value = col_domain.get(frame.col).cloned();
            let mut members: Vec<&Prepared> = prepared
                .iter()
                .filter(|p| belongs_to(p.curve, row_prop.zip(row_value.as_ref()), col_prop.zip(col_value.as_ref())))
                .collect();
            members.sort_by(|a, b| {
                a.hue
                    .cmp(b.hue)
                    .then_with(|| a.pattern.cmp(b.pattern))
                    .then_with(|| a.curve.id.cmp(&b.curve.id))
            });

            let paths = members
                .into_iter()
                .map(|p| CurvePath {
                    curve_id: p.curve.id.clone(),
                    color: p.color,
                    dash: p.dash,
                    opacity: selection.opacity,
                    stroke_width: style.stroke_width,
                    segments: place(&p.points, &frame, style.clip),
                })
                .collect();

            Cell {
                row: frame.row,
                col: frame.col,
                row_value,
                col_value,
                frame,
                clip_id: style
                    .clip
                    .then(|| format!("{}-clip-r{}-c{}", style.chart_id, frame.row, frame.col)),
                gridlines: gridlines(&frame, &x_scale, &y_scale, &x_ticks, &y_ticks),
                paths,
                crosshair: crosshair
                    .map(|c| guide_lines(&frame, &x_scale, &y_scale, c))
                    .unwrap_or_default(),
            }
        })
        .collect();

    let x_label = style.x_label.clone().unwrap_or_else(|| selection.x_field.clone());
    let y_label = style.y_label.clone().unwrap_or_else(|| selection.y_field.clone());
    let mut axes = Vec::new();
    for col in 0..layout.cols {
        let frame = layout.cell(layout.rows - 1, col);
        axes.push(bottom_axis(&frame, &x_scale, &x_ticks, x_label.clone()));
    }
    for row in 0..layout.rows {
        let frame = layout.cell(row, 0);
        axes.push(left_axis(&frame, &y_scale, &y_ticks, y_label.clone()));
    }

    let mut headers = Vec::new();
    if col_prop.is_some() {
        for (col, value) in col_domain.iter().enumerate() {
            let frame = layout.cell(0, col);
            headers.push(Label::new(
                format!("{}{value}", style.col_label_prefix),
                frame.x + frame.width / 2.0,
                frame.y - 8.0,
                Anchor::Middle,
            ));
        }
    }
    if row_prop.is_some() {
        for (row, value) in row_domain.iter().enumerate() {
            let frame = layout.cell(row, 0);
            headers.push(Label::new(
                format!("{}{value}", style.row_label_prefix),
                frame.x + 4.0,
                frame.y + 10.0,
                Anchor::Start,
            ));
        }
    }

    Rendered::Chart(Box::new(Scene {
        width: size.width,
        height: size.height,
        layout,
        x_scale,
        y_scale,
        legends,
        headers,
        axes,
        cells,
        crosshair,
    }))
}

/// Aggregated, optionally smoothed points of a curve in cell-local pixels.
fn screen_points(curve: &Curve, selection: &FacetSelection, x: &AxisScale, y: &AxisScale) -> Vec<(f64, f64)> {
    let mut points = xy_points(&curve.values, &selection.x_field, &selection.y_field);
    if selection.y_log {
        points.retain(|(_, v)| *v > 0.0);
    }
    smooth(&mut points, selection.smoothing);
    points
        .into_iter()
        .filter_map(|(px, py)| Some((x.map(px)?, y.map(py)?)))
        .collect()
}

/// Exponential moving average over the y values, in place.
pub fn smooth(points: &mut [(f64, f64)], weight: f64) {
    if !(weight > 0.0) {
        return;
    }
    let weight = weight.min(MAX_SMOOTHING);
    let mut last: Option<f64> = None;
    for (_, y) in points.iter_mut() {
        let s = match last {
            Some(prev) => weight * prev + (1.0 - weight) * *y,
            None => *y,
        };
        *y = s;
        last = Some(s);
    }
}

fn place(local: &[(f64, f64)], frame: &CellFrame, clip: bool) -> Vec<Vec<(f64, f64)>> {
    let absolute: Vec<(f64, f64)> = local.iter().map(|(x, y)| (frame.x + x, frame.y + y)).collect();
    if clip {
        clip_polyline(&absolute, frame)
    } else if absolute.len() >= 2 {
        vec![absolute]
    } else {
        Vec::new()
    }
}

/// Visible pieces of a polyline inside a cell frame.
pub fn clip_polyline(points: &[(f64, f64)], frame: &CellFrame) -> Vec<Vec<(f64, f64)>> {
    let mut out: Vec<Vec<(f64, f64)>> = Vec::new();
    for pair in points.windows(2) {
        let Some((a, b)) = clip_segment(pair[0], pair[1], frame) else {
            continue;
        };
        match out.last_mut() {
            Some(piece) if piece.last() == Some(&a) => piece.push(b),
            _ => out.push(vec![a, b]),
        }
    }
    out
}

/// Liang-Barsky clipping of one segment. Endpoints inside the frame are
/// returned unchanged.
pub fn clip_segment(a: (f64, f64), b: (f64, f64), frame: &CellFrame) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let edges = [
        (-dx, a.0 - frame.x),
        (dx, frame.x + frame.width - a.0),
        (-dy, a.1 - frame.y),
        (dy, frame.y + frame.height - a.1),
    ];
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| (a.0 + t * dx, a.1 + t * dy);
    let start = if t0 == 0.0 { a } else { at(t0) };
    let end = if t1 == 1.0 { b } else { at(t1) };
    Some((start, end))
}

fn gridlines(frame: &CellFrame, x: &AxisScale, y: &AxisScale, x_ticks: &[f64], y_ticks: &[f64]) -> Vec<Line> {
    let vertical = x_ticks.iter().filter_map(|t| x.map(*t)).map(|px| {
        let px = frame.x + px;
        [(px, frame.y), (px, frame.y + frame.height)]
    });
    let horizontal = y_ticks.iter().filter_map(|t| y.map(*t)).map(|py| {
        let py = frame.y + py;
        [(frame.x, py), (frame.x + frame.width, py)]
    });
    vertical.chain(horizontal).collect()
}

fn guide_lines(frame: &CellFrame, x: &AxisScale, y: &AxisScale, at: Crosshair) -> Vec<Line> {
    let mut lines = Vec::new();
    if let Some(px) = x.map(at.x).filter(|px| (0.0..=frame.width).contains(px)) {
        let px = frame.x + px;
        lines.push([(px, frame.y), (px, frame.y + frame.height)]);
    }
    if let Some(py) = y.map(at.y).filter(|py| (0.0..=frame.height).contains(py)) {
        let py = frame.y + py;
        lines.push([(frame.x, py), (frame.x + frame.width, py)]);
    }
    lines
}

fn bottom_axis(frame: &CellFrame, scale: &AxisScale, ticks: &[f64], label: String) -> Axis {
    let base = frame.y + frame.height;
    Axis {
        side: AxisSide::Bottom,
        line: [(frame.x, base), (frame.x + frame.width, base)],
        ticks: ticks
            .iter()
            .filter_map(|v| {
                let px = scale.map(*v)?;
                Some(Tick {
                    value: *v,
                    at: (frame.x + px, base),
                    text: format_tick(*v),
                })
            })
            .collect(),
        label: Label::new(label, frame.x + frame.width / 2.0, base + 34.0, Anchor::Middle),
    }
}

fn left_axis(frame: &CellFrame, scale: &AxisScale, ticks: &[f64], label: String) -> Axis {
    Axis {
        side: AxisSide::Left,
        line: [(frame.x, frame.y), (frame.x, frame.y + frame.height)],
        ticks: ticks
            .iter()
            .filter_map(|v| {
                let py = scale.map(*v)?;
                Some(Tick {
                    value: *v,
                    at: (frame.x, frame.y + py),
                    text: format_tick(*v),
                })
            })
            .collect(),
        label: Label {
            vertical: true,
            ..Label::new(label, frame.x - 52.0, frame.y + frame.height / 2.0, Anchor::Middle)
        },
    }
}

fn legend(title: String, items: Vec<(String, RGBColor, DashPattern)>, left: f64, y: f64) -> Legend {
    let mut x = left + text_width(&title) + 12.0;
    let entries = items
        .into_iter()
        .map(|(label, color, dash)| {
            let entry = LegendEntry {
                x,
                color,
                dash,
                label,
            };
            x += LEGEND_SWATCH + 6.0 + text_width(&entry.label) + 14.0;
            entry
        })
        .collect();
    Legend {
        title: Label::new(title, left, y, Anchor::Start),
        y,
        entries,
    }
}

fn text_width(text: &str) -> f64 {
    text.chars().count() as f64 * CHAR_WIDTH
}
