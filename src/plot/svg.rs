//! SVG output for a rendered chart.
//!
//! Uses Plotters' SVG backend directly on the root drawing area: the scene
//! already holds every coordinate in pixels, so no chart builder or mesh is
//! involved. Clipping has been applied geometrically while building the
//! scene; the writer only strokes what is left.

use plotters::coord::Shift;
use plotters::element::DashedPathElement;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::error::AppError;
use crate::facet::layout::ContainerSize;
use crate::facet::scale::DashPattern;
use crate::plot::scene::{Anchor, Axis, AxisSide, Label, LEGEND_SWATCH, Rendered, Scene};

const FONT: &str = "sans-serif";
const TICK_LEN: i32 = 4;

const CELL_BACKGROUND: RGBColor = RGBColor(0xf4, 0xf4, 0xf4);
const GRID: RGBColor = RGBColor(0xdd, 0xdd, 0xdd);
const AXIS: RGBColor = RGBColor(0x44, 0x44, 0x44);
const GUIDE: RGBColor = RGBColor(0x99, 0x99, 0x99);
const ERROR_TEXT: RGBColor = RGBColor(0xb0, 0x20, 0x20);

/// Render a chart, or its placeholder, as a standalone SVG document.
pub fn render_svg(rendered: &Rendered, size: ContainerSize) -> Result<String, AppError> {
    let (width, height) = match rendered {
        Rendered::Chart(scene) => (scene.width, scene.height),
        _ => (size.width, size.height),
    };
    let dims = (px_u32(width), px_u32(height));

    let mut out = String::new();
    {
        let root = SVGBackend::with_string(&mut out, dims).into_drawing_area();
        let result = match rendered {
            Rendered::Chart(scene) => draw_scene(&root, scene),
            Rendered::Failed { message } => draw_placeholder(&root, dims, message, ERROR_TEXT),
            Rendered::Empty { reason } => draw_placeholder(&root, dims, reason, AXIS),
        };
        result
            .and_then(|()| root.present())
            .map_err(|e| AppError::new(4, format!("Failed to draw chart: {e}")))?;
    }
    Ok(out)
}

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// An inert message and nothing else.
fn draw_placeholder<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    dims: (u32, u32),
    message: &str,
    color: RGBColor,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let style = (FONT, 14).into_font().color(&color).pos(Pos::new(HPos::Center, VPos::Center));
    root.draw(&Text::new(
        message.to_string(),
        (dims.0 as i32 / 2, dims.1 as i32 / 2),
        style,
    ))
}

fn draw_scene<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, scene: &Scene) -> DrawResult<DB> {
    root.fill(&WHITE)?;

    for cell in &scene.cells {
        let f = cell.frame;
        root.draw(&Rectangle::new(
            [px(f.x, f.y), px(f.x + f.width, f.y + f.height)],
            CELL_BACKGROUND.filled(),
        ))?;
        for line in &cell.gridlines {
            root.draw(&PathElement::new(vec![px(line[0].0, line[0].1), px(line[1].0, line[1].1)], GRID))?;
        }
        for path in &cell.paths {
            let style = path.color.mix(path.opacity).stroke_width(px_u32(path.stroke_width).max(1));
            for segment in &path.segments {
                let points: Vec<(i32, i32)> = segment.iter().map(|(x, y)| px(*x, *y)).collect();
                match path.dash {
                    DashPattern::Solid => root.draw(&PathElement::new(points, style))?,
                    DashPattern::Dashed { dash, gap } => {
                        root.draw(&DashedPathElement::new(points.into_iter(), dash, gap, style))?
                    }
                }
            }
        }
        for line in &cell.crosshair {
            let guide = [px(line[0].0, line[0].1), px(line[1].0, line[1].1)];
            root.draw(&DashedPathElement::new(guide.into_iter(), 3, 3, GUIDE))?;
        }
    }

    for axis in &scene.axes {
        draw_axis(root, axis)?;
    }
    for header in &scene.headers {
        draw_label(root, header, 12, &BLACK)?;
    }
    for legend in &scene.legends {
        draw_label(root, &legend.title, 12, &BLACK)?;
        let y = legend.y;
        for entry in &legend.entries {
            let swatch = vec![px(entry.x, y), px(entry.x + LEGEND_SWATCH, y)];
            let style = entry.color.stroke_width(2);
            match entry.dash {
                DashPattern::Solid => root.draw(&PathElement::new(swatch, style))?,
                DashPattern::Dashed { dash, gap } => {
                    root.draw(&DashedPathElement::new(swatch.into_iter(), dash, gap, style))?
                }
            }
            let text = Label {
                text: entry.label.clone(),
                x: entry.x + LEGEND_SWATCH + 6.0,
                y,
                anchor: Anchor::Start,
                vertical: false,
            };
            draw_label(root, &text, 11, &AXIS)?;
        }
    }
    Ok(())
}

fn draw_axis<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, axis: &Axis) -> DrawResult<DB> {
    let [a, b] = axis.line;
    root.draw(&PathElement::new(vec![px(a.0, a.1), px(b.0, b.1)], AXIS))?;
    for tick in &axis.ticks {
        let (x, y) = px(tick.at.0, tick.at.1);
        let (mark, text_at, anchor) = match axis.side {
            AxisSide::Bottom => (
                vec![(x, y), (x, y + TICK_LEN)],
                (x, y + TICK_LEN + 8),
                Pos::new(HPos::Center, VPos::Center),
            ),
            AxisSide::Left => (
                vec![(x - TICK_LEN, y), (x, y)],
                (x - TICK_LEN - 3, y),
                Pos::new(HPos::Right, VPos::Center),
            ),
        };
        root.draw(&PathElement::new(mark, AXIS))?;
        let style = (FONT, 10).into_font().color(&AXIS).pos(anchor);
        root.draw(&Text::new(tick.text.clone(), text_at, style))?;
    }
    draw_label(root, &axis.label, 12, &BLACK)
}

fn draw_label<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    label: &Label,
    size: u32,
    color: &RGBColor,
) -> DrawResult<DB> {
    let h = match label.anchor {
        Anchor::Start => HPos::Left,
        Anchor::Middle => HPos::Center,
        Anchor::End => HPos::Right,
    };
    let font = if label.vertical {
        (FONT, size).into_font().transform(FontTransform::Rotate270)
    } else {
        (FONT, size).into_font()
    };
    let style = font.color(color).pos(Pos::new(h, VPos::Center));
    root.draw(&Text::new(label.text.clone(), px(label.x, label.y), style))
}

fn px(x: f64, y: f64) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

fn px_u32(v: f64) -> u32 {
    if v.is_finite() { v.round().max(1.0) as u32 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, ConfigEntry, Dimension, FacetSelection, JobSeries, Point, Scalar, Timeseries};
    use crate::facet::flatten::flatten;
    use crate::plot::scene::{ChartStyle, render_curves};

    fn point(x: f64, y: f64) -> Point {
        [("epoch".to_string(), Scalar::Num(x)), ("value".to_string(), Scalar::Num(y))]
            .into_iter()
            .collect()
    }

    fn scene() -> Rendered {
        let jobs: Vec<JobSeries> = ["a", "b"]
            .iter()
            .enumerate()
            .map(|(i, id)| JobSeries {
                id: id.to_string(),
                experiment: "exp".to_string(),
                job: format!("run-{id}"),
                config: vec![ConfigEntry { key: "lr".to_string(), value: Scalar::Num(0.1 * (i + 1) as f64) }],
                timeseries: vec![Timeseries {
                    measurement: "loss".to_string(),
                    tags: Default::default(),
                    values: Some(vec![point(0.0, 1.0), point(1.0, 0.5), point(2.0, 0.2)]),
                }],
            })
            .collect();
        let selection = FacetSelection::default().reduce_all([
            Action::ToggleMeasurement("loss".to_string()),
            Action::SetDimension(Dimension::Hue, Some("jobId".to_string())),
            Action::SetDimension(Dimension::Pattern, Some("lr".to_string())),
        ]);
        render_curves(
            &flatten(&jobs),
            &selection,
            ContainerSize::new(640.0, 360.0),
            &ChartStyle::default(),
            None,
        )
    }

    #[test]
    fn chart_renders_to_svg_with_lines_and_labels() {
        let svg = render_svg(&scene(), ContainerSize::new(1.0, 1.0)).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("width=\"640\""));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("<rect"));
        let texts = text_contents(&svg);
        assert!(texts.iter().any(|t| t == "epoch"), "{texts:?}");
        assert!(texts.iter().any(|t| t == "jobId"), "{texts:?}");
    }

    /// Trimmed content of every `<text>` element; the backend may put the
    /// content on its own line.
    fn text_contents(svg: &str) -> Vec<String> {
        svg.split("<text")
            .skip(1)
            .filter_map(|rest| {
                let body = &rest[rest.find('>')? + 1..];
                let end = body.find("</text>")?;
                Some(body[..end].trim().to_string())
            })
            .collect()
    }

    #[test]
    fn failure_renders_only_the_message() {
        let rendered = Rendered::Failed {
            message: "query failed".to_string(),
        };
        let svg = render_svg(&rendered, ContainerSize::new(300.0, 200.0)).unwrap();
        assert!(svg.contains("query failed"));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn empty_renders_a_placeholder_of_the_container_size() {
        let rendered = Rendered::Empty {
            reason: "No measurements selected".to_string(),
        };
        let svg = render_svg(&rendered, ContainerSize::new(300.0, 200.0)).unwrap();
        assert!(svg.contains("width=\"300\""));
        assert!(svg.contains("No measurements selected"));
        assert!(!svg.contains("<polyline"));
    }
}
