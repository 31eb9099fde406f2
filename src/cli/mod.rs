//! Command-line parsing for the job-monitor chart tool.
//!
//! Argument parsing stays here; turning arguments into a selection, a style
//! and a data source happens in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Action, Bound, Dimension, JobStatus};
use crate::plot::ChartStyle;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "jobplot", version, about = "Faceted training-curve charts for a job monitor")]
pub struct Cli {
    /// Use generated sample jobs instead of the GraphQL API.
    #[arg(long, global = true)]
    pub demo: bool,

    /// Seed for the sample jobs.
    #[arg(long, global = true, default_value_t = 42)]
    pub demo_seed: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List jobs grouped by experiment.
    Jobs(JobsArgs),
    /// Render the selected curves to an SVG file.
    Plot(PlotArgs),
    /// Re-render the SVG periodically as new data arrives.
    Watch(WatchArgs),
    /// Print last/min/max of every selected curve.
    Summary(SelectionArgs),
}

#[derive(Debug, Args, Clone)]
pub struct JobsArgs {
    /// Case-insensitive filter on job and experiment names.
    #[arg(long, default_value = "")]
    pub filter: String,

    /// Maximum number of jobs (0 = no limit).
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Only jobs with this status (QUEUE matches anything not yet finished).
    #[arg(long, value_enum)]
    pub status: Option<JobStatus>,
}

/// What to chart. Flags are applied on top of `--selection`, in the order
/// listed here.
#[derive(Debug, Args, Clone, Default)]
pub struct SelectionArgs {
    /// Start from a saved selection (JSON).
    #[arg(long, value_name = "JSON")]
    pub selection: Option<PathBuf>,

    /// Job id to include (repeatable).
    #[arg(short = 'j', long = "job", value_name = "ID")]
    pub jobs: Vec<String>,

    /// Measurement to include (repeatable).
    #[arg(short = 'm', long = "measurement", value_name = "NAME")]
    pub measurements: Vec<String>,

    /// Tag condition `key=value` (repeatable; all must hold).
    #[arg(short = 't', long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Property that splits curves into grid rows.
    #[arg(long, value_name = "PROPERTY")]
    pub row: Option<String>,

    /// Property that splits curves into grid columns.
    #[arg(long, value_name = "PROPERTY")]
    pub col: Option<String>,

    /// Property encoded as line color.
    #[arg(long, value_name = "PROPERTY")]
    pub hue: Option<String>,

    /// Property encoded as dash pattern.
    #[arg(long, value_name = "PROPERTY")]
    pub pattern: Option<String>,

    /// Point field on the x axis.
    #[arg(long, value_name = "FIELD")]
    pub x_field: Option<String>,

    /// Point field on the y axis.
    #[arg(long, value_name = "FIELD")]
    pub y_field: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub xmin: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub xmax: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub ymin: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub ymax: Option<f64>,

    /// Logarithmic y axis.
    #[arg(long)]
    pub log_y: bool,

    /// Line opacity in [0, 1].
    #[arg(long)]
    pub opacity: Option<f64>,

    /// Exponential smoothing weight in [0, 0.99].
    #[arg(long)]
    pub smoothing: Option<f64>,
}

impl SelectionArgs {
    /// The flags as reducer actions.
    pub fn actions(&self) -> Vec<Action> {
        let mut actions: Vec<Action> = Vec::new();
        actions.extend(self.jobs.iter().cloned().map(Action::SelectJob));
        actions.extend(self.measurements.iter().cloned().map(Action::SelectMeasurement));
        actions.extend(self.tags.iter().cloned().map(Action::AddTagFilter));
        for (dim, value) in [
            (Dimension::Row, &self.row),
            (Dimension::Col, &self.col),
            (Dimension::Hue, &self.hue),
            (Dimension::Pattern, &self.pattern),
        ] {
            if let Some(value) = value {
                actions.push(Action::SetDimension(dim, Some(value.clone())));
            }
        }
        if let Some(field) = &self.x_field {
            actions.push(Action::SetXField(field.clone()));
        }
        if let Some(field) = &self.y_field {
            actions.push(Action::SetYField(field.clone()));
        }
        for (bound, value) in [
            (Bound::XMin, self.xmin),
            (Bound::XMax, self.xmax),
            (Bound::YMin, self.ymin),
            (Bound::YMax, self.ymax),
        ] {
            if value.is_some() {
                actions.push(Action::SetBound(bound, value));
            }
        }
        if self.log_y {
            actions.push(Action::SetYLog(true));
        }
        if let Some(v) = self.opacity {
            actions.push(Action::SetOpacity(v));
        }
        if let Some(v) = self.smoothing {
            actions.push(Action::SetSmoothing(v));
        }
        actions
    }
}

/// Presentation options.
#[derive(Debug, Args, Clone)]
pub struct ChartArgs {
    /// Chart width in pixels.
    #[arg(long, default_value_t = 960)]
    pub width: u32,

    /// Chart height in pixels.
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    #[arg(long)]
    pub x_label: Option<String>,
    #[arg(long)]
    pub y_label: Option<String>,

    /// Text before every row header value.
    #[arg(long, default_value = "")]
    pub row_label_prefix: String,

    /// Text before every column header value.
    #[arg(long, default_value = "")]
    pub col_label_prefix: String,

    /// Title of the color legend (defaults to the hue property).
    #[arg(long)]
    pub hue_legend_name: Option<String>,

    #[arg(long)]
    pub no_hue_legend: bool,
    #[arg(long)]
    pub no_pattern_legend: bool,

    /// Let lines run outside their cell.
    #[arg(long)]
    pub no_clip: bool,

    /// Prefix for clip identifiers when several charts share a page.
    #[arg(long, default_value = "chart")]
    pub chart_id: String,

    #[arg(long, default_value_t = 1.5)]
    pub stroke_width: f64,
}

impl ChartArgs {
    pub fn style(&self) -> ChartStyle {
        ChartStyle {
            x_label: self.x_label.clone(),
            y_label: self.y_label.clone(),
            row_label_prefix: self.row_label_prefix.clone(),
            col_label_prefix: self.col_label_prefix.clone(),
            hue_legend_name: self.hue_legend_name.clone(),
            hue_show_legend: !self.no_hue_legend,
            pattern_show_legend: !self.no_pattern_legend,
            stroke_width: self.stroke_width,
            clip: !self.no_clip,
            chart_id: self.chart_id.clone(),
            ..ChartStyle::default()
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub chart: ChartArgs,

    /// Output SVG file.
    #[arg(short, long, default_value = "chart.svg")]
    pub output: PathBuf,

    /// Also write the effective selection as JSON, for reuse with `--selection`.
    #[arg(long, value_name = "JSON")]
    pub copy_selection: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub plot: PlotArgs,

    /// Seconds between refreshes.
    #[arg(long, default_value_t = 10.0)]
    pub interval: f64,

    /// Stop after this many refreshes (runs until interrupted otherwise).
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Concurrent requests allowed in flight.
    #[arg(long, default_value_t = 2)]
    pub workers: usize,
}
