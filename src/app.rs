//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging
//! - parses CLI arguments
//! - picks a data source (GraphQL API or generated sample jobs)
//! - builds the facet selection from a saved file plus flags
//! - runs the recompute pipeline and writes its output

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, JobsArgs, PlotArgs, SelectionArgs, WatchArgs};
use crate::data::graphql::GraphqlClient;
use crate::data::sample::{SampleConfig, generate_store};
use crate::data::status::severity;
use crate::data::{JobQuery, JobSource, summarize};
use crate::domain::{Action, FacetSelection, Job};
use crate::error::AppError;
use crate::facet::domain::interesting_properties;
use crate::facet::flatten;
use crate::facet::layout::ContainerSize;
use crate::plot::render_svg;

pub mod pipeline;
pub mod refresh;

use pipeline::RenderRequest;
use refresh::WatchOptions;

/// Entry point for the `jobplot` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();
    let cli = Cli::parse();
    let source = build_source(&cli)?;
    let default_jobs = match cli.command {
        Command::Jobs(_) => Vec::new(),
        _ => demo_job_ids(&cli, source.as_ref())?,
    };

    match cli.command {
        Command::Jobs(args) => handle_jobs(source.as_ref(), &args),
        Command::Plot(args) => handle_plot(source.as_ref(), &args, &default_jobs),
        Command::Watch(args) => handle_watch(source, &args, &default_jobs),
        Command::Summary(args) => handle_summary(source.as_ref(), &args, &default_jobs),
    }
}

/// Logs go to stderr so stdout stays clean for listings. `RUST_LOG`
/// overrides the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_source(cli: &Cli) -> Result<Arc<dyn JobSource>, AppError> {
    if cli.demo {
        let store = generate_store(&SampleConfig::new(cli.demo_seed, Utc::now()))?;
        info!(jobs = store.jobs().len(), seed = cli.demo_seed, "using sample jobs");
        return Ok(Arc::new(store));
    }
    let client = GraphqlClient::from_env()?;
    info!(endpoint = client.endpoint(), "using job-monitor API");
    Ok(Arc::new(client))
}

/// In demo mode every job is charted unless the user picked some.
fn demo_job_ids(cli: &Cli, source: &dyn JobSource) -> Result<Vec<String>, AppError> {
    if !cli.demo {
        return Ok(Vec::new());
    }
    Ok(source
        .list_jobs(&JobQuery::default())?
        .into_iter()
        .map(|j| j.id)
        .collect())
}

/// Saved selection (if any), then flags; falls back to `default_jobs` when
/// neither names a job.
pub fn build_selection(args: &SelectionArgs, default_jobs: &[String]) -> Result<FacetSelection, AppError> {
    let base = match &args.selection {
        Some(path) => crate::io::read_selection_json(path)?,
        None => FacetSelection::default(),
    };
    let mut selection = base.reduce_all(args.actions());
    if selection.job_ids.is_empty() {
        selection = selection.reduce_all(default_jobs.iter().cloned().map(Action::SelectJob));
    }
    Ok(selection)
}

fn render_request(args: &PlotArgs, default_jobs: &[String]) -> Result<RenderRequest, AppError> {
    let selection = build_selection(&args.selection, default_jobs)?;
    let mut request = RenderRequest::new(
        selection,
        ContainerSize::new(f64::from(args.chart.width), f64::from(args.chart.height)),
    );
    request.style = args.chart.style();
    Ok(request)
}

fn handle_jobs(source: &dyn JobSource, args: &JobsArgs) -> Result<(), AppError> {
    let query = JobQuery {
        name_filter: args.filter.clone(),
        limit: args.limit,
        status: args.status,
    };
    let jobs = source.list_jobs(&query)?;
    if jobs.is_empty() {
        return Err(AppError::new(3, "No jobs match the filter."));
    }
    println!("{}", format_job_listing(&jobs));
    Ok(())
}

/// Jobs grouped by experiment (experiments sorted, jobs in listing order).
pub fn format_job_listing(jobs: &[Job]) -> String {
    let mut groups: BTreeMap<&str, Vec<&Job>> = BTreeMap::new();
    for job in jobs {
        groups.entry(job.experiment.as_str()).or_default().push(job);
    }
    let mut out = String::new();
    for (experiment, members) in groups {
        let name = if experiment.is_empty() { "(no experiment)" } else { experiment };
        out.push_str(&format!("{name}\n"));
        for job in members {
            let progress = job
                .progress
                .map(|p| format!(" {:>3.0}%", p * 100.0))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {:<12} {:<24} {:<12} [{}]{progress}\n",
                job.id,
                job.job,
                job.status.label(),
                severity(job.status).label()
            ));
            if let Some(exception) = &job.exception {
                out.push_str(&format!("      {exception}\n"));
            }
        }
    }
    out.trim_end().to_string()
}

fn handle_plot(source: &dyn JobSource, args: &PlotArgs, default_jobs: &[String]) -> Result<(), AppError> {
    let request = render_request(args, default_jobs)?;
    let rendered = pipeline::refresh(source, &request);
    let svg = render_svg(&rendered, request.size)?;
    crate::io::write_svg(&args.output, &svg)?;
    if let Some(path) = &args.copy_selection {
        crate::io::write_selection_json(path, &request.selection)?;
    }
    Ok(())
}

fn handle_watch(source: Arc<dyn JobSource>, args: &WatchArgs, default_jobs: &[String]) -> Result<(), AppError> {
    let interval = watch_interval(args.interval)?;
    let request = render_request(&args.plot, default_jobs)?;
    if let Some(path) = &args.plot.copy_selection {
        crate::io::write_selection_json(path, &request.selection)?;
    }
    let options = WatchOptions {
        interval,
        iterations: args.iterations,
        workers: args.workers,
    };
    let output = &args.plot.output;
    let stats = refresh::watch(source, &request, options, |rendered| {
        let svg = render_svg(rendered, request.size)?;
        crate::io::write_svg(output, &svg)
    })?;
    info!(issued = stats.issued, skipped = stats.skipped, renders = stats.rendered, "watch finished");
    Ok(())
}

/// `--interval` as a duration: positive, finite and representable.
fn watch_interval(secs: f64) -> Result<Duration, AppError> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(AppError::new(2, "--interval must be a positive number of seconds."));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| AppError::new(2, format!("Invalid --interval {secs}: {e}")))
}

fn handle_summary(source: &dyn JobSource, args: &SelectionArgs, default_jobs: &[String]) -> Result<(), AppError> {
    let selection = build_selection(args, default_jobs)?;
    let jobs = match pipeline::fetch(source, &selection) {
        pipeline::Fetched::Skipped { reason } => return Err(AppError::new(3, reason)),
        pipeline::Fetched::Done(result) => result?,
    };
    let curves = flatten(&jobs);
    if curves.is_empty() {
        return Err(AppError::new(3, "No curves match the selection."));
    }
    println!("{:<48} {:>12} {:>12} {:>12}", "curve", "last", "min", "max");
    for curve in &curves {
        let summary = summarize(&curve.values, &selection.y_field);
        let field = |p: &Option<crate::domain::Point>| {
            p.as_ref()
                .and_then(|p| p.get(&selection.y_field))
                .and_then(|v| v.as_f64())
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "{:<48} {:>12} {:>12} {:>12}",
            curve.id,
            field(&summary.last),
            field(&summary.min),
            field(&summary.max)
        );
    }
    let candidates: Vec<String> = interesting_properties(&curves).into_iter().filter(|p| !p.is_empty()).collect();
    if candidates.is_empty() {
        println!("\nfacet candidates: (none, every property is constant)");
    } else {
        println!("\nfacet candidates: {}", candidates.join(", "));
    }
    for (dim, property) in pipeline::inert_dimensions(&selection, &curves) {
        warn!(dimension = ?dim, property, "facet property is missing or constant across curves");
    }
    Ok(())
}
