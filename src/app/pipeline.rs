//! The recompute pipeline shared by every chart command.
//!
//! selection -> series query -> fetch -> flatten -> facet + render
//!
//! The fetch is the only step that waits on anything. It is kept separate
//! from rendering so the refresh loop can run it on a worker and render on
//! the caller's thread once the response is accepted.

use tracing::{debug, info, warn};

use crate::data::{JobSource, SeriesQuery};
use crate::domain::{Dimension, FacetSelection, JobSeries};
use crate::error::AppError;
use crate::facet::domain::interesting_properties;
use crate::facet::{Curve, flatten};
use crate::facet::layout::ContainerSize;
use crate::plot::{ChartStyle, Crosshair, Rendered, render_curves};

/// Everything a render pass needs besides the data.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub selection: FacetSelection,
    pub size: ContainerSize,
    pub style: ChartStyle,
    pub crosshair: Option<Crosshair>,
}

impl RenderRequest {
    pub fn new(selection: FacetSelection, size: ContainerSize) -> Self {
        Self {
            selection,
            size,
            style: ChartStyle::default(),
            crosshair: None,
        }
    }
}

/// Outcome of the fetch step.
#[derive(Debug, Clone)]
pub enum Fetched {
    /// Nothing was requested.
    Skipped { reason: String },
    Done(Result<Vec<JobSeries>, AppError>),
}

/// The series query for a selection, or `None` when the selection cannot
/// produce curves (no measurement or no job), in which case no request is
/// issued at all.
pub fn series_query(selection: &FacetSelection) -> Result<Option<SeriesQuery>, AppError> {
    if selection.measurements.is_empty() || selection.job_ids.is_empty() {
        return Ok(None);
    }
    SeriesQuery::from_selection(selection).map(Some)
}

pub fn fetch(source: &dyn JobSource, selection: &FacetSelection) -> Fetched {
    let query = match series_query(selection) {
        Ok(Some(query)) => query,
        Ok(None) => {
            let reason = if selection.measurements.is_empty() {
                "No measurements selected."
            } else {
                "No jobs selected."
            };
            debug!(reason, "skipping series fetch");
            return Fetched::Skipped {
                reason: reason.to_string(),
            };
        }
        Err(err) => return Fetched::Done(Err(err)),
    };
    debug!(
        jobs = query.job_ids.len(),
        pattern = %query.measurement_pattern(),
        tags = %query.tag_filter(),
        "fetching job series"
    );
    Fetched::Done(source.fetch_job_series(&query))
}

/// Render whatever the fetch produced. Never fails: an upstream error turns
/// into a placeholder.
pub fn render_fetched(fetched: &Fetched, request: &RenderRequest) -> Rendered {
    match fetched {
        Fetched::Skipped { reason } => Rendered::Empty { reason: reason.clone() },
        Fetched::Done(result) => render_result(result.as_deref(), request),
    }
}

pub fn render_result(result: Result<&[JobSeries], &AppError>, request: &RenderRequest) -> Rendered {
    let jobs = match result {
        Ok(jobs) => jobs,
        Err(err) => {
            warn!(error = %err, "series query failed");
            return Rendered::Failed {
                message: format!("Query failed: {}", err.message()),
            };
        }
    };
    let curves = flatten(jobs);
    for (dim, property) in inert_dimensions(&request.selection, &curves) {
        warn!(dimension = ?dim, property, "facet property is missing or constant across curves");
    }
    let rendered = render_curves(
        &curves,
        &request.selection,
        request.size,
        &request.style,
        request.crosshair,
    );
    match &rendered {
        Rendered::Chart(scene) => info!(
            jobs = jobs.len(),
            curves = curves.len(),
            cells = scene.cells.len(),
            paths = scene.path_count(),
            "rendered chart"
        ),
        Rendered::Empty { reason } => info!(jobs = jobs.len(), reason = %reason, "nothing to chart"),
        Rendered::Failed { .. } => {}
    }
    rendered
}

/// Bound dimensions whose property is not a facet candidate for these
/// curves: it is absent everywhere or takes a single value, so the
/// dimension splits nothing.
pub fn inert_dimensions<'a>(selection: &'a FacetSelection, curves: &[Curve]) -> Vec<(Dimension, &'a str)> {
    if curves.is_empty() {
        return Vec::new();
    }
    let candidates = interesting_properties(curves);
    [Dimension::Row, Dimension::Col, Dimension::Hue, Dimension::Pattern]
        .into_iter()
        .filter_map(|dim| selection.dimension(dim).map(|p| (dim, p)))
        .filter(|(_, p)| !candidates.iter().any(|c| c == p))
        .collect()
}

/// One full pass: fetch, then render.
pub fn refresh(source: &dyn JobSource, request: &RenderRequest) -> Rendered {
    render_fetched(&fetch(source, &request.selection), request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::JobQuery;
    use crate::domain::{Action, Job};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing {
        calls: AtomicUsize,
    }

    impl JobSource for Failing {
        fn list_jobs(&self, _: &JobQuery) -> Result<Vec<Job>, AppError> {
            Ok(Vec::new())
        }

        fn fetch_job_series(&self, _: &SeriesQuery) -> Result<Vec<JobSeries>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::new(4, "connection refused"))
        }
    }

    fn request(actions: Vec<Action>) -> RenderRequest {
        RenderRequest::new(
            FacetSelection::default().reduce_all(actions),
            ContainerSize::new(400.0, 300.0),
        )
    }

    #[test]
    fn empty_selection_skips_the_fetch() {
        let source = Failing { calls: AtomicUsize::new(0) };
        let rendered = refresh(&source, &request(vec![Action::SelectJob("a".into())]));
        assert!(matches!(rendered, Rendered::Empty { .. }));
        let rendered = refresh(&source, &request(vec![Action::ToggleMeasurement("loss".into())]));
        assert!(matches!(rendered, Rendered::Empty { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn upstream_error_becomes_a_placeholder() {
        let source = Failing { calls: AtomicUsize::new(0) };
        let req = request(vec![
            Action::SelectJob("a".into()),
            Action::ToggleMeasurement("loss".into()),
        ]);
        match refresh(&source, &req) {
            Rendered::Failed { message } => assert!(message.contains("connection refused")),
            other => panic!("expected failure placeholder, got {other:?}"),
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bad_tag_filter_fails_without_fetching() {
        let source = Failing { calls: AtomicUsize::new(0) };
        let req = request(vec![
            Action::SelectJob("a".into()),
            Action::ToggleMeasurement("loss".into()),
            Action::AddTagFilter("nonsense".into()),
        ]);
        assert!(matches!(refresh(&source, &req), Rendered::Failed { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_result_renders_empty() {
        let req = request(vec![]);
        assert!(matches!(render_result(Ok(&[]), &req), Rendered::Empty { .. }));
    }

    #[test]
    fn dimensions_that_split_nothing_are_reported() {
        let point: crate::domain::Point =
            [("epoch".to_string(), crate::domain::Scalar::Num(0.0))].into_iter().collect();
        let jobs: Vec<JobSeries> = ["a", "b"]
            .iter()
            .map(|id| JobSeries {
                id: id.to_string(),
                experiment: "exp".to_string(),
                job: id.to_string(),
                config: Vec::new(),
                timeseries: vec![crate::domain::Timeseries {
                    measurement: "loss".to_string(),
                    tags: Default::default(),
                    values: Some(vec![point.clone()]),
                }],
            })
            .collect();
        let curves = flatten(&jobs);
        let selection = FacetSelection::default().reduce_all([
            Action::SetDimension(Dimension::Hue, Some("jobId".into())),
            Action::SetDimension(Dimension::Row, Some("experiment".into())),
            Action::SetDimension(Dimension::Pattern, Some("nosuchkey".into())),
        ]);
        assert_eq!(
            inert_dimensions(&selection, &curves),
            vec![(Dimension::Row, "experiment"), (Dimension::Pattern, "nosuchkey")]
        );
        assert!(inert_dimensions(&selection, &[]).is_empty());
    }
}
