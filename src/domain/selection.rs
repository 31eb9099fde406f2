//! Facet selection state.
//!
//! The selection is an immutable value: every user action goes through
//! [`FacetSelection::reduce`], which consumes the old state and returns the
//! new one. The renderer only ever sees the finished value.
//!
//! The JSON form (`to_json` / `from_json`) is what the "copy configuration"
//! and "paste configuration" features exchange.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::types::{DEFAULT_X_FIELD, DEFAULT_Y_FIELD};
use crate::error::AppError;

/// Upper limit for the smoothing weight. A weight of 1 would freeze the curve
/// at its first value.
pub const MAX_SMOOTHING: f64 = 0.99;

/// A faceting dimension a property can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Row,
    Col,
    Hue,
    Pattern,
}

/// One side of one plotted axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    XMin,
    XMax,
    YMin,
    YMax,
}

/// Optional user overrides for the extremes of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisBounds {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacetSelection {
    pub job_ids: Vec<String>,
    /// Insertion order is the legend order; the query ignores it.
    pub measurements: Vec<String>,
    /// `key=value` conditions.
    pub tag_filters: Vec<String>,
    pub row: Option<String>,
    pub col: Option<String>,
    pub hue: Option<String>,
    pub pattern: Option<String>,
    pub x_field: String,
    pub y_field: String,
    pub x_bounds: AxisBounds,
    pub y_bounds: AxisBounds,
    pub y_log: bool,
    pub opacity: f64,
    pub smoothing: f64,
}

impl Default for FacetSelection {
    fn default() -> Self {
        Self {
            job_ids: Vec::new(),
            measurements: Vec::new(),
            tag_filters: Vec::new(),
            row: None,
            col: None,
            hue: None,
            pattern: None,
            x_field: DEFAULT_X_FIELD.to_string(),
            y_field: DEFAULT_Y_FIELD.to_string(),
            x_bounds: AxisBounds::default(),
            y_bounds: AxisBounds::default(),
            y_log: false,
            opacity: 1.0,
            smoothing: 0.0,
        }
    }
}

/// A single user action on the selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectJob(String),
    UnselectJob(String),
    ToggleJob(String),
    /// Add a measurement unless already selected.
    SelectMeasurement(String),
    ToggleMeasurement(String),
    AddTagFilter(String),
    RemoveTagFilter(String),
    /// `None` (or an empty name) clears the dimension.
    SetDimension(Dimension, Option<String>),
    SetBound(Bound, Option<f64>),
    SetXField(String),
    SetYField(String),
    SetYLog(bool),
    SetOpacity(f64),
    SetSmoothing(f64),
    /// Replace everything, e.g. with a pasted configuration.
    Replace(FacetSelection),
}

impl FacetSelection {
    /// Apply one action and return the resulting selection.
    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::SelectJob(id) => {
                if !self.job_ids.contains(&id) {
                    self.job_ids.push(id);
                }
            }
            Action::UnselectJob(id) => self.job_ids.retain(|j| *j != id),
            Action::ToggleJob(id) => toggle(&mut self.job_ids, id),
            Action::SelectMeasurement(name) => {
                if !self.measurements.contains(&name) {
                    self.measurements.push(name);
                }
            }
            Action::ToggleMeasurement(name) => toggle(&mut self.measurements, name),
            Action::AddTagFilter(filter) => {
                let filter = filter.trim().to_string();
                if !filter.is_empty() && !self.tag_filters.contains(&filter) {
                    self.tag_filters.push(filter);
                }
            }
            Action::RemoveTagFilter(filter) => self.tag_filters.retain(|f| f != filter.trim()),
            Action::SetDimension(dim, name) => {
                let name = name.filter(|n| !n.is_empty());
                match dim {
                    Dimension::Row => self.row = name,
                    Dimension::Col => self.col = name,
                    Dimension::Hue => self.hue = name,
                    Dimension::Pattern => self.pattern = name,
                }
            }
            Action::SetBound(bound, value) => {
                let value = value.filter(|v| v.is_finite());
                match bound {
                    Bound::XMin => self.x_bounds.min = value,
                    Bound::XMax => self.x_bounds.max = value,
                    Bound::YMin => self.y_bounds.min = value,
                    Bound::YMax => self.y_bounds.max = value,
                }
            }
            Action::SetXField(field) => self.x_field = field,
            Action::SetYField(field) => self.y_field = field,
            Action::SetYLog(on) => self.y_log = on,
            Action::SetOpacity(v) => {
                if v.is_finite() {
                    self.opacity = v.clamp(0.0, 1.0);
                }
            }
            Action::SetSmoothing(v) => {
                if v.is_finite() {
                    self.smoothing = v.clamp(0.0, MAX_SMOOTHING);
                }
            }
            Action::Replace(next) => return next.normalized(),
        }
        self
    }

    /// Apply several actions in order.
    pub fn reduce_all(self, actions: impl IntoIterator<Item = Action>) -> Self {
        actions.into_iter().fold(self, FacetSelection::reduce)
    }

    /// Property bound to a dimension, if any.
    pub fn dimension(&self, dim: Dimension) -> Option<&str> {
        let name = match dim {
            Dimension::Row => &self.row,
            Dimension::Col => &self.col,
            Dimension::Hue => &self.hue,
            Dimension::Pattern => &self.pattern,
        };
        name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AppError::new(2, format!("Failed to serialize selection: {e}")))
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        serde_json::from_str(text)
            .map(FacetSelection::normalized)
            .map_err(|e| AppError::new(2, format!("Invalid selection JSON: {e}")))
    }

    /// Restore the invariants `reduce` maintains, for selections that did not
    /// come through it (pasted or loaded JSON).
    pub fn normalized(mut self) -> Self {
        dedup_in_order(&mut self.job_ids);
        dedup_in_order(&mut self.measurements);
        self.tag_filters = self
            .tag_filters
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        dedup_in_order(&mut self.tag_filters);
        for dim in [&mut self.row, &mut self.col, &mut self.hue, &mut self.pattern] {
            if dim.as_deref().is_some_and(str::is_empty) {
                *dim = None;
            }
        }
        for bounds in [&mut self.x_bounds, &mut self.y_bounds] {
            bounds.min = bounds.min.filter(|v| v.is_finite());
            bounds.max = bounds.max.filter(|v| v.is_finite());
        }
        self.opacity = if self.opacity.is_finite() { self.opacity.clamp(0.0, 1.0) } else { 1.0 };
        self.smoothing = if self.smoothing.is_finite() {
            self.smoothing.clamp(0.0, MAX_SMOOTHING)
        } else {
            0.0
        };
        self
    }
}

fn dedup_in_order(list: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    list.retain(|item| seen.insert(item.clone()));
}

fn toggle(list: &mut Vec<String>, item: String) {
    if let Some(pos) = list.iter().position(|x| *x == item) {
        list.remove(pos);
    } else {
        list.push(item);
    }
}
