//! Query descriptions shared by every job source.

use crate::domain::{FacetSelection, JobStatus, Point, Scalar, Tags};
use crate::error::AppError;

/// One `key=value` condition on series tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCondition {
    pub key: String,
    pub value: String,
}

impl TagCondition {
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let (key, value) = text
            .split_once('=')
            .ok_or_else(|| AppError::new(2, format!("Invalid tag filter '{text}': expected key=value.")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::new(2, format!("Invalid tag filter '{text}': empty key.")));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }

    /// Compares string forms, so `avg=100` matches a numeric tag `100`.
    /// A missing tag never matches.
    pub fn matches(&self, tags: &Tags) -> bool {
        tags.get(&self.key).is_some_and(|v| v.to_string() == self.value)
    }
}

/// Parse a comma separated filter string; empty pieces are ignored.
pub fn parse_tag_filter(text: &str) -> Result<Vec<TagCondition>, AppError> {
    text.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(TagCondition::parse)
        .collect()
}

/// Structured form of `fetchJobSeries(jobIds, measurementPattern, tagFilter)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesQuery {
    pub job_ids: Vec<String>,
    pub measurements: Vec<String>,
    pub tags: Vec<TagCondition>,
}

impl SeriesQuery {
    pub fn from_selection(selection: &FacetSelection) -> Result<Self, AppError> {
        let mut tags = Vec::new();
        for filter in &selection.tag_filters {
            tags.extend(parse_tag_filter(filter)?);
        }
        Ok(Self {
            job_ids: selection.job_ids.clone(),
            measurements: selection.measurements.clone(),
            tags,
        })
    }

    /// Alternation of the escaped measurement names, e.g. `(loss|accuracy)`.
    /// The API anchors it with `^...$`.
    pub fn measurement_pattern(&self) -> String {
        let names: Vec<String> = self.measurements.iter().map(|m| escape_regex(m)).collect();
        format!("({})", names.join("|"))
    }

    pub fn tag_filter(&self) -> String {
        self.tags
            .iter()
            .map(|c| format!("{}={}", c.key, c.value))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn matches_measurement(&self, name: &str) -> bool {
        self.measurements.iter().any(|m| m == name)
    }

    pub fn matches_tags(&self, tags: &Tags) -> bool {
        self.tags.iter().all(|c| c.matches(tags))
    }
}

/// Backslash-escape regex metacharacters.
pub fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if "\\.+*?()|[]{}^$".contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Job listing criteria.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobQuery {
    /// Substring of the job or experiment name; empty matches everything.
    pub name_filter: String,
    /// `0` means unlimited.
    pub limit: usize,
    pub status: Option<JobStatus>,
}

impl JobQuery {
    /// The name filter as a case-insensitive regex for the API, matching the
    /// in-memory store's substring semantics. `None` when there is no filter.
    pub fn search_pattern(&self) -> Option<String> {
        (!self.name_filter.is_empty()).then(|| format!("(?i){}", escape_regex(&self.name_filter)))
    }
}

/// Last, smallest and largest point of a series for one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub last: Option<Point>,
    pub min: Option<Point>,
    pub max: Option<Point>,
}

/// Points whose `field` is not a finite number are ignored. On ties the
/// earliest point wins.
pub fn summarize(values: &[Point], field: &str) -> Summary {
    let mut summary = Summary::default();
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for point in values {
        let Some(v) = point.get(field).and_then(Scalar::as_f64) else {
            continue;
        };
        if v < lo {
            lo = v;
            summary.min = Some(point.clone());
        }
        if v > hi {
            hi = v;
            summary.max = Some(point.clone());
        }
        summary.last = Some(point.clone());
    }
    summary
}
