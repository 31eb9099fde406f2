//! Categorical and continuous domains of a curve set.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::domain::{AxisBounds, Point, Scalar};
use crate::facet::flatten::Curve;

/// Distinct values of a property across all curves, sorted.
///
/// Curves lacking the property contribute `Null`.
pub fn categorical_domain(curves: &[Curve], property: &str) -> Vec<Scalar> {
    curves
        .iter()
        .map(|c| c.property(property).clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Domain of an optional dimension; an unbound dimension has no values.
pub fn dimension_domain(curves: &[Curve], property: Option<&str>) -> Vec<Scalar> {
    property.map(|p| categorical_domain(curves, p)).unwrap_or_default()
}

/// `[min, max]` of a numeric point field over every curve.
///
/// Points where the field is missing or not a finite number are skipped, as
/// are non-positive values when `positive_only` is set (log axes). A user
/// bound replaces the computed extreme on its side only. Without any usable
/// point the domain is undefined.
pub fn continuous_domain(curves: &[Curve], field: &str, bounds: AxisBounds, positive_only: bool) -> Option<[f64; 2]> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for point in curves.iter().flat_map(|c| c.values.iter()) {
        let Some(v) = numeric_field(point, field) else {
            continue;
        };
        if positive_only && v <= 0.0 {
            continue;
        }
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    Some([bounds.min.unwrap_or(lo), bounds.max.unwrap_or(hi)])
}

/// Finite numeric value of a point field.
pub fn numeric_field(point: &Point, field: &str) -> Option<f64> {
    point.get(field).and_then(Scalar::as_f64)
}

/// Properties that vary across the curve set, in first-seen order.
///
/// The list starts with `""`, which stands for "no dimension selected".
/// Properties constant over all curves are left out.
pub fn interesting_properties(curves: &[Curve]) -> Vec<String> {
    let mut seen: IndexMap<&str, ()> = IndexMap::new();
    for curve in curves {
        for key in curve.properties.keys() {
            seen.entry(key.as_str()).or_insert(());
        }
    }

    let mut out = vec![String::new()];
    for key in seen.keys() {
        let mut values = curves.iter().map(|c| c.property(key));
        let Some(first) = values.next() else {
            continue;
        };
        if values.any(|v| v != first) {
            out.push((*key).to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigEntry, JobSeries, Timeseries};
    use crate::facet::flatten::flatten;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn point(x: f64, y: f64) -> Point {
        [("epoch".to_string(), Scalar::Num(x)), ("value".to_string(), Scalar::Num(y))]
            .into_iter()
            .collect()
    }

    fn curves_with(lrs: &[f64], values: Vec<Vec<Point>>) -> Vec<Curve> {
        let jobs: Vec<JobSeries> = lrs
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (lr, vals))| JobSeries {
                id: format!("job{i}"),
                experiment: "exp".to_string(),
                job: format!("run{i}"),
                config: vec![
                    ConfigEntry { key: "lr".to_string(), value: Scalar::Num(*lr) },
                    ConfigEntry { key: "optimizer".to_string(), value: Scalar::from("sgd") },
                ],
                timeseries: vec![Timeseries {
                    measurement: "loss".to_string(),
                    tags: Default::default(),
                    values: Some(vals),
                }],
            })
            .collect();
        flatten(&jobs)
    }

    #[test]
    fn categorical_domain_sorted_unique_and_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let n = rng.gen_range(1..20);
            let lrs: Vec<f64> = (0..n).map(|_| [0.1, 0.01, 0.5, 1.0][rng.gen_range(0..4)]).collect();
            let curves = curves_with(&lrs, vec![vec![]; n]);
            let domain = categorical_domain(&curves, "lr");
            assert!(domain.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(domain, categorical_domain(&curves, "lr"));

            let mut reversed = curves.clone();
            reversed.reverse();
            assert_eq!(domain, categorical_domain(&reversed, "lr"));
        }
    }

    #[test]
    fn missing_property_shows_up_as_null() {
        let curves = curves_with(&[0.1], vec![vec![]]);
        assert_eq!(categorical_domain(&curves, "momentum"), vec![Scalar::Null]);
        assert!(dimension_domain(&curves, None).is_empty());
    }

    #[test]
    fn continuous_domain_spans_all_curves_with_one_sided_override() {
        let curves = curves_with(
            &[0.1, 0.2],
            vec![vec![point(0.0, 1.0), point(1.0, 0.5)], vec![point(3.0, 0.2)]],
        );
        assert_eq!(continuous_domain(&curves, "epoch", AxisBounds::default(), false), Some([0.0, 3.0]));
        let bounds = AxisBounds { min: None, max: Some(0.8) };
        assert_eq!(continuous_domain(&curves, "value", bounds, false), Some([0.2, 0.8]));
    }

    #[test]
    fn continuous_domain_undefined_without_points() {
        let curves = curves_with(&[0.1], vec![vec![]]);
        let bounds = AxisBounds { min: Some(0.0), max: Some(1.0) };
        assert_eq!(continuous_domain(&curves, "epoch", bounds, false), None);
        assert_eq!(continuous_domain(&[], "epoch", AxisBounds::default(), false), None);
    }

    #[test]
    fn continuous_domain_skips_non_numeric_and_non_positive_for_log() {
        let mut odd = point(2.0, -1.0);
        odd.insert("value".to_string(), Scalar::from("nan"));
        let curves = curves_with(&[0.1], vec![vec![point(0.0, -1.0), point(1.0, 10.0), odd]]);
        assert_eq!(continuous_domain(&curves, "value", AxisBounds::default(), true), Some([10.0, 10.0]));
        assert_eq!(continuous_domain(&curves, "value", AxisBounds::default(), false), Some([-1.0, 10.0]));
    }

    #[test]
    fn interesting_properties_drop_constant_ones() {
        let curves = curves_with(&[0.1, 0.2], vec![vec![], vec![]]);
        assert_eq!(
            interesting_properties(&curves),
            vec!["".to_string(), "jobId".to_string(), "job".to_string(), "lr".to_string()]
        );
        assert_eq!(interesting_properties(&[]), vec!["".to_string()]);
    }
}
