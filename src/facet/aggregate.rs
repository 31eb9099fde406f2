//! Per-curve aggregation of samples sharing an x value.
//!
//! Retried computations can log several values for the same step. Those are
//! collapsed into a single point (exact x equality, no binning) so that every
//! x has one y and the line path is well defined.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::domain::{Point, Scalar};

enum FieldAcc {
    Mean { mean: f64, count: usize },
    Other(Scalar),
}

struct Group {
    x: f64,
    fields: IndexMap<String, FieldAcc>,
}

impl Group {
    fn push(&mut self, point: &Point) {
        for (name, value) in point {
            let Some(v) = value.as_f64() else {
                self.fields
                    .entry(name.clone())
                    .or_insert_with(|| FieldAcc::Other(value.clone()));
                continue;
            };
            match self.fields.get_mut(name) {
                Some(FieldAcc::Mean { mean, count }) => {
                    *count += 1;
                    *mean += (v - *mean) / *count as f64;
                }
                Some(acc) => *acc = FieldAcc::Mean { mean: v, count: 1 },
                None => {
                    self.fields.insert(name.clone(), FieldAcc::Mean { mean: v, count: 1 });
                }
            }
        }
    }

    fn finish(self) -> Point {
        self.fields
            .into_iter()
            .map(|(name, acc)| {
                let value = match acc {
                    FieldAcc::Mean { mean, .. } => Scalar::Num(mean),
                    FieldAcc::Other(v) => v,
                };
                (name, value)
            })
            .collect()
    }
}

/// Group points by x and average every numeric field within a group.
///
/// Points without a finite numeric x are dropped. Non-numeric fields keep the
/// value of the first point of their group. The output is sorted by x.
pub fn aggregate(points: &[Point], x_field: &str) -> Vec<Point> {
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for point in points {
        let Some(x) = point.get(x_field).and_then(Scalar::as_f64) else {
            continue;
        };
        // -0.0 and 0.0 are the same x.
        let x = if x == 0.0 { 0.0 } else { x };
        let slot = *index.entry(x.to_bits()).or_insert_with(|| {
            groups.push(Group {
                x,
                fields: IndexMap::new(),
            });
            groups.len() - 1
        });
        groups[slot].push(point);
    }

    groups.sort_by(|a, b| a.x.total_cmp(&b.x));
    groups.into_iter().map(Group::finish).collect()
}

/// Aggregated `(x, y)` pairs of a curve, dropping points without a finite y.
pub fn xy_points(points: &[Point], x_field: &str, y_field: &str) -> Vec<(f64, f64)> {
    aggregate(points, x_field)
        .iter()
        .filter_map(|p| {
            let x = p.get(x_field).and_then(Scalar::as_f64)?;
            let y = p.get(y_field).and_then(Scalar::as_f64)?;
            Some((x, y))
        })
        .collect()
}
