//! Numeric axis scales and tick generation.

/// Maps a continuous data domain onto a pixel range, linearly or in log10.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    domain: [f64; 2],
    range: [f64; 2],
    log: bool,
}

impl AxisScale {
    /// A zero-width domain is widened so the scale never divides by zero:
    /// `v` becomes `v ± 5%`, and `0` becomes `±0.5`.
    pub fn linear(domain: [f64; 2], range: [f64; 2]) -> Self {
        let [lo, hi] = domain;
        let domain = if lo == hi {
            let pad = if lo == 0.0 { 0.5 } else { lo.abs() * 0.05 };
            [lo - pad, hi + pad]
        } else {
            domain
        };
        Self {
            domain,
            range,
            log: false,
        }
    }

    /// Log10 scale. Non-positive bounds are replaced by a decade below the
    /// other bound, and a single-value domain spans one decade around it.
    pub fn log(domain: [f64; 2], range: [f64; 2]) -> Self {
        let [mut lo, mut hi] = domain;
        if hi <= 0.0 {
            hi = if lo > 0.0 { lo * 10.0 } else { 10.0 };
        }
        if lo <= 0.0 {
            lo = hi / 10.0;
        }
        if lo == hi {
            lo /= 10f64.sqrt();
            hi *= 10f64.sqrt();
        }
        Self {
            domain: [lo, hi],
            range,
            log: true,
        }
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    pub fn is_log(&self) -> bool {
        self.log
    }

    fn transform(&self, v: f64) -> f64 {
        if self.log { v.log10() } else { v }
    }

    fn untransform(&self, t: f64) -> f64 {
        if self.log { 10f64.powf(t) } else { t }
    }

    /// Pixel position of a data value; `None` for values the scale cannot
    /// place (non-finite, or non-positive on a log scale).
    pub fn map(&self, v: f64) -> Option<f64> {
        if !v.is_finite() || (self.log && v <= 0.0) {
            return None;
        }
        let d0 = self.transform(self.domain[0]);
        let d1 = self.transform(self.domain[1]);
        let t = (self.transform(v) - d0) / (d1 - d0);
        let px = self.range[0] + t * (self.range[1] - self.range[0]);
        px.is_finite().then_some(px)
    }

    /// Data value at a pixel position.
    pub fn invert(&self, px: f64) -> f64 {
        let [r0, r1] = self.range;
        if r0 == r1 {
            return self.domain[0];
        }
        let d0 = self.transform(self.domain[0]);
        let d1 = self.transform(self.domain[1]);
        let t = (px - r0) / (r1 - r0);
        self.untransform(d0 + t * (d1 - d0))
    }

    /// Roughly `count` round tick values inside the domain.
    ///
    /// Linear scales step by 1, 2 or 5 times a power of ten. Log scales tick
    /// at powers of ten, falling back to linear ticks when the domain holds
    /// fewer than two of them.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let lo = self.domain[0].min(self.domain[1]);
        let hi = self.domain[0].max(self.domain[1]);
        if self.log {
            let ticks: Vec<f64> = (lo.log10().floor() as i32..=hi.log10().ceil() as i32)
                .map(|k| 10f64.powi(k))
                .filter(|v| *v >= lo && *v <= hi)
                .collect();
            if ticks.len() >= 2 {
                return ticks;
            }
        }
        linear_ticks(lo, hi, count.max(1))
    }
}

fn linear_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    let raw = (hi - lo) / count as f64;
    if !(raw.is_finite() && raw > 0.0) {
        return Vec::new();
    }
    let power = 10f64.powf(raw.log10().floor());
    let error = raw / power;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    let step = factor * power;

    // Dividing by the inverse step keeps decimal ticks exact (0.6, not 0.6000000000000001).
    if step < 1.0 {
        let inv = (1.0 / step).round();
        let (first, last) = ((lo * inv).ceil() as i64, (hi * inv).floor() as i64);
        (first..=last).map(|i| i as f64 / inv).collect()
    } else {
        let (first, last) = ((lo / step).ceil() as i64, (hi / step).floor() as i64);
        (first..=last).map(|i| i as f64 * step).collect()
    }
}

/// Short tick label: plain decimals, scientific notation for very large or
/// very small magnitudes.
pub fn format_tick(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let mag = v.abs();
    if !(1e-3..1e5).contains(&mag) {
        return format!("{v:e}");
    }
    let s = format!("{v:.6}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_maps_and_inverts() {
        let scale = AxisScale::linear([0.0, 10.0], [0.0, 200.0]);
        assert_eq!(scale.map(5.0), Some(100.0));
        assert_eq!(scale.invert(50.0), 2.5);
        assert_eq!(scale.map(f64::NAN), None);
    }

    #[test]
    fn y_range_can_be_flipped() {
        let scale = AxisScale::linear([0.0, 1.0], [100.0, 0.0]);
        assert_eq!(scale.map(0.0), Some(100.0));
        assert_eq!(scale.map(1.0), Some(0.0));
        assert_eq!(scale.invert(25.0), 0.75);
    }

    #[test]
    fn degenerate_domain_is_widened() {
        assert_eq!(AxisScale::linear([5.0, 5.0], [0.0, 1.0]).domain(), [4.75, 5.25]);
        assert_eq!(AxisScale::linear([0.0, 0.0], [0.0, 1.0]).domain(), [-0.5, 0.5]);
        let scale = AxisScale::linear([3.0, 3.0], [0.0, 100.0]);
        let mid = scale.map(3.0).unwrap();
        assert!((mid - 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_size_range_does_not_produce_nan() {
        let scale = AxisScale::linear([0.0, 1.0], [0.0, 0.0]);
        assert_eq!(scale.map(0.5), Some(0.0));
        assert_eq!(scale.invert(0.0), 0.0);
    }

    #[test]
    fn log_scale_rejects_non_positive_values() {
        let scale = AxisScale::log([1.0, 100.0], [0.0, 2.0]);
        assert_eq!(scale.map(10.0), Some(1.0));
        assert_eq!(scale.map(0.0), None);
        assert_eq!(scale.map(-1.0), None);
        assert!((scale.invert(1.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn log_scale_repairs_bad_bounds() {
        assert_eq!(AxisScale::log([-1.0, 100.0], [0.0, 1.0]).domain(), [10.0, 100.0]);
        let widened = AxisScale::log([10.0, 10.0], [0.0, 1.0]).domain();
        assert!(widened[0] < 10.0 && widened[1] > 10.0);
    }

    #[test]
    fn linear_ticks_are_round() {
        let scale = AxisScale::linear([0.0, 1.0], [0.0, 1.0]);
        assert_eq!(scale.ticks(5), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        let scale = AxisScale::linear([0.0, 95.0], [0.0, 1.0]);
        assert_eq!(scale.ticks(4), vec![0.0, 20.0, 40.0, 60.0, 80.0]);
    }

    #[test]
    fn log_ticks_at_powers_of_ten() {
        let scale = AxisScale::log([1.0, 1000.0], [0.0, 1.0]);
        assert_eq!(scale.ticks(5), vec![1.0, 10.0, 100.0, 1000.0]);
        // Less than one decade: linear fallback.
        let narrow = AxisScale::log([2.0, 8.0], [0.0, 1.0]);
        assert!(narrow.ticks(3).len() >= 2);
    }

    #[test]
    fn tick_labels() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(0.30000000000000004), "0.3");
        assert_eq!(format_tick(250.0), "250");
        assert_eq!(format_tick(1e6), "1e6");
        assert_eq!(format_tick(-0.5), "-0.5");
    }
}
