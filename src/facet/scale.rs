//! Hue and dash-pattern assignment.
//!
//! Both scales are a pure function of the sorted domain: value at index `i`
//! gets `range[i % range.len()]`. The same domain always gives the same
//! mapping, whatever order the curves arrive in.

use plotters::style::RGBColor;

use crate::domain::Scalar;

/// Categorical palette (d3 `schemeCategory10`).
pub const CATEGORY10: [RGBColor; 10] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0x7f, 0x7f, 0x7f),
    RGBColor(0xbc, 0xbd, 0x22),
    RGBColor(0x17, 0xbe, 0xcf),
];

/// Stroke dash style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashPattern {
    Solid,
    /// Dash and gap lengths in pixels.
    Dashed { dash: u32, gap: u32 },
}

pub const DASH_PATTERNS: [DashPattern; 4] = [
    DashPattern::Solid,
    DashPattern::Dashed { dash: 8, gap: 4 },
    DashPattern::Dashed { dash: 2, gap: 3 },
    DashPattern::Dashed { dash: 14, gap: 4 },
];

/// Maps the values of a categorical domain onto a fixed range, cycling.
#[derive(Debug, Clone, PartialEq)]
pub struct OrdinalScale<T: 'static> {
    domain: Vec<Scalar>,
    range: &'static [T],
}

impl<T: Copy + 'static> OrdinalScale<T> {
    /// The domain is sorted and deduplicated here, so callers can pass any
    /// collection of values.
    pub fn new(mut domain: Vec<Scalar>, range: &'static [T]) -> Self {
        domain.sort();
        domain.dedup();
        Self { domain, range }
    }

    /// Encoding of a value; `None` for values outside the domain.
    pub fn get(&self, value: &Scalar) -> Option<T> {
        if self.range.is_empty() {
            return None;
        }
        let idx = self.domain.binary_search(value).ok()?;
        Some(self.range[idx % self.range.len()])
    }

    pub fn domain(&self) -> &[Scalar] {
        &self.domain
    }

    /// Domain values with their encoding, in domain order.
    pub fn entries(&self) -> impl Iterator<Item = (&Scalar, T)> + '_ {
        self.domain
            .iter()
            .enumerate()
            .filter(|_| !self.range.is_empty())
            .map(|(i, v)| (v, self.range[i % self.range.len()]))
    }
}

pub type HueScale = OrdinalScale<RGBColor>;
pub type PatternScale = OrdinalScale<DashPattern>;

pub fn hue_scale(domain: Vec<Scalar>) -> HueScale {
    OrdinalScale::new(domain, &CATEGORY10)
}

pub fn pattern_scale(domain: Vec<Scalar>) -> PatternScale {
    OrdinalScale::new(domain, &DASH_PATTERNS)
}
