//! Diverging coolwarm palette and linear normalization.

use plotters::style::RGBColor;

/// Anchor colors of the coolwarm map, evenly spaced from 0.0 to 1.0.
const COOLWARM: [(u8, u8, u8); 9] = [
    (59, 76, 192),
    (98, 130, 234),
    (141, 176, 254),
    (184, 208, 249),
    (221, 221, 221),
    (245, 196, 173),
    (244, 154, 123),
    (222, 96, 77),
    (180, 4, 38),
];

/// Color at position `t` in `[0, 1]`; values outside are clamped.
pub fn coolwarm(t: f64) -> RGBColor {
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (COOLWARM.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(COOLWARM.len() - 2);
    let frac = scaled - lo as f64;

    let (a, b) = (COOLWARM[lo], COOLWARM[lo + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Linear map from the data range onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// A degenerate range maps every value to the midpoint.
    pub fn unit(&self, value: f64) -> f64 {
        if self.vmax > self.vmin {
            (value - self.vmin) / (self.vmax - self.vmin)
        } else {
            0.5
        }
    }
}
