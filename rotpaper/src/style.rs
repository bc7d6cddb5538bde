//! Shared plot styling: the colorblind-safe palette used across every
//! figure and the sequential colormap for the density maps.

use plotters::style::RGBColor;

pub const BLACK: RGBColor = RGBColor(0, 0, 0);
pub const ORANGE: RGBColor = RGBColor(230, 159, 0);
pub const SKY_BLUE: RGBColor = RGBColor(86, 180, 233);
pub const ALGAE: RGBColor = RGBColor(0, 158, 115);
pub const BLUE: RGBColor = RGBColor(0, 114, 178);
pub const RED: RGBColor = RGBColor(213, 94, 0);
pub const PINK: RGBColor = RGBColor(204, 121, 167);
pub const PURPLE: RGBColor = RGBColor(115, 44, 123);
pub const VIOLET: RGBColor = RGBColor(148, 103, 189);
pub const BROWN: RGBColor = RGBColor(140, 86, 75);
pub const GRAY: RGBColor = RGBColor(128, 128, 128);

/// Sequential colormap anchors (dark purple through yellow).
const HEAT_ANCHORS: [(f64, (u8, u8, u8)); 5] = [
    (0.00, (68, 1, 84)),
    (0.25, (59, 82, 139)),
    (0.50, (33, 145, 140)),
    (0.75, (94, 201, 98)),
    (1.00, (253, 231, 37)),
];

/// Map a normalized density to the sequential colormap.
///
/// Inputs clamp to [0, 1]; empty bins are skipped by the callers so the
/// white background shows through, matching the under-range convention of
/// the density maps.
pub fn heat_color(norm: f64) -> RGBColor {
    let t = norm.clamp(0.0, 1.0);
    let mut lower = HEAT_ANCHORS[0];
    for upper in HEAT_ANCHORS.iter().skip(1) {
        if t <= upper.0 {
            let span = upper.0 - lower.0;
            let frac = if span > 0.0 { (t - lower.0) / span } else { 0.0 };
            let lerp = |a: u8, b: u8| (a as f64 + frac * (b as f64 - a as f64)).round() as u8;
            return RGBColor(
                lerp(lower.1 .0, upper.1 .0),
                lerp(lower.1 .1, upper.1 .1),
                lerp(lower.1 .2, upper.1 .2),
            );
        }
        lower = *upper;
    }
    RGBColor(253, 231, 37)
}

/// Log-scaled normalization for count data: zero maps below the scale and
/// the peak maps to 1.
pub fn log_norm(count: u64, max_count: u64) -> f64 {
    if count == 0 || max_count == 0 {
        return 0.0;
    }
    ((count as f64).ln() + 1.0) / ((max_count as f64).ln() + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(heat_color(0.0), RGBColor(68, 1, 84));
        assert_eq!(heat_color(1.0), RGBColor(253, 231, 37));
        assert_eq!(heat_color(-2.0), heat_color(0.0));
        assert_eq!(heat_color(5.0), heat_color(1.0));
    }

    #[test]
    fn test_heat_color_midpoint() {
        assert_eq!(heat_color(0.5), RGBColor(33, 145, 140));
    }

    #[test]
    fn test_log_norm_monotonic() {
        let max = 1000;
        let low = log_norm(2, max);
        let mid = log_norm(50, max);
        let high = log_norm(1000, max);
        assert!(low < mid && mid < high);
        assert!((high - 1.0).abs() < 1e-12);
        assert_eq!(log_norm(0, max), 0.0);
    }
}
