//! Order statistics, robust scatter estimates, histograms, and the interval
//! estimates used for the period-distribution error bars.

use ndarray::Array2;
use scilib::math::basic::erf;
use std::f64::consts::SQRT_2;

/// Cumulative distribution function for the standard normal distribution
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation. Returns NaN for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentile with linear interpolation between order statistics.
///
/// `q` is in percent (0..=100). Returns NaN for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let h = (sorted.len() - 1) as f64 * (q / 100.0).clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = h - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Median, i.e. the 50th percentile.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Median absolute deviation about the sample median.
pub fn mad(values: &[f64]) -> f64 {
    mad_about(values, median(values))
}

/// Median absolute deviation about a given center.
///
/// The usual definition deviates about the sample median; the correction
/// ridge fits deviate about the binned percentile instead, so the center is
/// a parameter here.
pub fn mad_about(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Scale factor turning a MAD into a Gaussian-equivalent sigma
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Iterative sigma clipping about the running median.
///
/// Returns the keep-mask after convergence or `max_iters` passes.
pub fn sigma_clip(values: &[f64], sigma: f64, max_iters: usize) -> Vec<bool> {
    let mut keep = vec![true; values.len()];
    for _ in 0..max_iters {
        let kept: Vec<f64> = values
            .iter()
            .zip(&keep)
            .filter_map(|(v, &k)| k.then_some(*v))
            .collect();
        if kept.is_empty() {
            break;
        }
        let center = median(&kept);
        let scale = MAD_TO_SIGMA * mad(&kept);
        if scale == 0.0 {
            break;
        }
        let mut changed = false;
        for (slot, value) in keep.iter_mut().zip(values) {
            let inside = (value - center).abs() <= sigma * scale;
            if *slot && !inside {
                *slot = false;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    keep
}

/// Histogram counts over explicit bin edges.
///
/// Edges must be ascending. Following the usual digitize convention, bins
/// are half-open `[e_i, e_{i+1})` except the last, which includes its right
/// edge. Out-of-range values are dropped, so the counts sum to the in-range
/// sample size.
pub fn histogram(values: &[f64], edges: &[f64]) -> Vec<u64> {
    assert!(edges.len() >= 2, "histogram needs at least two bin edges");
    let mut counts = vec![0u64; edges.len() - 1];
    for &v in values {
        if let Some(bin) = bin_index(v, edges) {
            counts[bin] += 1;
        }
    }
    counts
}

/// Equally spaced bin edges covering `[start, stop]`.
pub fn linspace_edges(start: f64, stop: f64, bins: usize) -> Vec<f64> {
    assert!(bins >= 1);
    let step = (stop - start) / bins as f64;
    (0..=bins).map(|i| start + step * i as f64).collect()
}

/// Bin index of `v` in ascending `edges`, or None if out of range.
pub fn bin_index(v: f64, edges: &[f64]) -> Option<usize> {
    let n_bins = edges.len() - 1;
    if v < edges[0] || v > edges[n_bins] {
        return None;
    }
    if v == edges[n_bins] {
        return Some(n_bins - 1);
    }
    // Binary search for the containing bin.
    let mut lo = 0;
    let mut hi = n_bins;
    while lo + 1 < hi {
        let mid = (lo + hi) / 2;
        if v < edges[mid] {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Some(lo)
}

/// 2-D histogram over explicit edges, shaped `(x_bins, y_bins)`.
pub fn histogram2d(xs: &[f64], ys: &[f64], x_edges: &[f64], y_edges: &[f64]) -> Array2<u64> {
    assert_eq!(xs.len(), ys.len(), "x and y samples must pair up");
    let mut counts = Array2::<u64>::zeros((x_edges.len() - 1, y_edges.len() - 1));
    for (&x, &y) in xs.iter().zip(ys) {
        if let (Some(i), Some(j)) = (bin_index(x, x_edges), bin_index(y, y_edges)) {
            counts[[i, j]] += 1;
        }
    }
    counts
}

/// Running percentile over a sliding window.
///
/// Each output point pairs the mean of an x window with the requested
/// percentile of the matching y window. Returns empty vectors when the
/// window does not fit.
pub fn running_percentile(
    xs: &[f64],
    ys: &[f64],
    window: usize,
    q: f64,
) -> (Vec<f64>, Vec<f64>) {
    assert_eq!(xs.len(), ys.len());
    if window == 0 || window >= xs.len() {
        return (Vec::new(), Vec::new());
    }
    let n_out = xs.len() - window;
    let mut out_x = Vec::with_capacity(n_out);
    let mut out_y = Vec::with_capacity(n_out);
    for start in 0..n_out {
        let end = start + window;
        out_x.push(mean(&xs[start..end]));
        out_y.push(percentile(&ys[start..end], q));
    }
    (out_x, out_y)
}

/// One-sided binomial test: P(X >= k) for X ~ Binomial(n, p).
///
/// Terms are accumulated in log space so large samples stay finite.
pub fn binomial_test_greater(k: u64, n: u64, p: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > n {
        return 0.0;
    }
    if p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return 1.0;
    }
    let ln_p = p.ln();
    let ln_q = (1.0 - p).ln();
    let mut total = 0.0;
    for i in k..=n {
        let ln_term = ln_choose(n, i) + i as f64 * ln_p + (n - i) as f64 * ln_q;
        total += ln_term.exp();
    }
    total.min(1.0)
}

/// Natural log of the binomial coefficient C(n, k).
pub fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// Natural log of the gamma function (Lanczos approximation, g = 7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 8] = [
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection formula keeps the approximation in its valid range.
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut acc = 0.999_999_999_999_809_9;
    for (i, c) in COEFFS.iter().enumerate() {
        acc += c / (x + (i + 1) as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

/// Wilson score interval for a binomial proportion, at `z` standard errors.
/// Returns (lower, upper) bounds on the true fraction.
pub fn wilson_interval(k: u64, n: u64, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 1.0);
    }
    let nf = n as f64;
    let phat = k as f64 / nf;
    let z2 = z * z;
    let denom = 1.0 + z2 / nf;
    let center = (phat + z2 / (2.0 * nf)) / denom;
    let half = z * (phat * (1.0 - phat) / nf + z2 / (4.0 * nf * nf)).sqrt() / denom;
    ((center - half).max(0.0), (center + half).min(1.0))
}

/// Poisson upper limit at `s` Gaussian sigmas (Gehrels 1986 approximation).
pub fn poisson_upper(n: u64, s: f64) -> f64 {
    let nf = n as f64;
    (nf + 1.0) * (1.0 - 1.0 / (9.0 * (nf + 1.0)) + s / (3.0 * (nf + 1.0).sqrt())).powi(3)
}

/// Poisson lower limit at `s` Gaussian sigmas (Gehrels 1986 approximation).
pub fn poisson_lower(n: u64, s: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    (nf * (1.0 - 1.0 / (9.0 * nf) - s / (3.0 * nf.sqrt())).powi(3)).max(0.0)
}
