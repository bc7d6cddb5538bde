//! Empirical main-sequence flattening corrections
//!
//! The model isochrones leave residual trends of the K excess with
//! metallicity and temperature. Both corrections are built the same way:
//! split the sample into equal-population bins of the independent variable,
//! trace the single-star ridge as the 75th percentile of the excess in each
//! bin, and fit a low-order polynomial to the ridge. Subtracting the fitted
//! polynomial flattens the main sequence so one binarity threshold applies
//! across the whole sample.
//!
//! The bin count stays a parameter: the published analysis re-derives these
//! coefficients with slightly different binning in different figures, and
//! those per-figure choices are preserved at the call sites.

pub use rotmath::Polynomial;
use rotmath::{polyfit, stats};

use crate::{IsochroneError, Result};

/// Percentile tracing the single-star ridge. Binaries pile up at negative
/// excess, so the upper quartile of the distribution tracks single stars.
pub const RIDGE_PERCENTILE: f64 = 75.0;

/// Binned ridge of a scatter relation: one point per populated bin.
#[derive(Debug, Clone)]
pub struct BinnedRidge {
    /// Mean of the independent variable in each bin
    pub centers: Vec<f64>,
    /// Ridge percentile of the dependent variable in each bin
    pub ridge: Vec<f64>,
    /// MAD of the single-star half about the ridge, per bin
    pub scatter: Vec<f64>,
    /// Rows landing in each bin
    pub counts: Vec<usize>,
}

/// Trace the single-star ridge over equal-population bins of `xs`.
///
/// Bins with no rows are dropped. The per-bin scatter is the median
/// absolute deviation of the rows above the bin median (the single-star
/// half) about the ridge value.
pub fn ridge_equal_population(xs: &[f64], ys: &[f64], n_bins: usize) -> BinnedRidge {
    assert_eq!(xs.len(), ys.len(), "ridge inputs must pair up");
    assert!(n_bins >= 1);

    let quantiles: Vec<f64> = (0..=n_bins)
        .map(|i| 100.0 * i as f64 / n_bins as f64)
        .collect();
    let edges: Vec<f64> = quantiles.iter().map(|&q| stats::percentile(xs, q)).collect();

    let mut ridge = BinnedRidge {
        centers: Vec::with_capacity(n_bins),
        ridge: Vec::with_capacity(n_bins),
        scatter: Vec::with_capacity(n_bins),
        counts: Vec::with_capacity(n_bins),
    };

    for bin in 0..n_bins {
        let (lo, hi) = (edges[bin], edges[bin + 1]);
        let last = bin == n_bins - 1;
        let mut bin_x = Vec::new();
        let mut bin_y = Vec::new();
        for (&x, &y) in xs.iter().zip(ys) {
            let inside = if last {
                x >= lo && x <= hi
            } else {
                x >= lo && x < hi
            };
            if inside {
                bin_x.push(x);
                bin_y.push(y);
            }
        }
        if bin_y.is_empty() {
            continue;
        }
        let ridge_value = stats::percentile(&bin_y, RIDGE_PERCENTILE);
        let bin_median = stats::median(&bin_y);
        let singles: Vec<f64> = bin_y.iter().copied().filter(|&y| y > bin_median).collect();
        let scatter = if singles.is_empty() {
            stats::mad_about(&bin_y, ridge_value)
        } else {
            stats::mad_about(&singles, ridge_value)
        };
        ridge.centers.push(stats::mean(&bin_x));
        ridge.ridge.push(ridge_value);
        ridge.scatter.push(scatter);
        ridge.counts.push(bin_y.len());
    }
    ridge
}

/// Fit the metallicity flattening polynomial to the K-excess ridge.
///
/// Returns the fitted polynomial together with the binned ridge it was fit
/// to, so callers can overplot the binned points.
pub fn flatten_ms_metallicity(
    excesses: &[f64],
    fehs: &[f64],
    n_bins: usize,
    degree: usize,
) -> Result<(Polynomial, BinnedRidge)> {
    fit_ridge(fehs, excesses, n_bins, degree)
}

/// Fit the temperature flattening polynomial to the K-excess ridge.
pub fn flatten_ms_temperature(
    excesses: &[f64],
    teffs: &[f64],
    n_bins: usize,
    degree: usize,
) -> Result<(Polynomial, BinnedRidge)> {
    fit_ridge(teffs, excesses, n_bins, degree)
}

fn fit_ridge(
    xs: &[f64],
    ys: &[f64],
    n_bins: usize,
    degree: usize,
) -> Result<(Polynomial, BinnedRidge)> {
    let ridge = ridge_equal_population(xs, ys, n_bins);
    if ridge.centers.len() < degree + 1 {
        return Err(IsochroneError::TooFewBins {
            needed: degree + 1,
            got: ridge.centers.len(),
        });
    }
    let poly = polyfit(&ridge.centers, &ridge.ridge, degree)
        .map_err(|e| IsochroneError::DegenerateFit(e.to_string()))?;
    log::debug!(
        "ridge fit over {} bins: coefficients {:?}",
        ridge.centers.len(),
        poly.coeffs()
    );
    Ok((poly, ridge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Synthetic sample: single-star ridge following a known polynomial,
    /// with a quarter of the rows displaced brightward as binaries.
    fn ridge_sample(truth: &Polynomial, n: usize) -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        for i in 0..n {
            let x = -0.5 + 1.0 * i as f64 / (n - 1) as f64;
            // Deterministic jitter keeps the test reproducible without a
            // random source.
            let jitter = 0.02 * ((i * 7919) % 11) as f64 / 11.0 - 0.01;
            let binary = i % 4 == 0;
            let offset = if binary { -0.7 } else { 0.0 };
            xs.push(x);
            ys.push(truth.eval(x) + jitter + offset);
        }
        (xs, ys)
    }

    #[test]
    fn test_flatten_metallicity_recovers_trend() {
        let truth = Polynomial::new(vec![-0.05, 0.3, 0.4]);
        let (fehs, excesses) = ridge_sample(&truth, 400);
        let (poly, ridge) = flatten_ms_metallicity(&excesses, &fehs, 6, 2).unwrap();
        assert_eq!(ridge.centers.len(), 6);
        for x in [-0.4, 0.0, 0.4] {
            assert_relative_eq!(poly.eval(x), truth.eval(x), epsilon = 0.05);
        }
    }

    #[test]
    fn test_flattened_residuals_are_centered() {
        let truth = Polynomial::new(vec![0.1, -0.5]);
        let (teffs, excesses) = ridge_sample(&truth, 300);
        let (poly, _) = flatten_ms_temperature(&excesses, &teffs, 5, 1).unwrap();
        let singles: Vec<f64> = excesses
            .iter()
            .zip(&teffs)
            .filter(|&(&e, &t)| e - truth.eval(t) > -0.3)
            .map(|(&e, &t)| e - poly.eval(t))
            .collect();
        let center = rotmath::stats::percentile(&singles, RIDGE_PERCENTILE);
        assert_relative_eq!(center, 0.0, epsilon = 0.03);
    }

    #[test]
    fn test_equal_population_bins_balance() {
        let xs: Vec<f64> = (0..100).map(|i| (i as f64).powf(1.5)).collect();
        let ys = vec![0.0; 100];
        let ridge = ridge_equal_population(&xs, &ys, 4);
        assert_eq!(ridge.counts.len(), 4);
        for &count in &ridge.counts {
            assert!((24..=27).contains(&count), "unbalanced bin: {count}");
        }
        assert_eq!(ridge.counts.iter().sum::<usize>(), 100);
    }

    #[test]
    fn test_too_few_bins_rejected() {
        let xs = vec![0.0, 0.1, 0.2];
        let ys = vec![0.0, 0.0, 0.0];
        let result = flatten_ms_metallicity(&ys, &xs, 1, 2);
        assert!(matches!(result, Err(IsochroneError::TooFewBins { .. })));
    }
}
