//! Least-squares fitting: polynomials, a bounded double-Gaussian model for
//! the excess histograms, and natural cubic splines for smooth overlays.

use nalgebra::{DMatrix, DVector};

use crate::{FitError, Result};

/// Polynomial with coefficients stored lowest order first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn new(coeffs: Vec<f64>) -> Self {
        assert!(!coeffs.is_empty(), "polynomial needs at least one coefficient");
        Self { coeffs }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Coefficients, lowest order first.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Evaluate by Horner's rule.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }
}

/// Least-squares polynomial fit of the given degree.
///
/// Solves the Vandermonde system by SVD, which stays well behaved for the
/// nearly collinear abscissas the binned correction fits produce.
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Polynomial> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch(xs.len(), ys.len()));
    }
    if xs.len() < degree + 1 {
        return Err(FitError::TooFewPoints {
            needed: degree + 1,
            got: xs.len(),
        });
    }

    let design = DMatrix::from_fn(xs.len(), degree + 1, |row, col| xs[row].powi(col as i32));
    let rhs = DVector::from_column_slice(ys);
    let solution = design
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|e| FitError::Singular(e.to_string()))?;

    Ok(Polynomial::new(solution.iter().copied().collect()))
}

/// Sum of two Gaussians: the single-star peak plus the binary shoulder.
#[derive(Debug, Clone, Copy)]
pub struct DoubleGaussian {
    pub amp1: f64,
    pub mean1: f64,
    pub sigma1: f64,
    pub amp2: f64,
    pub mean2: f64,
    pub sigma2: f64,
}

impl DoubleGaussian {
    pub fn eval(&self, x: f64) -> f64 {
        gaussian(x, self.amp1, self.mean1, self.sigma1)
            + gaussian(x, self.amp2, self.mean2, self.sigma2)
    }

    fn params(&self) -> [f64; 6] {
        [
            self.amp1, self.mean1, self.sigma1, self.amp2, self.mean2, self.sigma2,
        ]
    }

    fn from_params(p: &[f64]) -> Self {
        Self {
            amp1: p[0],
            mean1: p[1],
            sigma1: p[2],
            amp2: p[3],
            mean2: p[4],
            sigma2: p[5],
        }
    }
}

fn gaussian(x: f64, amp: f64, mean: f64, sigma: f64) -> f64 {
    let z = (x - mean) / sigma;
    amp * (-0.5 * z * z).exp()
}

/// Outcome of a double-Gaussian fit. Non-convergence is reported, not
/// raised: the callers print a diagnostic and use the last iterate.
#[derive(Debug, Clone)]
pub struct DoubleGaussianFit {
    pub model: DoubleGaussian,
    pub converged: bool,
    pub iterations: usize,
    pub residual_norm: f64,
}

/// Box constraints for the six double-Gaussian parameters, in the order
/// (amp1, mean1, sigma1, amp2, mean2, sigma2).
pub type DoubleGaussianBounds = [(f64, f64); 6];

/// Bounds matching the excess-histogram fits: a single-star peak near zero
/// and a binary shoulder at brighter (more negative) excess.
pub fn binary_single_bounds() -> DoubleGaussianBounds {
    [
        (0.0, f64::INFINITY),
        (-0.5, 0.5),
        (0.01, 0.5),
        (0.0, f64::INFINITY),
        (-1.5, 0.0),
        (0.01, 0.5),
    ]
}

/// Fit a double Gaussian to histogram points by bounded Levenberg-Marquardt.
pub fn fit_double_gaussian(
    xs: &[f64],
    ys: &[f64],
    initial: DoubleGaussian,
    bounds: &DoubleGaussianBounds,
) -> Result<DoubleGaussianFit> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch(xs.len(), ys.len()));
    }
    if xs.len() < 6 {
        return Err(FitError::TooFewPoints {
            needed: 6,
            got: xs.len(),
        });
    }

    const MAX_ITERS: usize = 200;
    const COST_TOL: f64 = 1e-10;

    let clamp = |p: &mut [f64; 6]| {
        for (value, (lo, hi)) in p.iter_mut().zip(bounds) {
            *value = value.clamp(*lo, *hi);
        }
    };

    let mut params = initial.params();
    clamp(&mut params);
    let mut cost = residual_cost(xs, ys, &params);
    let mut lambda = 1e-3;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..MAX_ITERS {
        iterations = iter + 1;
        let (jtj, jtr) = normal_system(xs, ys, &params);

        // Damped normal equations; the damping scales with the diagonal so
        // parameters of very different magnitude step sensibly.
        let mut damped = jtj.clone();
        for i in 0..6 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
        }
        let step = match damped.lu().solve(&(-&jtr)) {
            Some(step) => step,
            None => {
                lambda *= 10.0;
                continue;
            }
        };

        let mut trial = params;
        for (slot, delta) in trial.iter_mut().zip(step.iter()) {
            *slot += delta;
        }
        clamp(&mut trial);
        let trial_cost = residual_cost(xs, ys, &trial);

        if trial_cost < cost {
            let improvement = cost - trial_cost;
            params = trial;
            cost = trial_cost;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement <= COST_TOL * cost.max(1.0) {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    Ok(DoubleGaussianFit {
        model: DoubleGaussian::from_params(&params),
        converged,
        iterations,
        residual_norm: cost.sqrt(),
    })
}

fn residual_cost(xs: &[f64], ys: &[f64], params: &[f64; 6]) -> f64 {
    let model = DoubleGaussian::from_params(params);
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = model.eval(x) - y;
            r * r
        })
        .sum()
}

/// J^T J and J^T r for the current parameters, with the analytic Jacobian.
fn normal_system(xs: &[f64], ys: &[f64], params: &[f64; 6]) -> (DMatrix<f64>, DVector<f64>) {
    let model = DoubleGaussian::from_params(params);
    let mut jtj = DMatrix::<f64>::zeros(6, 6);
    let mut jtr = DVector::<f64>::zeros(6);

    for (&x, &y) in xs.iter().zip(ys) {
        let e1 = gaussian(x, 1.0, model.mean1, model.sigma1);
        let e2 = gaussian(x, 1.0, model.mean2, model.sigma2);
        let d1 = x - model.mean1;
        let d2 = x - model.mean2;
        let row = [
            e1,
            model.amp1 * e1 * d1 / (model.sigma1 * model.sigma1),
            model.amp1 * e1 * d1 * d1 / (model.sigma1 * model.sigma1 * model.sigma1),
            e2,
            model.amp2 * e2 * d2 / (model.sigma2 * model.sigma2),
            model.amp2 * e2 * d2 * d2 / (model.sigma2 * model.sigma2 * model.sigma2),
        ];
        let r = model.eval(x) - y;
        for i in 0..6 {
            jtr[i] += row[i] * r;
            for j in 0..6 {
                jtj[(i, j)] += row[i] * row[j];
            }
        }
    }
    (jtj, jtr)
}

/// Natural cubic spline through sorted data points.
///
/// Evaluation outside the fitted range returns the boundary value; the
/// overlay curves never extrapolate.
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    coeffs: Vec<[f64; 4]>,
}

impl CubicSpline {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch(x.len(), y.len()));
        }
        if x.len() < 2 {
            return Err(FitError::TooFewPoints {
                needed: 2,
                got: x.len(),
            });
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FitError::UnsortedAbscissas);
        }

        let n = x.len();
        let mut h = vec![0.0; n - 1];
        for i in 0..n - 1 {
            h[i] = x[i + 1] - x[i];
        }

        // Thomas algorithm for the second-derivative system with natural
        // boundary conditions.
        let mut alpha = vec![0.0; n - 1];
        for i in 1..n - 1 {
            alpha[i] =
                (3.0 / h[i]) * (y[i + 1] - y[i]) - (3.0 / h[i - 1]) * (y[i] - y[i - 1]);
        }
        let mut l = vec![1.0; n];
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];
        for i in 1..n - 1 {
            l[i] = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        let mut c = vec![0.0; n];
        let mut coeffs = vec![[0.0; 4]; n - 1];
        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            let b = (y[j + 1] - y[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            let d = (c[j + 1] - c[j]) / (3.0 * h[j]);
            coeffs[j] = [y[j], b, c[j], d];
        }

        Ok(Self { x, y, coeffs })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[self.x.len() - 1] {
            return self.y[self.y.len() - 1];
        }
        let segment = match self.x.binary_search_by(|probe| probe.total_cmp(&x)) {
            Ok(idx) => idx.min(self.coeffs.len() - 1),
            Err(idx) => idx - 1,
        };
        let dx = x - self.x[segment];
        let [a, b, c, d] = self.coeffs[segment];
        a + b * dx + c * dx * dx + d * dx * dx * dx
    }

    /// Evaluate at `n_points` evenly spaced abscissas across the fit range.
    pub fn sample(&self, n_points: usize) -> Vec<(f64, f64)> {
        assert!(n_points >= 2);
        let x0 = self.x[0];
        let x1 = self.x[self.x.len() - 1];
        let dx = (x1 - x0) / (n_points - 1) as f64;
        (0..n_points)
            .map(|i| {
                let x = x0 + i as f64 * dx;
                (x, self.evaluate(x))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn test_polynomial_eval() {
        // 1 + 2x + 3x^2
        let poly = Polynomial::new(vec![1.0, 2.0, 3.0]);
        assert_relative_eq!(poly.eval(0.0), 1.0);
        assert_relative_eq!(poly.eval(2.0), 17.0);
        assert_eq!(poly.degree(), 2);
    }

    #[test]
    fn test_polyfit_recovers_quadratic() {
        let xs: Vec<f64> = (0..20).map(|i| -1.0 + 0.1 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 - 1.5 * x + 2.0 * x * x).collect();
        let poly = polyfit(&xs, &ys, 2).unwrap();
        assert_relative_eq!(poly.coeffs()[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(poly.coeffs()[1], -1.5, epsilon = 1e-9);
        assert_relative_eq!(poly.coeffs()[2], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_polyfit_too_few_points() {
        let result = polyfit(&[1.0, 2.0], &[1.0, 2.0], 2);
        assert!(matches!(result, Err(FitError::TooFewPoints { .. })));
    }

    #[test]
    fn test_double_gaussian_fit_recovers_components() {
        let truth = DoubleGaussian {
            amp1: 100.0,
            mean1: 0.02,
            sigma1: 0.1,
            amp2: 25.0,
            mean2: -0.7,
            sigma2: 0.15,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2018);
        let noise = Normal::new(0.0, 0.5).unwrap();
        let xs: Vec<f64> = (0..60).map(|i| -1.6 + 2.7 * i as f64 / 59.0).collect();
        let ys: Vec<f64> = xs
            .iter()
            .map(|&x| truth.eval(x) + noise.sample(&mut rng))
            .collect();

        let initial = DoubleGaussian {
            amp1: 60.0,
            mean1: 0.0,
            sigma1: 0.1,
            amp2: 15.0,
            mean2: -0.75,
            sigma2: 0.1,
        };
        let fit = fit_double_gaussian(&xs, &ys, initial, &binary_single_bounds()).unwrap();
        assert!(fit.converged, "fit did not converge in {} iterations", fit.iterations);
        assert_relative_eq!(fit.model.mean1, truth.mean1, epsilon = 0.02);
        assert_relative_eq!(fit.model.sigma1, truth.sigma1, epsilon = 0.02);
        assert_relative_eq!(fit.model.mean2, truth.mean2, epsilon = 0.05);
    }

    #[test]
    fn test_double_gaussian_respects_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let xs: Vec<f64> = (0..30).map(|i| -1.0 + i as f64 / 15.0).collect();
        let ys: Vec<f64> = xs.iter().map(|_| rng.gen_range(0.0..5.0)).collect();
        let initial = DoubleGaussian {
            amp1: 1.0,
            mean1: 0.0,
            sigma1: 0.05,
            amp2: 1.0,
            mean2: -0.5,
            sigma2: 0.05,
        };
        let bounds = binary_single_bounds();
        let fit = fit_double_gaussian(&xs, &ys, initial, &bounds).unwrap();
        let p = fit.model;
        assert!(p.sigma1 >= bounds[2].0 && p.sigma1 <= bounds[2].1);
        assert!(p.mean2 >= bounds[4].0 && p.mean2 <= bounds[4].1);
        assert!(p.amp1 >= 0.0 && p.amp2 >= 0.0);
    }

    #[test]
    fn test_spline_passes_through_nodes() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![0.0, 1.0, 4.0, 9.0];
        let spline = CubicSpline::new(x.clone(), y.clone()).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert_relative_eq!(spline.evaluate(*xi), *yi, epsilon = 1e-10);
        }
        // No extrapolation past the boundaries.
        assert_relative_eq!(spline.evaluate(-5.0), 0.0);
        assert_relative_eq!(spline.evaluate(10.0), 9.0);
    }

    #[test]
    fn test_spline_rejects_unsorted_input() {
        let result = CubicSpline::new(vec![0.0, 2.0, 1.0], vec![0.0, 1.0, 2.0]);
        assert!(matches!(result, Err(FitError::UnsortedAbscissas)));
    }

    #[test]
    fn test_spline_sample_endpoints() {
        let spline = CubicSpline::new(vec![0.0, 2.0, 4.0], vec![1.0, 3.0, 1.0]).unwrap();
        let samples = spline.sample(9);
        assert_eq!(samples.len(), 9);
        assert_relative_eq!(samples[0].0, 0.0);
        assert_relative_eq!(samples[8].0, 4.0);
        assert_relative_eq!(samples[0].1, 1.0);
    }
}
