//! Binary-significance report for the synchronized-candidate period window
//!
//! For rotators in the 1.5--7 day window, tests whether the fraction showing
//! photometric binary excesses exceeds the field binary fraction, using a
//! one-sided binomial test. Run for both the spectroscopic and the full
//! photometric samples, at the inclusive and conservative thresholds.

use rotmath::stats;

use crate::context::Context;
use crate::samples::SampleStar;
use crate::Result;

/// Inclusive photometric-binary threshold on the corrected excess (mag).
pub const INCLUSIVE_LIMIT: f64 = -0.2;

/// Conservative photometric-binary threshold on the corrected excess (mag).
pub const CONSERVATIVE_LIMIT: f64 = -0.3;

/// Synchronized-candidate period window (days).
pub const SYNC_WINDOW: (f64, f64) = (1.5, 7.0);

/// Detached eclipsing binaries only; shorter periods are contact systems.
pub const DETACHED_MIN_PERIOD: f64 = 1.0;

/// Counts feeding one binomial test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceResult {
    /// Rotators (plus short-period EBs) in the period window
    pub n_rapid: u64,
    /// Of those, the number showing a binary excess
    pub n_rapid_binaries: u64,
    /// Field binary fraction over the full sample
    pub field_fraction: f64,
    /// One-sided binomial p-value
    pub p_value: f64,
    /// Gaussian-approximation p-value, as a cross-check on the exact test
    pub normal_approx_p: f64,
}

/// Binary significance from a field sample, the rotators carrying periods,
/// and the eclipsing binaries, at one excess threshold.
pub fn binary_significance(
    field_excesses: &[f64],
    rotators: &[(f64, f64)],
    ebs: &[(f64, f64)],
    limit: f64,
    window: (f64, f64),
) -> SignificanceResult {
    let in_window = |period: f64| period > window.0 && period < window.1;

    let field_total = field_excesses.len() + ebs.len();
    let field_binaries = field_excesses.iter().filter(|&&e| e < limit).count()
        + ebs.iter().filter(|&&(_, e)| e < limit).count();
    let field_fraction = if field_total > 0 {
        field_binaries as f64 / field_total as f64
    } else {
        0.0
    };

    let rapid_rot: Vec<f64> = rotators
        .iter()
        .filter(|&&(p, _)| in_window(p))
        .map(|&(_, e)| e)
        .collect();
    let rapid_ebs: Vec<f64> = ebs
        .iter()
        .filter(|&&(p, _)| in_window(p))
        .map(|&(_, e)| e)
        .collect();

    let n_rapid = (rapid_rot.len() + rapid_ebs.len()) as u64;
    let n_rapid_binaries = (rapid_rot.iter().filter(|&&e| e < limit).count()
        + rapid_ebs.iter().filter(|&&e| e < limit).count()) as u64;

    let p_value = stats::binomial_test_greater(n_rapid_binaries, n_rapid, field_fraction);
    let normal_approx_p = if n_rapid > 0 && field_fraction > 0.0 && field_fraction < 1.0 {
        let nf = n_rapid as f64;
        let z = (n_rapid_binaries as f64 - nf * field_fraction)
            / (nf * field_fraction * (1.0 - field_fraction)).sqrt();
        1.0 - stats::normal_cdf(z)
    } else {
        1.0
    };
    SignificanceResult {
        n_rapid,
        n_rapid_binaries,
        field_fraction,
        p_value,
        normal_approx_p,
    }
}

fn corrected(rows: &[SampleStar]) -> Vec<f64> {
    rows.iter().map(|s| s.corrected_k_excess).collect()
}

fn with_period<F>(rows: &[SampleStar], period: F) -> Vec<(f64, f64)>
where
    F: Fn(&SampleStar) -> Option<f64>,
{
    rows.iter()
        .filter_map(|s| period(s).map(|p| (p, s.corrected_k_excess)))
        .collect()
}

/// Print the full significance report for both samples.
pub fn report_binary_significance(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let apo_dwarfs = apo.subsample(&["Dwarfs", "Statistics Teff"])?;
    let eb = ctx.eb_sample()?;
    let eb_dwarfs: Vec<SampleStar> = eb
        .subsample(&["Dwarfs", "Statistics Teff"])?
        .into_iter()
        .filter(|s| s.eb_period.is_some_and(|p| p > DETACHED_MIN_PERIOD))
        .collect();

    println!("== Spectroscopic sample, {:?} day window ==", SYNC_WINDOW);
    let rotators = with_period(&apo_dwarfs, |s| s.prot);
    let eb_pairs = with_period(&eb_dwarfs, |s| s.eb_period);
    for (label, limit) in [
        ("inclusive", INCLUSIVE_LIMIT),
        ("conservative", CONSERVATIVE_LIMIT),
    ] {
        let result = binary_significance(
            &corrected(&apo_dwarfs),
            &rotators,
            &eb_pairs,
            limit,
            SYNC_WINDOW,
        );
        print_result(label, limit, &result);
    }

    let mcq = ctx.mcquillan_sample()?;
    let nomcq = ctx.nondetection_sample()?;
    let mcq_dwarfs = mcq.subsample(&["Dwarfs", "Statistics Teff"])?;
    let nomcq_dwarfs = nomcq.subsample(&["Dwarfs", "Statistics Teff"])?;

    // The EBs enter the field sample on their own; drop their rotation
    // rows so no system counts twice.
    let eb_kepids: Vec<u64> = eb_dwarfs.iter().map(|s| s.kepid).collect();
    let mcq_dwarfs: Vec<SampleStar> =
        catalogs::xmatch::filter_out_ids(&mcq_dwarfs, &eb_kepids, |s| s.kepid)
            .into_iter()
            .cloned()
            .collect();
    let mut field = corrected(&mcq_dwarfs);
    field.extend(corrected(&nomcq_dwarfs));

    println!("== Photometric sample, {:?} day window ==", SYNC_WINDOW);
    let rotators = with_period(&mcq_dwarfs, |s| s.prot);
    for (label, limit) in [
        ("inclusive", INCLUSIVE_LIMIT),
        ("conservative", CONSERVATIVE_LIMIT),
    ] {
        let result = binary_significance(&field, &rotators, &eb_pairs, limit, SYNC_WINDOW);
        print_result(label, limit, &result);
    }
    Ok(())
}

fn print_result(label: &str, limit: f64, result: &SignificanceResult) {
    println!("-- {label} cut (excess < {limit:g} mag) --");
    println!("Number of rapid rotators: {}", result.n_rapid);
    println!("Number of rapid binaries: {}", result.n_rapid_binaries);
    println!("Full binary fraction: {:.2}", result.field_fraction);
    println!("P-value: {:.2e}", result.p_value);
    println!("P-value (normal approximation): {:.2e}", result.normal_approx_p);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_enriched_window_is_significant() {
        // Field: 5% binaries. Window rotators: 60% binaries.
        let mut field = vec![0.0; 950];
        field.extend(vec![-0.5; 50]);
        let mut rotators: Vec<(f64, f64)> = (0..30).map(|_| (3.0, -0.5)).collect();
        rotators.extend((0..20).map(|_| (3.0, 0.0)));
        // Slow rotators outside the window don't count.
        rotators.extend((0..100).map(|_| (20.0, 0.0)));

        let result = binary_significance(&field, &rotators, &[], -0.3, (1.5, 7.0));
        assert_eq!(result.n_rapid, 50);
        assert_eq!(result.n_rapid_binaries, 30);
        assert_relative_eq!(result.field_fraction, 0.05, epsilon = 1e-12);
        assert!(result.p_value < 1e-10);
    }

    #[test]
    fn test_unenriched_window_is_not_significant() {
        let mut field = vec![0.0; 900];
        field.extend(vec![-0.5; 100]);
        // Window rotators drawn at the field rate.
        let mut rotators: Vec<(f64, f64)> = (0..45).map(|_| (3.0, 0.0)).collect();
        rotators.extend((0..5).map(|_| (3.0, -0.5)));

        let result = binary_significance(&field, &rotators, &[], -0.3, (1.5, 7.0));
        assert!(result.p_value > 0.1);
    }

    #[test]
    fn test_ebs_count_in_both_sides() {
        let field = vec![0.0; 100];
        let ebs = vec![(3.0, -0.6), (15.0, -0.6)];
        let result = binary_significance(&field, &[], &ebs, -0.3, (1.5, 7.0));
        // Both EBs join the field denominator; only the short-period one is
        // in the window.
        assert_relative_eq!(result.field_fraction, 2.0 / 102.0, epsilon = 1e-12);
        assert_eq!(result.n_rapid, 1);
        assert_eq!(result.n_rapid_binaries, 1);
    }

    #[test]
    fn test_empty_window() {
        let field = vec![0.0; 10];
        let result = binary_significance(&field, &[], &[], -0.3, (1.5, 7.0));
        assert_eq!(result.n_rapid, 0);
        assert_relative_eq!(result.p_value, 1.0);
    }
}
