//! Magnitude excesses: observed absolute Ks minus the model prediction
//!
//! A star sitting on the single-star main sequence has an excess near zero;
//! an unresolved binary is overluminous and shows a negative excess. The
//! solar-reference variant evaluates the model at the sample's reference
//! metallicity instead of the star's own, for stars without a spectroscopic
//! abundance.

use crate::grid::IsochroneSet;
use crate::{REFERENCE_AGE_GYR, REFERENCE_FEH};

/// Observed minus model magnitude at the given metallicity.
pub fn k_excess(set: &IsochroneSet, m_k: f64, teff: f64, feh: f64) -> Option<f64> {
    let model = set.mag_at(teff, feh, REFERENCE_AGE_GYR)?;
    Some(m_k - model)
}

/// Observed minus model magnitude at the sample reference metallicity.
pub fn solar_k_excess(set: &IsochroneSet, m_k: f64, teff: f64) -> Option<f64> {
    k_excess(set, m_k, teff, REFERENCE_FEH)
}

/// Combined excess uncertainty: the absolute-magnitude error added in
/// quadrature with the temperature error propagated through the model slope.
pub fn k_excess_error(
    set: &IsochroneSet,
    teff: f64,
    feh: f64,
    teff_err: f64,
    m_k_err: f64,
) -> Option<f64> {
    let model_err = set.mag_err_from_teff(teff, feh, REFERENCE_AGE_GYR, teff_err)?;
    Some((model_err * model_err + m_k_err * m_k_err).sqrt())
}

/// Magnitude displacement between an old and a young isochrone at fixed
/// temperature; the expected K-excess drift from main-sequence aging.
pub fn age_displacement(
    set: &IsochroneSet,
    teff: f64,
    feh: f64,
    old_age_gyr: f64,
    young_age_gyr: f64,
) -> Option<f64> {
    let old = set.mag_at(teff, feh, old_age_gyr)?;
    let young = set.mag_at(teff, feh, young_age_gyr)?;
    Some(old - young)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ModelGrid;
    use approx::assert_relative_eq;

    #[test]
    fn test_star_on_the_model_has_zero_excess() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        let m_k = set.mag_at(4500.0, 0.0, REFERENCE_AGE_GYR).unwrap();
        let excess = k_excess(&set, m_k, 4500.0, 0.0).unwrap();
        assert_relative_eq!(excess, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_overluminous_binary_has_negative_excess() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        let model = set.mag_at(4500.0, 0.0, REFERENCE_AGE_GYR).unwrap();
        // An equal-mass binary is ~0.75 mag brighter than a single star.
        let excess = k_excess(&set, model - 0.75, 4500.0, 0.0).unwrap();
        assert_relative_eq!(excess, -0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_excess_masked_off_grid() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        assert!(k_excess(&set, 4.0, 2000.0, 0.0).is_none());
    }

    #[test]
    fn test_excess_error_combines_terms() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        let model_only = set
            .mag_err_from_teff(4500.0, 0.0, REFERENCE_AGE_GYR, 100.0)
            .unwrap();
        let combined = k_excess_error(&set, 4500.0, 0.0, 100.0, 0.03).unwrap();
        assert!(combined > model_only);
        assert!(combined < model_only + 0.03 + 1e-9);
    }

    #[test]
    fn test_age_displacement_zero_for_cool_dwarfs() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        // The synthetic law freezes age evolution below the turnoff region.
        let cool = age_displacement(&set, 3800.0, 0.0, 9.0, 1.0).unwrap();
        assert_relative_eq!(cool, 0.0, epsilon = 1e-9);
        let hot = age_displacement(&set, 6300.0, 0.0, 9.0, 1.0).unwrap();
        assert!(hot < -0.1);
    }
}
