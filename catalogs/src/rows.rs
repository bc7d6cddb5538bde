//! Typed rows for each input catalog
//!
//! Masked values in the source tables (stars without a calibrated abundance,
//! without a Gaia parallax, and so on) are carried as `None`, never as NaN
//! sentinels.

use serde::Deserialize;

use crate::io::bool_from_int;

/// One star from the APOGEE spectroscopic cross-match against the Kepler
/// target list.
#[derive(Debug, Clone, Deserialize)]
pub struct ApogeeStar {
    /// Kepler Input Catalog identifier
    pub kepid: u64,
    /// APOGEE identifier, equivalent to the 2MASS designation
    pub apogee_id: String,
    /// Spectroscopic effective temperature (K)
    pub teff: f64,
    /// Effective temperature uncertainty (K)
    pub teff_err: f64,
    /// Spectroscopic surface gravity (log cgs)
    pub logg: f64,
    /// Calibrated iron abundance (dex); absent for some provenances
    pub fe_h: Option<f64>,
    /// Projected rotation velocity (km/s); absent below the detection limit
    pub vsini: Option<f64>,
    /// Double-lined spectroscopic binary flag
    #[serde(deserialize_with = "bool_from_int")]
    pub dlsb: bool,
    /// Targeting program the star was observed under
    pub program: String,
    /// 2MASS apparent Ks magnitude
    pub kmag: f64,
    /// Absolute Ks magnitude from the Gaia parallax; absent without one
    pub m_k: Option<f64>,
    /// Upper absolute-magnitude uncertainty (mag)
    pub m_k_err_up: Option<f64>,
    /// Lower absolute-magnitude uncertainty (mag)
    pub m_k_err_down: Option<f64>,
    /// Gaia parallax (mas)
    pub parallax: Option<f64>,
}

/// One star from the photometric stellar-parameter table covering the full
/// Kepler target list (SDSS-calibrated temperatures).
#[derive(Debug, Clone, Deserialize)]
pub struct KicStar {
    /// Kepler Input Catalog identifier
    pub kepid: u64,
    /// SDSS-calibrated photometric effective temperature (K)
    pub sdss_teff: f64,
    /// 2MASS apparent Ks magnitude
    pub kmag: f64,
    /// Absolute Ks magnitude from the Gaia parallax
    pub m_k: Option<f64>,
    pub m_k_err_up: Option<f64>,
    pub m_k_err_down: Option<f64>,
}

/// One rotation-period detection from the McQuillan catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct RotationPeriod {
    /// Kepler Input Catalog identifier
    pub kepid: u64,
    /// Photometric rotation period (days)
    pub prot: f64,
    /// Period uncertainty (days)
    pub prot_err: f64,
    /// Photometric modulation amplitude (ppm)
    pub rper: f64,
}

/// One system from the Villanova eclipsing-binary catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct EclipsingBinary {
    /// Kepler Input Catalog identifier
    pub kepid: u64,
    /// Orbital period (days)
    pub period: f64,
    /// Light-curve morphology parameter; near 1 for contact systems
    pub morphology: f64,
}

/// A McQuillan target without a period detection. Stellar parameters come
/// from the KIC table via cross-match.
#[derive(Debug, Clone, Deserialize)]
pub struct NonDetection {
    pub kepid: u64,
}
