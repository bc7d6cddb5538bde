//! Analysis sample assembly
//!
//! Cross-matches the input catalogs into one row type, computes the
//! magnitude excesses against the model grid, derives the empirical
//! flattening corrections, and wraps each sample in a splitter tagged with
//! the selection criteria the figures reference by name.

use std::collections::HashMap;
use std::sync::Arc;

use catalogs::rows::KicStar;
use catalogs::{CatalogStore, SampleSplitter};
use isochrones::corrections::{
    flatten_ms_metallicity, flatten_ms_temperature, BinnedRidge, Polynomial,
};
use isochrones::{excess, IsochroneSet, REFERENCE_FEH};

use crate::Result;

/// K-excess floor separating the dwarf sequence from evolved stars (mag).
pub const DWARF_EXCESS_FLOOR: f64 = -1.3;

/// Temperature window where the rotation statistics are computed (K).
pub const STATISTICS_TEFF: (f64, f64) = (4000.0, 5250.0);

/// Wider temperature window used to derive the flattening corrections (K).
pub const METCOR_TEFF: (f64, f64) = (4000.0, 5500.0);

/// Adopted photometric temperature uncertainty (K).
pub const PHOT_TEFF_ERR: f64 = 100.0;

/// Metallicity-correction binning: equal-population bins and fit degree.
const MET_BINS: usize = 6;
const MET_DEG: usize = 2;

/// Temperature-correction binning: equal-population bins and fit degree.
const TEFF_BINS: usize = 5;
const TEFF_DEG: usize = 1;

/// One cross-matched star with its derived excess columns.
#[derive(Debug, Clone)]
pub struct SampleStar {
    pub kepid: u64,
    /// 2MASS/APOGEE designation, for spectroscopic rows
    pub designation: Option<String>,
    /// Adopted temperature: spectroscopic for APOGEE rows, SDSS otherwise (K)
    pub teff: f64,
    pub teff_err: f64,
    /// SDSS photometric temperature where available (K)
    pub sdss_teff: Option<f64>,
    pub feh: Option<f64>,
    pub vsini: Option<f64>,
    pub dlsb: bool,
    pub program: Option<String>,
    pub kmag: f64,
    pub m_k: f64,
    pub m_k_err_up: f64,
    pub m_k_err_down: f64,
    pub prot: Option<f64>,
    pub eb_period: Option<f64>,
    /// Observed minus model magnitude at the star's metallicity (mag)
    pub k_excess: f64,
    /// Observed minus model magnitude at the reference metallicity (mag)
    pub solar_k_excess: f64,
    pub k_excess_err_up: f64,
    pub k_excess_err_down: f64,
    /// Excess after the metallicity and temperature flattening (mag)
    pub corrected_k_excess: f64,
}

/// Dwarf selection: photometrically unevolved stars sit above the floor.
pub fn is_dwarf(star: &SampleStar) -> bool {
    star.k_excess > DWARF_EXCESS_FLOOR
}

pub fn in_statistics_window(teff: f64) -> bool {
    teff > STATISTICS_TEFF.0 && teff < STATISTICS_TEFF.1
}

pub fn in_metcor_window(teff: f64) -> bool {
    teff > METCOR_TEFF.0 && teff < METCOR_TEFF.1
}

/// The empirical flattening corrections, derived once from the
/// spectroscopic dwarf sample and applied to every sample.
#[derive(Debug, Clone)]
pub struct CorrectionSet {
    /// Quadratic K-excess trend over [Fe/H]
    pub metallicity: Polynomial,
    pub met_ridge: BinnedRidge,
    /// Residual linear trend over spectroscopic temperature
    pub spec_teff: Polynomial,
    pub spec_ridge: BinnedRidge,
    /// Linear trend of the solar-reference excess over SDSS temperature
    pub phot_teff: Polynomial,
    pub phot_ridge: BinnedRidge,
}

impl CorrectionSet {
    /// Derive the corrections from the raw spectroscopic sample.
    pub fn derive(rows: &[SampleStar]) -> Result<Self> {
        // Metallicity trend, over the wider correction window.
        let met_rows: Vec<&SampleStar> = rows
            .iter()
            .filter(|s| is_dwarf(s) && in_metcor_window(s.teff) && s.feh.is_some())
            .collect();
        let excesses: Vec<f64> = met_rows.iter().map(|s| s.k_excess).collect();
        let fehs: Vec<f64> = met_rows.iter().filter_map(|s| s.feh).collect();
        let (metallicity, met_ridge) =
            flatten_ms_metallicity(&excesses, &fehs, MET_BINS, MET_DEG)?;

        // Residual temperature trend of the metallicity-corrected excess,
        // over the statistics window.
        let spec_rows: Vec<&SampleStar> = rows
            .iter()
            .filter(|s| is_dwarf(s) && in_statistics_window(s.teff) && s.feh.is_some())
            .collect();
        let partly: Vec<f64> = spec_rows
            .iter()
            .map(|s| s.k_excess - metallicity.eval(s.feh.unwrap_or(REFERENCE_FEH)))
            .collect();
        let teffs: Vec<f64> = spec_rows.iter().map(|s| s.teff).collect();
        let (spec_teff, spec_ridge) =
            flatten_ms_temperature(&partly, &teffs, TEFF_BINS, TEFF_DEG)?;

        // Photometric-temperature trend of the solar-reference excess, for
        // the samples without spectroscopy.
        let phot_rows: Vec<&SampleStar> = rows
            .iter()
            .filter(|s| is_dwarf(s) && s.sdss_teff.is_some_and(in_metcor_window))
            .collect();
        let solar: Vec<f64> = phot_rows.iter().map(|s| s.solar_k_excess).collect();
        let sdss: Vec<f64> = phot_rows.iter().filter_map(|s| s.sdss_teff).collect();
        let (phot_teff, phot_ridge) = flatten_ms_temperature(&solar, &sdss, TEFF_BINS, TEFF_DEG)?;

        log::info!(
            "derived corrections: {} metallicity rows, {} spectroscopic rows, {} photometric rows",
            met_rows.len(),
            spec_rows.len(),
            phot_rows.len()
        );

        Ok(Self {
            metallicity,
            met_ridge,
            spec_teff,
            spec_ridge,
            phot_teff,
            phot_ridge,
        })
    }

    /// Metallicity-corrected excess, before the temperature term.
    pub fn partly_corrected(&self, k_excess: f64, feh: f64) -> f64 {
        k_excess - self.metallicity.eval(feh)
    }

    /// Fully corrected excess for a spectroscopic row.
    pub fn corrected_spec(&self, k_excess: f64, feh: f64, teff: f64) -> f64 {
        self.partly_corrected(k_excess, feh) - self.spec_teff.eval(teff)
    }

    /// Corrected excess for a photometric row.
    pub fn corrected_phot(&self, solar_k_excess: f64, sdss_teff: f64) -> f64 {
        solar_k_excess - self.phot_teff.eval(sdss_teff)
    }
}

/// Assemble the spectroscopic sample and derive the corrections from it.
///
/// Rows without an absolute magnitude or outside the model grid's
/// temperature coverage are dropped; the drop count is logged.
pub fn build_apogee_sample(
    store: &CatalogStore,
    mist: &IsochroneSet,
) -> Result<(SampleSplitter<SampleStar>, Arc<CorrectionSet>)> {
    let apo = store.apogee()?;
    let kic = store.kic_stars()?;
    let mcq = store.mcquillan()?;
    let ebs = store.ebs()?;

    let sdss_by_kic: HashMap<u64, f64> =
        kic.iter().map(|star| (star.kepid, star.sdss_teff)).collect();
    let prot_by_kic: HashMap<u64, f64> = mcq.iter().map(|r| (r.kepid, r.prot)).collect();
    let period_by_kic: HashMap<u64, f64> = ebs.iter().map(|r| (r.kepid, r.period)).collect();

    let mut rows = Vec::with_capacity(apo.len());
    let mut dropped = 0usize;
    for star in apo.iter() {
        let feh_eff = star.fe_h.unwrap_or(REFERENCE_FEH);
        let assembled = star.m_k.and_then(|m_k| {
            let k_excess = excess::k_excess(mist, m_k, star.teff, feh_eff)?;
            let solar = excess::solar_k_excess(mist, m_k, star.teff)?;
            let err_up = excess::k_excess_error(
                mist,
                star.teff,
                feh_eff,
                star.teff_err,
                star.m_k_err_up.unwrap_or(0.0),
            )?;
            let err_down = excess::k_excess_error(
                mist,
                star.teff,
                feh_eff,
                star.teff_err,
                star.m_k_err_down.unwrap_or(0.0),
            )?;
            Some(SampleStar {
                kepid: star.kepid,
                designation: Some(star.apogee_id.clone()),
                teff: star.teff,
                teff_err: star.teff_err,
                sdss_teff: sdss_by_kic.get(&star.kepid).copied(),
                feh: star.fe_h,
                vsini: star.vsini,
                dlsb: star.dlsb,
                program: Some(star.program.clone()),
                kmag: star.kmag,
                m_k,
                m_k_err_up: star.m_k_err_up.unwrap_or(0.0),
                m_k_err_down: star.m_k_err_down.unwrap_or(0.0),
                prot: prot_by_kic.get(&star.kepid).copied(),
                eb_period: period_by_kic.get(&star.kepid).copied(),
                k_excess,
                solar_k_excess: solar,
                k_excess_err_up: err_up,
                k_excess_err_down: err_down,
                corrected_k_excess: k_excess,
            })
        });
        match assembled {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }
    log::info!(
        "spectroscopic sample: {} rows assembled, {} dropped (no parallax or off-grid)",
        rows.len(),
        dropped
    );

    let corrections = Arc::new(CorrectionSet::derive(&rows)?);
    for row in &mut rows {
        let feh_eff = row.feh.unwrap_or(REFERENCE_FEH);
        row.corrected_k_excess = corrections.corrected_spec(row.k_excess, feh_eff, row.teff);
    }

    let mut split = SampleSplitter::new(rows);
    tag_common(&mut split);
    split.tag("Bad", |s| s.feh.is_none());
    split.tag("DLSB", |s| s.dlsb);
    split.tag("Mcq", |s| s.prot.is_some());
    log::info!(
        "spectroscopic sample: {} dwarfs of {} stars (criteria: {:?})",
        split.subsample_count(&["Dwarfs"])?,
        split.len(),
        split.criterion_names().collect::<Vec<_>>()
    );
    Ok((split, corrections))
}

/// Assemble the McQuillan rotator sample (photometric parameters).
pub fn build_mcquillan_sample(
    store: &CatalogStore,
    mist: &IsochroneSet,
    corrections: &CorrectionSet,
) -> Result<SampleSplitter<SampleStar>> {
    let mcq = store.mcquillan()?;
    let kic = store.kic_stars()?;
    let matched = catalogs::xmatch::join_by_kic(&mcq, &kic, |r| r.kepid, |k| k.kepid);
    let rows = matched
        .into_iter()
        .filter_map(|(rot, star)| photometric_star(star, Some(rot.prot), None, mist, corrections))
        .collect();
    Ok(photometric_splitter(rows, "rotation detections"))
}

/// Assemble the McQuillan non-detection sample.
pub fn build_nondetection_sample(
    store: &CatalogStore,
    mist: &IsochroneSet,
    corrections: &CorrectionSet,
) -> Result<SampleSplitter<SampleStar>> {
    let nomcq = store.mcquillan_nondetections()?;
    let kic = store.kic_stars()?;
    let matched = catalogs::xmatch::join_by_kic(&nomcq, &kic, |r| r.kepid, |k| k.kepid);
    let rows = matched
        .into_iter()
        .filter_map(|(_, star)| photometric_star(star, None, None, mist, corrections))
        .collect();
    Ok(photometric_splitter(rows, "non-detections"))
}

/// Assemble the eclipsing-binary sample.
pub fn build_eb_sample(
    store: &CatalogStore,
    mist: &IsochroneSet,
    corrections: &CorrectionSet,
) -> Result<SampleSplitter<SampleStar>> {
    let ebs = store.ebs()?;
    let kic = store.kic_stars()?;
    let matched = catalogs::xmatch::join_by_kic(&ebs, &kic, |r| r.kepid, |k| k.kepid);
    let rows = matched
        .into_iter()
        .filter_map(|(eb, star)| {
            photometric_star(star, None, Some(eb.period), mist, corrections)
        })
        .collect();
    Ok(photometric_splitter(rows, "eclipsing binaries"))
}

fn photometric_star(
    star: &KicStar,
    prot: Option<f64>,
    eb_period: Option<f64>,
    mist: &IsochroneSet,
    corrections: &CorrectionSet,
) -> Option<SampleStar> {
    let m_k = star.m_k?;
    let solar = excess::solar_k_excess(mist, m_k, star.sdss_teff)?;
    let err = excess::k_excess_error(
        mist,
        star.sdss_teff,
        REFERENCE_FEH,
        PHOT_TEFF_ERR,
        star.m_k_err_up.unwrap_or(0.0),
    )?;
    Some(SampleStar {
        kepid: star.kepid,
        designation: None,
        teff: star.sdss_teff,
        teff_err: PHOT_TEFF_ERR,
        sdss_teff: Some(star.sdss_teff),
        feh: None,
        vsini: None,
        dlsb: false,
        program: None,
        kmag: star.kmag,
        m_k,
        m_k_err_up: star.m_k_err_up.unwrap_or(0.0),
        m_k_err_down: star.m_k_err_down.unwrap_or(0.0),
        prot,
        eb_period,
        k_excess: solar,
        solar_k_excess: solar,
        k_excess_err_up: err,
        k_excess_err_down: err,
        corrected_k_excess: corrections.corrected_phot(solar, star.sdss_teff),
    })
}

fn photometric_splitter(rows: Vec<SampleStar>, label: &str) -> SampleSplitter<SampleStar> {
    log::info!("photometric sample ({label}): {} rows", rows.len());
    let mut split = SampleSplitter::new(rows);
    tag_common(&mut split);
    split
}

fn tag_common(split: &mut SampleSplitter<SampleStar>) {
    split.tag("Dwarfs", is_dwarf);
    split.tag("Statistics Teff", |s| in_statistics_window(s.teff));
    split.tag("MetCor Teff", |s| in_metcor_window(s.teff));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use isochrones::ModelGrid;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};
    use rotmath::stats;

    /// Synthetic dwarf sample with a known metallicity trend and a binary
    /// fraction, built against the synthetic model grid.
    fn synthetic_rows(n: usize, seed: u64) -> (Vec<SampleStar>, IsochroneSet) {
        let mist = IsochroneSet::synthetic(ModelGrid::Mist);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scatter = Normal::new(0.0, 0.02).unwrap();
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let teff = rng.gen_range(4100.0..5400.0);
            let feh = rng.gen_range(-0.8..0.4);
            let binary = i % 5 == 0;
            let model = mist.mag_at(teff, feh, 1.0).unwrap();
            let offset = if binary { -0.75 } else { 0.0 };
            let m_k = model + scatter.sample(&mut rng) + offset;
            let k_excess = excess::k_excess(&mist, m_k, teff, feh).unwrap();
            let solar = excess::solar_k_excess(&mist, m_k, teff).unwrap();
            rows.push(SampleStar {
                kepid: 100_000 + i as u64,
                designation: Some(format!("2M{i:08}")),
                teff,
                teff_err: 90.0,
                sdss_teff: Some(teff + rng.gen_range(-50.0..50.0)),
                feh: Some(feh),
                vsini: None,
                dlsb: false,
                program: Some("cool_dwarf".to_string()),
                kmag: 11.0,
                m_k,
                m_k_err_up: 0.02,
                m_k_err_down: 0.02,
                prot: None,
                eb_period: None,
                k_excess,
                solar_k_excess: solar,
                k_excess_err_up: 0.03,
                k_excess_err_down: 0.03,
                corrected_k_excess: k_excess,
            });
        }
        (rows, mist)
    }

    #[test]
    fn test_corrections_flatten_singles() {
        let (rows, _) = synthetic_rows(600, 11);
        let corr = CorrectionSet::derive(&rows).unwrap();

        // After correction the single-star ridge should sit near zero with
        // no residual metallicity tilt.
        let corrected: Vec<(f64, f64)> = rows
            .iter()
            .filter(|s| s.k_excess > -0.3)
            .map(|s| {
                let feh = s.feh.unwrap();
                (feh, corr.corrected_spec(s.k_excess, feh, s.teff))
            })
            .collect();
        let values: Vec<f64> = corrected.iter().map(|&(_, v)| v).collect();
        let ridge = stats::percentile(&values, 75.0);
        assert_relative_eq!(ridge, 0.0, epsilon = 0.05);

        // Split at the median metallicity: both halves should be centered
        // the same after flattening.
        let med_feh = stats::median(&corrected.iter().map(|&(f, _)| f).collect::<Vec<_>>());
        let low: Vec<f64> = corrected
            .iter()
            .filter(|&&(f, _)| f < med_feh)
            .map(|&(_, v)| v)
            .collect();
        let high: Vec<f64> = corrected
            .iter()
            .filter(|&&(f, _)| f >= med_feh)
            .map(|&(_, v)| v)
            .collect();
        assert_relative_eq!(stats::median(&low), stats::median(&high), epsilon = 0.06);
    }

    #[test]
    fn test_corrected_binaries_stay_separated() {
        let (rows, _) = synthetic_rows(500, 23);
        let corr = CorrectionSet::derive(&rows).unwrap();
        let binaries = rows
            .iter()
            .filter(|s| s.k_excess < -0.5)
            .map(|s| corr.corrected_spec(s.k_excess, s.feh.unwrap(), s.teff))
            .collect::<Vec<_>>();
        assert!(!binaries.is_empty());
        // The 0.75 mag binary offset survives the flattening.
        assert!(stats::median(&binaries) < -0.5);
    }

    #[test]
    fn test_dwarf_predicate_uses_excess_floor() {
        let (mut rows, _) = synthetic_rows(10, 3);
        rows[0].k_excess = -2.0;
        assert!(!is_dwarf(&rows[0]));
        rows[1].k_excess = -0.1;
        assert!(is_dwarf(&rows[1]));
    }

    #[test]
    fn test_windows() {
        assert!(in_statistics_window(4500.0));
        assert!(!in_statistics_window(5400.0));
        assert!(in_metcor_window(5400.0));
        assert!(!in_metcor_window(5600.0));
    }
}
