//! Isochrone grid loading and interpolation
//!
//! A model grid holds one `Isochrone` per tabulated metallicity, each a set
//! of age blocks sampling the main sequence as (Teff, M_Ks) pairs with Teff
//! ascending. Lookups interpolate linearly in Teff within a block, in
//! log10(age) between blocks, and in [Fe/H] between isochrones. Outside the
//! grid's temperature coverage the lookup is masked (`None`); requested ages
//! and metallicities clamp to the tabulated range.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::Deserialize;

use crate::{IsochroneError, Result};

/// Which stellar model family a grid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelGrid {
    Mist,
    Dsep,
}

impl ModelGrid {
    /// Subdirectory of the data root holding this family's grid files.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ModelGrid::Mist => "mist",
            ModelGrid::Dsep => "dsep",
        }
    }
}

impl std::fmt::Display for ModelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelGrid::Mist => write!(f, "MIST"),
            ModelGrid::Dsep => write!(f, "DSEP"),
        }
    }
}

/// One grid-file row: a single (Teff, M_Ks) sample of one isochrone.
#[derive(Debug, Deserialize)]
struct GridRow {
    feh: f64,
    log10_age: f64,
    teff: f64,
    m_ks: f64,
}

/// All (Teff, M_Ks) samples for one age of one metallicity.
#[derive(Debug, Clone)]
pub struct AgeBlock {
    pub log10_age: f64,
    teff: Vec<f64>,
    m_ks: Vec<f64>,
}

impl AgeBlock {
    /// Linear interpolation in Teff; masked outside the sampled range.
    fn mag_at(&self, teff: f64) -> Option<f64> {
        let first = *self.teff.first()?;
        let last = *self.teff.last()?;
        if teff < first || teff > last {
            return None;
        }
        let idx = match self.teff.binary_search_by(|probe| probe.total_cmp(&teff)) {
            Ok(exact) => return Some(self.m_ks[exact]),
            Err(idx) => idx,
        };
        let (x0, x1) = (self.teff[idx - 1], self.teff[idx]);
        let (y0, y1) = (self.m_ks[idx - 1], self.m_ks[idx]);
        let frac = (teff - x0) / (x1 - x0);
        Some(y0 + frac * (y1 - y0))
    }
}

/// All ages for one tabulated metallicity.
#[derive(Debug, Clone)]
pub struct Isochrone {
    pub feh: f64,
    blocks: Vec<AgeBlock>,
}

impl Isochrone {
    /// Interpolate to the requested age, clamped to the tabulated age range.
    fn mag_at(&self, teff: f64, age_gyr: f64) -> Option<f64> {
        let la = age_gyr.log10();
        let first = self.blocks.first()?;
        let last = self.blocks.last()?;
        if la <= first.log10_age {
            return first.mag_at(teff);
        }
        if la >= last.log10_age {
            return last.mag_at(teff);
        }
        let hi = self
            .blocks
            .partition_point(|block| block.log10_age < la);
        let (lo_block, hi_block) = (&self.blocks[hi - 1], &self.blocks[hi]);
        let frac = (la - lo_block.log10_age) / (hi_block.log10_age - lo_block.log10_age);
        let lo_mag = lo_block.mag_at(teff)?;
        let hi_mag = hi_block.mag_at(teff)?;
        Some(lo_mag + frac * (hi_mag - lo_mag))
    }
}

/// A full model grid: isochrones sorted by metallicity.
pub struct IsochroneSet {
    model: ModelGrid,
    isochrones: Vec<Isochrone>,
}

impl IsochroneSet {
    /// Load every `*.csv` grid file under `<data_root>/<model_dir>/`.
    pub fn load(data_root: &Path, model: ModelGrid) -> Result<Self> {
        let dir = data_root.join(model.dir_name());
        let entries = fs::read_dir(&dir).map_err(|source| IsochroneError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut rows = Vec::new();
        let mut n_files = 0;
        for entry in entries {
            let entry = entry.map_err(|source| IsochroneError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            n_files += 1;
            let file = fs::File::open(&path).map_err(|source| IsochroneError::Io {
                path: path.clone(),
                source,
            })?;
            let mut reader = csv::Reader::from_reader(file);
            for record in reader.deserialize() {
                let row: GridRow = record.map_err(|source| IsochroneError::Parse {
                    path: path.clone(),
                    source,
                })?;
                rows.push(row);
            }
        }
        if n_files == 0 || rows.is_empty() {
            return Err(IsochroneError::EmptyGrid(dir));
        }
        log::info!(
            "loaded {} grid: {} samples from {} files",
            model,
            rows.len(),
            n_files
        );
        Self::from_rows(model, rows)
    }

    fn from_rows(model: ModelGrid, rows: Vec<GridRow>) -> Result<Self> {
        // Group by metallicity, then by age, keying on rounded values so
        // repeated file rows land in the same cell.
        let key = |v: f64| (v * 1e4).round() as i64;
        let mut by_feh: BTreeMap<i64, BTreeMap<i64, (f64, f64, Vec<(f64, f64)>)>> =
            BTreeMap::new();
        for row in rows {
            let cell = by_feh
                .entry(key(row.feh))
                .or_default()
                .entry(key(row.log10_age))
                .or_insert_with(|| (row.feh, row.log10_age, Vec::new()));
            cell.2.push((row.teff, row.m_ks));
        }

        let mut isochrones = Vec::with_capacity(by_feh.len());
        for (_, ages) in by_feh {
            let mut feh = 0.0;
            let mut blocks = Vec::with_capacity(ages.len());
            for (_, (row_feh, log10_age, mut samples)) in ages {
                feh = row_feh;
                samples.sort_by(|a, b| a.0.total_cmp(&b.0));
                if samples.windows(2).any(|w| w[1].0 <= w[0].0) {
                    return Err(IsochroneError::UnsortedGrid("Teff"));
                }
                let (teff, m_ks) = samples.into_iter().unzip();
                blocks.push(AgeBlock {
                    log10_age,
                    teff,
                    m_ks,
                });
            }
            isochrones.push(Isochrone { feh, blocks });
        }
        Ok(Self { model, isochrones })
    }

    pub fn model(&self) -> ModelGrid {
        self.model
    }

    /// Tabulated metallicities, ascending.
    pub fn metallicities(&self) -> Vec<f64> {
        self.isochrones.iter().map(|iso| iso.feh).collect()
    }

    /// Predicted absolute Ks magnitude at the requested temperature,
    /// metallicity, and age. Masked outside the grid's Teff coverage;
    /// metallicity and age clamp to the tabulated range.
    pub fn mag_at(&self, teff: f64, feh: f64, age_gyr: f64) -> Option<f64> {
        let first = self.isochrones.first()?;
        let last = self.isochrones.last()?;
        if feh <= first.feh {
            return first.mag_at(teff, age_gyr);
        }
        if feh >= last.feh {
            return last.mag_at(teff, age_gyr);
        }
        let hi = self.isochrones.partition_point(|iso| iso.feh < feh);
        let (lo_iso, hi_iso) = (&self.isochrones[hi - 1], &self.isochrones[hi]);
        let frac = (feh - lo_iso.feh) / (hi_iso.feh - lo_iso.feh);
        let lo_mag = lo_iso.mag_at(teff, age_gyr)?;
        let hi_mag = hi_iso.mag_at(teff, age_gyr)?;
        Some(lo_mag + frac * (hi_mag - lo_mag))
    }

    /// Vectorized magnitude lookup over a temperature grid.
    pub fn mag_fixed_age(&self, teffs: &[f64], feh: f64, age_gyr: f64) -> Vec<Option<f64>> {
        teffs
            .par_iter()
            .map(|&teff| self.mag_at(teff, feh, age_gyr))
            .collect()
    }

    /// Vectorized magnitude lookup over a metallicity grid.
    pub fn mag_over_feh(&self, teff: f64, fehs: &[f64], age_gyr: f64) -> Vec<Option<f64>> {
        fehs.par_iter()
            .map(|&feh| self.mag_at(teff, feh, age_gyr))
            .collect()
    }

    /// |dK/dTeff| * sigma_Teff by symmetric finite difference.
    pub fn mag_err_from_teff(
        &self,
        teff: f64,
        feh: f64,
        age_gyr: f64,
        teff_err: f64,
    ) -> Option<f64> {
        const H: f64 = 25.0;
        let above = self.mag_at(teff + H, feh, age_gyr)?;
        let below = self.mag_at(teff - H, feh, age_gyr)?;
        Some(((above - below) / (2.0 * H)).abs() * teff_err)
    }

    /// Closed-form law behind the synthetic test grid.
    ///
    /// Smooth in all three variables, with no age evolution at the cool end
    /// and metal-rich isochrones sitting brighter at fixed temperature.
    pub fn synthetic_law(teff: f64, feh: f64, age_gyr: f64) -> f64 {
        let t = (teff - 5000.0) / 1000.0;
        4.6 - 2.2 * t + 0.35 * t * t - 0.55 * feh
            - 0.25 * age_gyr.log10() * (t + 1.0).max(0.0)
    }

    /// Synthetic grid sampled from `synthetic_law`, for tests and examples.
    pub fn synthetic(model: ModelGrid) -> Self {
        let fehs = [-1.0, -0.5, 0.0, 0.5];
        let ages = [1.0f64, 4.5, 9.0];
        let teffs: Vec<f64> = (0..=45).map(|i| 3000.0 + 100.0 * i as f64).collect();

        let isochrones = fehs
            .iter()
            .map(|&feh| {
                let blocks = ages
                    .iter()
                    .map(|&age| AgeBlock {
                        log10_age: age.log10(),
                        teff: teffs.clone(),
                        m_ks: teffs
                            .iter()
                            .map(|&t| Self::synthetic_law(t, feh, age))
                            .collect(),
                    })
                    .collect();
                Isochrone { feh, blocks }
            })
            .collect();
        Self { model, isochrones }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_synthetic_grid_matches_law_on_nodes() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        let mag = set.mag_at(4500.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(mag, IsochroneSet::synthetic_law(4500.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_interpolation_between_nodes() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        // Off-node in every axis; the law is mildly curved so allow a loose
        // tolerance for the piecewise-linear approximation.
        let mag = set.mag_at(4857.0, 0.13, 2.5).unwrap();
        let law = IsochroneSet::synthetic_law(4857.0, 0.13, 2.5);
        assert_relative_eq!(mag, law, epsilon = 0.05);
    }

    #[test]
    fn test_masked_outside_teff_coverage() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        assert!(set.mag_at(2500.0, 0.0, 1.0).is_none());
        assert!(set.mag_at(9000.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_feh_and_age_clamp_to_grid() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        let clamped = set.mag_at(5000.0, -3.0, 1.0).unwrap();
        let edge = set.mag_at(5000.0, -1.0, 1.0).unwrap();
        assert_relative_eq!(clamped, edge, epsilon = 1e-12);

        let young = set.mag_at(6000.0, 0.0, 0.1).unwrap();
        let first_age = set.mag_at(6000.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(young, first_age, epsilon = 1e-12);
    }

    #[test]
    fn test_mag_err_from_teff_matches_slope() {
        let set = IsochroneSet::synthetic(ModelGrid::Mist);
        // At 4200 K the synthetic law's slope is dominated by the linear
        // term: |dK/dT| ~ 2.2/1000 - 2*0.35*(t)/1000 with t = -0.8.
        let err = set.mag_err_from_teff(4200.0, 0.0, 1.0, 100.0).unwrap();
        let slope = (2.2 + 2.0 * 0.35 * 0.8) / 1000.0;
        assert_relative_eq!(err, slope * 100.0, epsilon = 1e-3);
    }

    #[test]
    fn test_load_from_csv_dir() {
        let dir = tempfile::tempdir().unwrap();
        let grid_dir = dir.path().join("mist");
        std::fs::create_dir(&grid_dir).unwrap();
        let mut file = std::fs::File::create(grid_dir.join("feh_p000.csv")).unwrap();
        writeln!(file, "feh,log10_age,teff,m_ks").unwrap();
        for teff in [4000.0f64, 4500.0, 5000.0, 5500.0] {
            writeln!(file, "0.0,0.0,{teff},{}", 10.0 - teff / 1000.0).unwrap();
        }
        drop(file);

        let set = IsochroneSet::load(dir.path(), ModelGrid::Mist).unwrap();
        assert_eq!(set.metallicities(), vec![0.0]);
        let mag = set.mag_at(4250.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(mag, 10.0 - 4.25, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_grid_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("dsep")).unwrap();
        let result = IsochroneSet::load(dir.path(), ModelGrid::Dsep);
        assert!(matches!(result, Err(IsochroneError::EmptyGrid(_))));
    }

    #[test]
    fn test_duplicate_teff_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let grid_dir = dir.path().join("mist");
        std::fs::create_dir(&grid_dir).unwrap();
        std::fs::write(
            grid_dir.join("bad.csv"),
            "feh,log10_age,teff,m_ks\n0.0,0.0,4000,6.0\n0.0,0.0,4000,6.1\n",
        )
        .unwrap();
        let result = IsochroneSet::load(dir.path(), ModelGrid::Mist);
        assert!(matches!(result, Err(IsochroneError::UnsortedGrid(_))));
    }
}
