//! End-to-end checks over a synthetic catalog set
//!
//! Builds a small Kepler-like catalog directory consistent with the
//! synthetic model grid, runs the registered figure and table functions
//! against it, and checks the output contracts: tables sorted by identifier
//! with the enumerated columns and no masked-value leakage, and exactly one
//! figure file per figure invocation.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use catalogs::CatalogStore;
use isochrones::{IsochroneSet, REFERENCE_FEH};
use rotpaper::figures;
use rotpaper::output::OutputPaths;
use rotpaper::Context;

struct SynthStar {
    kepid: u64,
    sdss_teff: f64,
    spec_teff: f64,
    feh: f64,
    m_k: f64,
    kmag: f64,
    binary: bool,
    prot: Option<f64>,
    eb_period: Option<f64>,
}

/// Synthetic population drawn against the synthetic model law: 20% of
/// stars are overluminous binaries, and binaries preferentially rotate
/// fast (the signal the analysis is after).
fn synthetic_population(n: usize, seed: u64) -> Vec<SynthStar> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let phot_noise = Normal::new(0.0, 0.02).unwrap();
    let mut stars = Vec::with_capacity(n);
    for i in 0..n {
        let kepid = 1_000_000 + i as u64;
        let sdss_teff = rng.gen_range(4050.0..5600.0);
        let spec_teff = sdss_teff + rng.gen_range(-40.0..40.0);
        let feh: f64 = (REFERENCE_FEH + 0.2 * rng.sample::<f64, _>(rand_distr::StandardNormal))
            .clamp(-0.9, 0.45);
        let binary = rng.gen_bool(0.2);
        let offset = if binary { -0.75 } else { 0.0 };
        let m_k = IsochroneSet::synthetic_law(sdss_teff, feh, 1.0)
            + phot_noise.sample(&mut rng)
            + offset;

        // Periods: binaries pile up at short, tidally-synchronized periods.
        let prot = if rng.gen_bool(0.5) {
            Some(if binary {
                rng.gen_range(1.6..8.0)
            } else {
                rng.gen_range(5.0..25.0)
            })
        } else {
            None
        };
        let eb_period = if binary && rng.gen_bool(0.1) {
            Some(rng.gen_range(1.1..12.0))
        } else {
            None
        };

        stars.push(SynthStar {
            kepid,
            sdss_teff,
            spec_teff,
            feh,
            m_k,
            kmag: m_k + 7.5,
            binary,
            prot,
            eb_period,
        });
    }
    stars
}

fn write_catalogs(dir: &Path, stars: &[SynthStar]) {
    let mut kic = String::from("kepid,sdss_teff,kmag,m_k,m_k_err_up,m_k_err_down\n");
    for s in stars {
        writeln!(
            kic,
            "{},{:.1},{:.3},{:.3},0.021,0.019",
            s.kepid, s.sdss_teff, s.kmag, s.m_k
        )
        .unwrap();
    }
    fs::write(dir.join("kic_stars.csv"), kic).unwrap();

    // The first chunk of the population has APOGEE spectroscopy.
    let mut apogee = String::from(
        "kepid,apogee_id,teff,teff_err,logg,fe_h,vsini,dlsb,program,kmag,m_k,m_k_err_up,m_k_err_down,parallax\n",
    );
    for s in stars.iter().take(stars.len() / 3) {
        writeln!(
            apogee,
            "{},2M{:08},{:.1},90.0,4.6,{:.3},,0,cool_dwarf,{:.3},{:.3},0.021,0.019,4.1",
            s.kepid, s.kepid, s.spec_teff, s.feh, s.kmag, s.m_k
        )
        .unwrap();
    }
    fs::write(dir.join("apogee_allstar.csv"), apogee).unwrap();

    let mut mcq = String::from("kepid,prot,prot_err,rper\n");
    let mut nomcq = String::from("kepid\n");
    for s in stars {
        match s.prot {
            Some(p) => writeln!(mcq, "{},{:.3},0.05,2500.0", s.kepid, p).unwrap(),
            None => writeln!(nomcq, "{}", s.kepid).unwrap(),
        }
    }
    fs::write(dir.join("mcquillan.csv"), mcq).unwrap();
    fs::write(dir.join("mcquillan_nondetections.csv"), nomcq).unwrap();

    let mut ebs = String::from("kepid,period,morphology\n");
    for s in stars {
        if let Some(p) = s.eb_period {
            writeln!(ebs, "{},{:.3},0.12", s.kepid, p).unwrap();
        }
    }
    fs::write(dir.join("villanova_ebs.csv"), ebs).unwrap();
}

fn build_context(root: &Path) -> Context {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    let stars = synthetic_population(900, 20180830);
    assert!(stars.iter().any(|s| s.binary && s.prot.is_some()));
    write_catalogs(&data_dir, &stars);

    let store = CatalogStore::new(&data_dir).unwrap();
    let out = OutputPaths::new(root.join("paper"));
    Context::with_synthetic_models(store, out)
}

#[test]
fn test_rotator_tables_contract() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = build_context(dir.path());

    figures::run("rapid-rotator-table", &ctx).unwrap();

    let tex = fs::read_to_string(dir.path().join("paper/tables/table1.tex")).unwrap();
    assert!(tex.starts_with("\\begin{deluxetable}{llcccccc}"));
    assert!(tex.contains("\\startdata"));
    assert!(tex.contains("\\tablecomments"));

    let txt = fs::read_to_string(dir.path().join("paper/tables/table1.txt")).unwrap();
    let lines: Vec<&str> = txt.lines().collect();
    let comment_count = lines.iter().take_while(|l| l.starts_with('#')).count();
    assert_eq!(comment_count, 8, "one comment per column");

    let header = lines[comment_count];
    let header_cells: Vec<&str> = header
        .trim_matches('|')
        .split('|')
        .map(str::trim)
        .collect();
    assert_eq!(
        header_cells,
        vec!["KIC", "APOGEE_ID", "Teff", "K", "MK", "DELTA_K", "Prot", "[Fe/H]"]
    );

    // Data rows: sorted ascending by KIC, full column count, no NaN cells.
    let data_rows = &lines[comment_count + 1..];
    assert!(data_rows.len() > 5, "expected a populated rapid-rotator table");
    let mut last_kic = 0u64;
    for row in data_rows {
        assert!(!row.contains("NaN"), "masked value leaked: {row}");
        let cells: Vec<&str> = row.trim_matches('|').split('|').map(str::trim).collect();
        assert_eq!(cells.len(), 8, "wrong column count: {row}");
        let kic: u64 = cells[0].parse().unwrap();
        assert!(kic > last_kic, "rows not sorted by identifier");
        last_kic = kic;
        // Periods land inside the selection window (cells carry two
        // decimals, so allow for the rounding).
        let prot: f64 = cells[6].parse().unwrap();
        assert!(prot > 1.49 && prot < 7.01, "period outside window: {prot}");
    }
}

#[test]
fn test_marginal_table_window() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = build_context(dir.path());

    figures::run("marginal-rotator-table", &ctx).unwrap();
    let txt = fs::read_to_string(dir.path().join("paper/tables/table2.txt")).unwrap();
    for row in txt.lines().filter(|l| !l.starts_with('#')).skip(1) {
        let cells: Vec<&str> = row.trim_matches('|').split('|').map(str::trim).collect();
        let prot: f64 = cells[6].parse().unwrap();
        assert!(prot > 6.99 && prot < 11.01);
    }
}

#[test]
fn test_every_registered_figure_writes_its_output() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = build_context(dir.path());

    for (name, fig) in figures::registry() {
        fig(&ctx).unwrap_or_else(|e| panic!("figure {name} failed: {e}"));
    }

    let fig_dir = dir.path().join("paper/fig");
    for name in [
        "kexcess-hr",
        "age-isochrones",
        "apogee-selection",
        "mcq-selection",
        "dwarf-metallicity",
        "met-correction",
        "spec-teff-correction",
        "phot-teff-correction",
        "met-scatter",
        "model-comparison",
        "collapsed-hist",
        "apogee-period-bins",
        "mcq-period-bins",
        "transition-bins",
        "binary-fractions",
    ] {
        let path = fig_dir.join(format!("{name}.svg"));
        let contents = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("missing figure {name}: {e}"));
        assert!(contents.contains("<svg"), "not an SVG: {name}");
        assert!(contents.len() > 500, "suspiciously empty figure: {name}");
    }

    for table in ["table1.tex", "table1.txt", "table2.tex", "table2.txt"] {
        assert!(dir.path().join("paper/tables").join(table).exists());
    }
}

#[test]
fn test_rerunning_overwrites_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = build_context(dir.path());

    figures::run("kexcess-hr", &ctx).unwrap();
    let path = dir.path().join("paper/fig/kexcess-hr.svg");
    let first = fs::metadata(&path).unwrap().len();

    figures::run("kexcess-hr", &ctx).unwrap();
    let second = fs::metadata(&path).unwrap().len();
    assert_eq!(first, second, "regeneration must be idempotent");
}

#[test]
fn test_significance_report_runs() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = build_context(dir.path());
    figures::run("significance", &ctx).unwrap();
}
