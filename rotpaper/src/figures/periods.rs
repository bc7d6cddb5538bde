//! Rotation-period figures: excess distributions per period bin and the
//! binary fraction as a function of period

use plotters::prelude::*;

use catalogs::SampleSplitter;
use rotmath::stats;

use crate::context::Context;
use crate::figures::{draw_legend, error_bars, hline, line, scatter, step_path};
use crate::samples::{SampleStar, STATISTICS_TEFF};
use crate::significance::{CONSERVATIVE_LIMIT, INCLUSIVE_LIMIT};
use crate::style::{ALGAE, BLACK, GRAY, PINK, PURPLE, VIOLET};
use crate::Result;

/// Names for the regions of the standard period split, long-period first.
const PERIOD_REGIONS: [&str; 4] = ["P > 10 d", "7 d < P <= 10 d", "1.5 d < P <= 7 d", "P <= 1.5 d"];

/// Rotation-period bin edges, listed long-period first.
const PERIOD_EDGES: [f64; 3] = [10.0, 7.0, 1.5];

/// Region names for the 7--15 day transition split.
const TRANSITION_REGIONS: [&str; 6] = [
    "P > 15 d",
    "13 d < P <= 15 d",
    "11 d < P <= 13 d",
    "9 d < P <= 11 d",
    "7 d < P <= 9 d",
    "P <= 7 d",
];

/// Transition bin edges, long-period first.
const TRANSITION_EDGES: [f64; 5] = [15.0, 13.0, 11.0, 9.0, 7.0];

/// APOGEE dwarfs with rotation periods, split by period bin.
pub fn apogee_period_bins(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let cooldwarfs: Vec<SampleStar> = apo
        .subsample(&["Dwarfs", "Statistics Teff", "Mcq"])?;
    let ebs = eb_dwarfs(ctx)?;
    period_grid(
        ctx,
        "apogee-period-bins",
        cooldwarfs,
        ebs,
        &PERIOD_EDGES,
        &PERIOD_REGIONS,
        &PERIOD_REGIONS,
    )
}

/// The full McQuillan dwarf sample, split by period bin.
pub fn mcquillan_period_bins(ctx: &Context) -> Result<()> {
    let mcq = ctx.mcquillan_sample()?;
    let dwarfs = mcq.subsample(&["Dwarfs", "Statistics Teff"])?;
    let ebs = eb_dwarfs(ctx)?;
    period_grid(
        ctx,
        "mcq-period-bins",
        dwarfs,
        ebs,
        &PERIOD_EDGES,
        &PERIOD_REGIONS,
        &PERIOD_REGIONS,
    )
}

/// The 7--15 day synchronization transition region, in 2-day bins.
pub fn transition_bins(ctx: &Context) -> Result<()> {
    let mcq = ctx.mcquillan_sample()?;
    let dwarfs = mcq.subsample(&["Dwarfs", "Statistics Teff"])?;
    let ebs = eb_dwarfs(ctx)?;
    period_grid(
        ctx,
        "transition-bins",
        dwarfs,
        ebs,
        &TRANSITION_EDGES,
        &TRANSITION_REGIONS,
        &[
            "7 d < P <= 9 d",
            "9 d < P <= 11 d",
            "11 d < P <= 13 d",
            "13 d < P <= 15 d",
        ],
    )
}

fn eb_dwarfs(ctx: &Context) -> Result<Vec<SampleStar>> {
    let ebs = ctx.eb_sample()?;
    ebs.subsample(&["Dwarfs", "Statistics Teff"])
        .map_err(Into::into)
}

/// 2x2 grid of (Teff, corrected excess) panels, one per selected period
/// region.
///
/// Edges are listed long-period first and `region_names` covers every
/// resulting region; `panel_regions` picks the four that get panels.
#[allow(clippy::too_many_arguments)]
fn period_grid(
    ctx: &Context,
    name: &str,
    rotators: Vec<SampleStar>,
    ebs: Vec<SampleStar>,
    edges: &[f64],
    region_names: &[&str],
    panel_regions: &[&str; 4],
) -> Result<()> {
    let mut rot_split = SampleSplitter::new(rotators);
    rot_split.split_bins(|s| s.prot, edges, region_names);
    let mut eb_split = SampleSplitter::new(ebs);
    eb_split.split_bins(|s| s.eb_period, edges, region_names);

    let path = ctx.out().figure(name)?;
    let root = SVGBackend::new(&path, (1400, 1400)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 2));

    for (&region, panel) in panel_regions.iter().zip(panels.iter()) {
        let rot_rows = rot_split.subsample(&[region])?;
        let eb_rows = eb_split.subsample(&[region])?;
        log::info!(
            "{name}: {region}: {} rotators, {} EBs",
            rot_rows.len(),
            eb_rows.len()
        );

        let mut chart = ChartBuilder::on(panel)
            .caption(region, ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(5250.0..4000.0, 0.3..-1.25)?;
        chart
            .configure_mesh()
            .x_desc("Teff (K)")
            .y_desc("Corrected K excess (mag)")
            .draw()?;

        scatter(
            &mut chart,
            rot_rows
                .iter()
                .map(|s| (s.teff, s.corrected_k_excess))
                .collect(),
            BLACK,
            2,
            Some("Period in bin"),
        )?;
        scatter(
            &mut chart,
            eb_rows
                .iter()
                .map(|s| (s.teff, s.corrected_k_excess))
                .collect(),
            PINK,
            5,
            Some("EB"),
        )?;

        hline(
            &mut chart,
            STATISTICS_TEFF.0,
            STATISTICS_TEFF.1,
            CONSERVATIVE_LIMIT,
            VIOLET,
            3,
        )?;
        hline(
            &mut chart,
            STATISTICS_TEFF.0,
            STATISTICS_TEFF.1,
            INCLUSIVE_LIMIT,
            ALGAE,
            3,
        )?;
        hline(&mut chart, STATISTICS_TEFF.0, STATISTICS_TEFF.1, 0.0, BLACK, 1)?;
        draw_legend(&mut chart, SeriesLabelPosition::UpperRight)?;
    }

    root.present()?;
    Ok(())
}

/// Photometric binary fraction against rotation period, with the
/// Poisson-normalized binary and single period distributions.
pub fn binary_fractions(ctx: &Context) -> Result<()> {
    let mcq = ctx.mcquillan_sample()?;
    let nomcq = ctx.nondetection_sample()?;
    let ebs = ctx.eb_sample()?;
    let mcq_dwarfs = mcq.subsample(&["Dwarfs", "Statistics Teff"])?;
    let nomcq_dwarfs = nomcq.subsample(&["Dwarfs", "Statistics Teff"])?;
    let eb_dwarfs = ebs.subsample(&["Dwarfs", "Statistics Teff"])?;

    let edges = stats::linspace_edges(1.5, 21.5, 20);

    let path = ctx.out().figure("binary-fractions")?;
    let root = SVGBackend::new(&path, (1400, 1400)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 2));

    for (col, limit) in [(0usize, INCLUSIVE_LIMIT), (1usize, CONSERVATIVE_LIMIT)] {
        let counts = PeriodCounts::new(&mcq_dwarfs, &eb_dwarfs, &edges, limit);

        // Field binary fraction over everything, including the stars with
        // no period detection.
        let field_binaries = counts.total_binaries()
            + nomcq_dwarfs
                .iter()
                .filter(|s| s.corrected_k_excess < limit)
                .count() as u64;
        let field_total =
            (mcq_dwarfs.len() + eb_dwarfs.len() + nomcq_dwarfs.len()) as u64;
        let field_fraction = field_binaries as f64 / field_total.max(1) as f64;

        let mut fraction_chart = ChartBuilder::on(&panels[col])
            .caption(
                format!("Excess < {limit:g} mag"),
                ("sans-serif", 22),
            )
            .margin(12)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(1.5..21.5, 0.0..1.0)?;
        fraction_chart
            .configure_mesh()
            .x_desc("Rotation period (day)")
            .y_desc("Photometric binary fraction")
            .draw()?;

        let fractions: Vec<f64> = counts
            .binaries
            .iter()
            .zip(&counts.totals)
            .map(|(&b, &t)| if t > 0 { b as f64 / t as f64 } else { 0.0 })
            .collect();
        line(
            &mut fraction_chart,
            step_path(&edges, &fractions),
            BLACK,
            3,
            None,
        )?;

        let bars: Vec<(f64, f64, f64, f64)> = counts
            .binaries
            .iter()
            .zip(&counts.totals)
            .enumerate()
            .filter(|&(_, (_, &t))| t > 0)
            .map(|(i, (&b, &t))| {
                let center = (edges[i] + edges[i + 1]) / 2.0;
                let fraction = b as f64 / t as f64;
                let (lo, hi) = stats::wilson_interval(b, t, 1.0);
                (center, fraction, fraction - lo, hi - fraction)
            })
            .collect();
        error_bars(&mut fraction_chart, &bars, BLACK, 0.2)?;
        hline(&mut fraction_chart, 1.5, 21.5, field_fraction, GRAY, 2)?;

        // Normalized period distributions of binaries and singles.
        let sum_binaries = counts.total_binaries().max(1) as f64;
        let sum_singles = counts.total_singles().max(1) as f64;
        let norm_binaries: Vec<f64> = counts
            .binaries
            .iter()
            .map(|&b| b as f64 / sum_binaries)
            .collect();
        let norm_singles: Vec<f64> = counts
            .singles
            .iter()
            .map(|&s| s as f64 / sum_singles)
            .collect();
        let dist_peak = norm_binaries
            .iter()
            .chain(&norm_singles)
            .cloned()
            .fold(0.0f64, f64::max)
            .max(1e-3);

        let mut dist_chart = ChartBuilder::on(&panels[2 + col])
            .margin(12)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(1.5..21.5, 0.0..dist_peak * 1.4)?;
        dist_chart
            .configure_mesh()
            .x_desc("Rotation period (day)")
            .y_desc("Normalized period distribution")
            .draw()?;
        line(
            &mut dist_chart,
            step_path(&edges, &norm_binaries),
            ALGAE,
            3,
            Some("Photometric binaries"),
        )?;
        line(
            &mut dist_chart,
            step_path(&edges, &norm_singles),
            PURPLE,
            3,
            Some("Photometric singles"),
        )?;

        let half_width = (edges[1] - edges[0]) / 2.0;
        let binary_bars = poisson_bars(&counts.binaries, sum_binaries, &edges, -half_width / 5.0);
        let single_bars = poisson_bars(&counts.singles, sum_singles, &edges, half_width / 5.0);
        error_bars(&mut dist_chart, &binary_bars, ALGAE, 0.2)?;
        error_bars(&mut dist_chart, &single_bars, PURPLE, 0.2)?;
        draw_legend(&mut dist_chart, SeriesLabelPosition::UpperRight)?;

        log::info!(
            "binary fractions (limit {limit:g}): field fraction {field_fraction:.3} over {field_total} stars"
        );
    }

    root.present()?;
    Ok(())
}

/// Per-period-bin counts of binaries, singles, and totals, rotators and
/// eclipsing binaries combined.
struct PeriodCounts {
    binaries: Vec<u64>,
    singles: Vec<u64>,
    totals: Vec<u64>,
}

impl PeriodCounts {
    fn new(rotators: &[SampleStar], ebs: &[SampleStar], edges: &[f64], limit: f64) -> Self {
        let split =
            |rows: &[SampleStar], period: fn(&SampleStar) -> Option<f64>, binary: bool| -> Vec<f64> {
                rows.iter()
                    .filter(|s| (s.corrected_k_excess < limit) == binary)
                    .filter_map(period)
                    .collect()
            };
        let rot_binaries = split(rotators, |s| s.prot, true);
        let rot_singles = split(rotators, |s| s.prot, false);
        let eb_binaries = split(ebs, |s| s.eb_period, true);
        let eb_singles = split(ebs, |s| s.eb_period, false);

        let add = |a: Vec<u64>, b: Vec<u64>| -> Vec<u64> {
            a.into_iter().zip(b).map(|(x, y)| x + y).collect()
        };
        let binaries = add(
            stats::histogram(&rot_binaries, edges),
            stats::histogram(&eb_binaries, edges),
        );
        let singles = add(
            stats::histogram(&rot_singles, edges),
            stats::histogram(&eb_singles, edges),
        );
        let totals = add(binaries.clone(), singles.clone());
        Self {
            binaries,
            singles,
            totals,
        }
    }

    fn total_binaries(&self) -> u64 {
        self.binaries.iter().sum()
    }

    fn total_singles(&self) -> u64 {
        self.singles.iter().sum()
    }
}

/// Poisson 1-sigma error bars on a normalized histogram, offset slightly in
/// x so overlapping series stay readable.
fn poisson_bars(
    counts: &[u64],
    norm: f64,
    edges: &[f64],
    x_offset: f64,
) -> Vec<(f64, f64, f64, f64)> {
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > 0)
        .map(|(i, &c)| {
            let center = (edges[i] + edges[i + 1]) / 2.0 + x_offset;
            let value = c as f64 / norm;
            let upper = (stats::poisson_upper(c, 1.0) - c as f64) / norm;
            let lower = (c as f64 - stats::poisson_lower(c, 1.0)) / norm;
            (center, value, lower, upper)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star(prot: Option<f64>, eb_period: Option<f64>, corrected: f64) -> SampleStar {
        SampleStar {
            kepid: 1,
            designation: None,
            teff: 4800.0,
            teff_err: 90.0,
            sdss_teff: Some(4800.0),
            feh: None,
            vsini: None,
            dlsb: false,
            program: None,
            kmag: 11.0,
            m_k: 4.0,
            m_k_err_up: 0.02,
            m_k_err_down: 0.02,
            prot,
            eb_period,
            k_excess: corrected,
            solar_k_excess: corrected,
            k_excess_err_up: 0.03,
            k_excess_err_down: 0.03,
            corrected_k_excess: corrected,
        }
    }

    #[test]
    fn test_period_counts_partition() {
        let rotators = vec![
            star(Some(3.0), None, -0.5),
            star(Some(3.5), None, 0.0),
            star(Some(12.0), None, 0.1),
        ];
        let ebs = vec![star(None, Some(2.5), -0.6)];
        let edges = stats::linspace_edges(1.5, 21.5, 20);
        let counts = PeriodCounts::new(&rotators, &ebs, &edges, -0.3);

        assert_eq!(counts.total_binaries(), 2);
        assert_eq!(counts.total_singles(), 2);
        let total: u64 = counts.totals.iter().sum();
        assert_eq!(total, 4);
        // Binaries and singles partition every bin.
        for i in 0..counts.totals.len() {
            assert_eq!(counts.binaries[i] + counts.singles[i], counts.totals[i]);
        }
    }

    #[test]
    fn test_poisson_bars_skip_empty_bins() {
        let edges = stats::linspace_edges(0.0, 4.0, 4);
        let bars = poisson_bars(&[2, 0, 1, 0], 3.0, &edges, 0.0);
        assert_eq!(bars.len(), 2);
        assert!(bars[0].2 > 0.0 && bars[0].3 > 0.0);
    }
}
