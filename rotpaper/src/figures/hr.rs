//! HR-diagram figures in K-excess coordinates

use plotters::prelude::*;

use isochrones::excess;
use rotmath::stats;
use rotmath::CubicSpline;

use crate::context::Context;
use crate::figures::{
    draw_legend, error_bars, hline, line, representative_error_bar, scatter, vline, xy,
};
use crate::samples::{SampleStar, DWARF_EXCESS_FLOOR};
use crate::style::{BLACK, BLUE, BROWN, GRAY, PURPLE, RED, VIOLET};
use crate::Result;

/// Full sample in (Teff, K excess) coordinates with the dwarf/giant
/// boundary.
pub fn k_excess_hr_diagram(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let dwarfs = apo.subsample(&["Dwarfs"])?;
    let evolved = apo.subsample(&["~Dwarfs"])?;

    let path = ctx.out().figure("kexcess-hr")?;
    let root = SVGBackend::new(&path, (900, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(6600.0..3500.0, 2.0..-4.0)?;
    chart
        .configure_mesh()
        .x_desc("Teff (K)")
        .y_desc("M_Ks - M_Ks(model; 1 Gyr) (mag)")
        .draw()?;

    scatter(
        &mut chart,
        xy(&dwarfs, |s| s.teff, |s| s.k_excess),
        VIOLET,
        2,
        Some("MS + Binaries"),
    )?;
    scatter(
        &mut chart,
        xy(&evolved, |s| s.teff, |s| s.k_excess),
        BLACK,
        2,
        Some("Evolved"),
    )?;

    hline(&mut chart, 6600.0, 3500.0, 0.0, BLACK, 1)?;
    hline(&mut chart, 6600.0, 3500.0, DWARF_EXCESS_FLOOR, GRAY, 1)?;

    if !dwarfs.is_empty() {
        let err_up: Vec<f64> = dwarfs.iter().map(|s| s.k_excess_err_up).collect();
        let err_down: Vec<f64> = dwarfs.iter().map(|s| s.k_excess_err_down).collect();
        let teff_err: Vec<f64> = dwarfs.iter().map(|s| s.teff_err).collect();
        representative_error_bar(
            &mut chart,
            3700.0,
            1.4,
            stats::median(&teff_err),
            stats::median(&err_down),
            stats::median(&err_up),
            VIOLET,
        )?;
    }

    draw_legend(&mut chart, SeriesLabelPosition::UpperLeft)?;
    root.present()?;
    Ok(())
}

/// Binned 25th-percentile ridge of the dwarf excesses against the expected
/// displacement from main-sequence aging.
pub fn age_isochrones(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let mist = ctx.mist()?;
    let dwarfs = apo.subsample(&["Dwarfs"])?;

    let path = ctx.out().figure("age-isochrones")?;
    let root = SVGBackend::new(&path, (900, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(6500.0..3500.0, 0.5..-1.3)?;
    chart
        .configure_mesh()
        .x_desc("Teff (K)")
        .y_desc("M_Ks - M_Ks(model; 1 Gyr) (mag)")
        .draw()?;

    scatter(
        &mut chart,
        xy(&dwarfs, |s| s.teff, |s| s.k_excess),
        GRAY,
        2,
        Some("Dwarfs"),
    )?;

    // Ridge of the single-star sequence in fixed-width temperature bins.
    let ridge = excess_ridge(&dwarfs, 4000.0, 6000.0, 15);
    let bar_points: Vec<(f64, f64, f64, f64)> = ridge
        .iter()
        .map(|&(teff, pct, mad)| (teff, pct, mad, mad))
        .collect();
    error_bars(&mut chart, &bar_points, BROWN, 25.0)?;
    scatter(
        &mut chart,
        ridge.iter().map(|&(x, y, _)| (x, y)).collect(),
        BROWN,
        4,
        Some("25th percentile"),
    )?;
    if ridge.len() >= 3 {
        let spline = CubicSpline::new(
            ridge.iter().map(|&(x, _, _)| x).collect(),
            ridge.iter().map(|&(_, y, _)| y).collect(),
        )?;
        line(&mut chart, spline.sample(150), BROWN, 2, None)?;
    }

    // Expected displacement of a 9 Gyr population relative to 1 Gyr.
    let teffs: Vec<f64> = (0..200).map(|i| 3500.0 + 3000.0 * i as f64 / 199.0).collect();
    let displacement: Vec<(f64, f64)> = teffs
        .iter()
        .filter_map(|&t| excess::age_displacement(&mist, t, 0.0, 9.0, 1.0).map(|d| (t, d)))
        .collect();
    line(&mut chart, displacement, PURPLE, 2, Some("9 Gyr"))?;

    hline(&mut chart, 6500.0, 3500.0, 0.0, BLACK, 1)?;
    hline(&mut chart, 6500.0, 3500.0, -0.75, GRAY, 1)?;
    vline(&mut chart, 5250.0, 0.5, -1.3, GRAY, 1)?;

    if !dwarfs.is_empty() {
        let err_up: Vec<f64> = dwarfs.iter().map(|s| s.k_excess_err_up).collect();
        let err_down: Vec<f64> = dwarfs.iter().map(|s| s.k_excess_err_down).collect();
        let teff_err: Vec<f64> = dwarfs.iter().map(|s| s.teff_err).collect();
        representative_error_bar(
            &mut chart,
            3700.0,
            0.3,
            stats::median(&teff_err),
            stats::median(&err_down),
            stats::median(&err_up),
            BLACK,
        )?;
    }

    draw_legend(&mut chart, SeriesLabelPosition::LowerLeft)?;
    root.present()?;
    Ok(())
}

/// Predicted Ks difference between the two model families over the sample
/// temperature range, at three ages.
pub fn model_comparison(ctx: &Context) -> Result<()> {
    let mist = ctx.mist()?;
    let dsep = ctx.dsep()?;

    let path = ctx.out().figure("model-comparison")?;
    let root = SVGBackend::new(&path, (900, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(6500.0..3500.0, 0.4..-0.4)?;
    chart
        .configure_mesh()
        .x_desc("Teff (K)")
        .y_desc("MIST Ks - DSEP Ks (mag)")
        .draw()?;

    let teffs: Vec<f64> = (0..200).map(|i| 3500.0 + 3000.0 * i as f64 / 199.0).collect();
    for (age, color, label) in [
        (1.0, BLACK, "1 Gyr"),
        (5.5, BLUE, "5.5 Gyr"),
        (10.0, RED, "10 Gyr"),
    ] {
        let mist_mags = mist.mag_fixed_age(&teffs, 0.0, age);
        let dsep_mags = dsep.mag_fixed_age(&teffs, 0.0, age);
        let difference: Vec<(f64, f64)> = teffs
            .iter()
            .zip(mist_mags.iter().zip(&dsep_mags))
            .filter_map(|(&t, (m, d))| match (m, d) {
                (Some(m), Some(d)) => Some((t, m - d)),
                _ => None,
            })
            .collect();
        line(&mut chart, difference, color, 2, Some(label))?;
    }

    hline(&mut chart, 6500.0, 3500.0, 0.0, GRAY, 1)?;
    draw_legend(&mut chart, SeriesLabelPosition::UpperRight)?;
    root.present()?;
    Ok(())
}

/// 25th-percentile ridge of the K excess in fixed-width temperature bins.
///
/// Returns (mean Teff, ridge, MAD of the single-star half about the ridge)
/// per populated bin, ordered by temperature.
fn excess_ridge(rows: &[SampleStar], lo: f64, hi: f64, bins: usize) -> Vec<(f64, f64, f64)> {
    let edges = stats::linspace_edges(lo, hi, bins);
    let mut out = Vec::with_capacity(bins);
    for window in edges.windows(2) {
        let bin: Vec<&SampleStar> = rows
            .iter()
            .filter(|s| s.teff >= window[0] && s.teff < window[1])
            .collect();
        if bin.len() < 5 {
            continue;
        }
        let teffs: Vec<f64> = bin.iter().map(|s| s.teff).collect();
        let excesses: Vec<f64> = bin.iter().map(|s| s.k_excess).collect();
        let pct = stats::percentile(&excesses, 75.0);
        let median = stats::median(&excesses);
        let singles: Vec<f64> = excesses.iter().copied().filter(|&e| e > median).collect();
        let mad = stats::mad_about(&singles, pct);
        out.push((stats::mean(&teffs), pct, mad));
    }
    out
}
