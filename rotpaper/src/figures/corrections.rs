//! Figures documenting the empirical main-sequence flattening

use plotters::prelude::*;

use isochrones::corrections::BinnedRidge;
use isochrones::REFERENCE_AGE_GYR;
use rotmath::stats;

use crate::context::Context;
use crate::figures::{draw_legend, error_bars, hist_bars, hline, line, scatter, vline};
use crate::samples::SampleStar;
use crate::style::{BLACK, BLUE, GRAY, ORANGE, RED};
use crate::Result;

/// Metallicity distribution of the cool dwarfs, and the model versus
/// empirical magnitude displacement over [Fe/H].
pub fn dwarf_metallicity(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let mist = ctx.mist()?;
    let corr = ctx.corrections()?;
    let dwarfs = apo.subsample(&["Dwarfs", "Statistics Teff"])?;
    let fehs: Vec<f64> = dwarfs.iter().filter_map(|s| s.feh).collect();

    let median = stats::percentile(&fehs, 50.0);
    let bottom = stats::percentile(&fehs, 50.0 - 33.5);
    let top = stats::percentile(&fehs, 50.0 + 33.5);
    log::info!("dwarf metallicity: median {median:.3}, 1-sigma [{bottom:.3}, {top:.3}]");

    let path = ctx.out().figure("dwarf-metallicity")?;
    let root = SVGBackend::new(&path, (1600, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    let edges = stats::linspace_edges(-1.25, 0.46, 50);
    let counts = stats::histogram(&fehs, &edges);
    let peak = *counts.iter().max().unwrap_or(&1) as f64;

    let mut hist_chart = ChartBuilder::on(&panels[0])
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-1.25..0.46, 0.0..peak * 1.15)?;
    hist_chart
        .configure_mesh()
        .x_desc("[Fe/H] (dex)")
        .y_desc("N")
        .draw()?;
    hist_bars(&mut hist_chart, &edges, &counts, BLUE)?;
    vline(&mut hist_chart, median, 0.0, peak * 1.15, BLACK, 3)?;
    vline(&mut hist_chart, bottom, 0.0, peak * 1.15, BLACK, 1)?;
    vline(&mut hist_chart, top, 0.0, peak * 1.15, BLACK, 1)?;

    let mut model_chart = ChartBuilder::on(&panels[1])
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-1.25..0.46, 0.9..-0.3)?;
    model_chart
        .configure_mesh()
        .x_desc("[Fe/H] (dex)")
        .y_desc("Vertical displacement (mag)")
        .draw()?;

    let metspace: Vec<f64> = (0..40).map(|i| -1.25 + 1.71 * i as f64 / 39.0).collect();
    let model_mags = mist.mag_over_feh(5000.0, &metspace, REFERENCE_AGE_GYR);
    let reference = mist.mag_at(5000.0, median, REFERENCE_AGE_GYR);
    if let Some(reference) = reference {
        let model_curve: Vec<(f64, f64)> = metspace
            .iter()
            .zip(&model_mags)
            .filter_map(|(&feh, mag)| mag.map(|m| (feh, m - reference)))
            .collect();
        line(&mut model_chart, model_curve, BLUE, 3, Some("Model Ks"))?;

        let empirical_ref = reference + corr.metallicity.eval(median);
        let empirical_curve: Vec<(f64, f64)> = metspace
            .iter()
            .zip(&model_mags)
            .filter_map(|(&feh, mag)| {
                mag.map(|m| (feh, m + corr.metallicity.eval(feh) - empirical_ref))
            })
            .collect();
        line(&mut model_chart, empirical_curve, ORANGE, 3, Some("Empirical Ks"))?;
    }

    vline(&mut model_chart, median, 0.9, -0.3, BLACK, 3)?;
    vline(&mut model_chart, bottom, 0.9, -0.3, BLACK, 1)?;
    vline(&mut model_chart, top, 0.9, -0.3, BLACK, 1)?;
    hline(&mut model_chart, -1.25, 0.46, 0.0, GRAY, 1)?;
    draw_legend(&mut model_chart, SeriesLabelPosition::MiddleLeft)?;

    root.present()?;
    Ok(())
}

/// K excess over [Fe/H]: binned ridge, quadratic fit, and residuals.
pub fn metallicity_correction(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let corr = ctx.corrections()?;
    let sample: Vec<SampleStar> = apo
        .subsample(&["Dwarfs", "MetCor Teff", "~Bad"])?;

    let points: Vec<(f64, f64)> = sample
        .iter()
        .filter_map(|s| s.feh.map(|feh| (feh, s.k_excess)))
        .collect();
    let residuals: Vec<(f64, f64)> = points
        .iter()
        .map(|&(feh, excess)| (feh, excess - corr.metallicity.eval(feh)))
        .collect();
    let fit_curve: Vec<(f64, f64)> = (0..100)
        .map(|i| {
            let feh = -1.0 + 1.5 * i as f64 / 99.0;
            (feh, corr.metallicity.eval(feh))
        })
        .collect();

    ridge_figure(
        ctx,
        "met-correction",
        "[Fe/H] (dex)",
        "K excess (mag)",
        (-0.85, 0.45),
        points,
        &corr.met_ridge,
        fit_curve,
        residuals,
    )
}

/// Metallicity-corrected excess over spectroscopic temperature: binned
/// ridge, linear fit, and residuals.
pub fn spec_temperature_correction(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let corr = ctx.corrections()?;
    let sample = apo.subsample(&["Dwarfs", "Statistics Teff", "~Bad"])?;

    let points: Vec<(f64, f64)> = sample
        .iter()
        .filter_map(|s| {
            s.feh
                .map(|feh| (s.teff, corr.partly_corrected(s.k_excess, feh)))
        })
        .collect();
    let residuals: Vec<(f64, f64)> = points
        .iter()
        .map(|&(teff, partly)| (teff, partly - corr.spec_teff.eval(teff)))
        .collect();
    let fit_curve: Vec<(f64, f64)> = (0..100)
        .map(|i| {
            let teff = 4000.0 + 1250.0 * i as f64 / 99.0;
            (teff, corr.spec_teff.eval(teff))
        })
        .collect();

    ridge_figure(
        ctx,
        "spec-teff-correction",
        "Teff (K)",
        "[Fe/H]-corrected K excess (mag)",
        (5250.0, 4000.0),
        points,
        &corr.spec_ridge,
        fit_curve,
        residuals,
    )
}

/// Solar-reference excess over photometric temperature: binned ridge,
/// linear fit, and residuals.
pub fn phot_temperature_correction(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let corr = ctx.corrections()?;
    let sample = apo.subsample(&["Dwarfs"])?;

    let points: Vec<(f64, f64)> = sample
        .iter()
        .filter_map(|s| {
            s.sdss_teff
                .filter(|&t| crate::samples::in_metcor_window(t))
                .map(|t| (t, s.solar_k_excess))
        })
        .collect();
    let residuals: Vec<(f64, f64)> = points
        .iter()
        .map(|&(teff, solar)| (teff, solar - corr.phot_teff.eval(teff)))
        .collect();
    let fit_curve: Vec<(f64, f64)> = (0..100)
        .map(|i| {
            let teff = 4000.0 + 1250.0 * i as f64 / 99.0;
            (teff, corr.phot_teff.eval(teff))
        })
        .collect();

    ridge_figure(
        ctx,
        "phot-teff-correction",
        "SDSS Teff (K)",
        "Solar-reference K excess (mag)",
        (5250.0, 4000.0),
        points,
        &corr.phot_ridge,
        fit_curve,
        residuals,
    )
}

/// Shared layout of the three correction figures: a scatter panel with the
/// binned ridge and fitted curve on top, residuals below.
#[allow(clippy::too_many_arguments)]
fn ridge_figure(
    ctx: &Context,
    name: &str,
    x_label: &str,
    y_label: &str,
    x_range: (f64, f64),
    points: Vec<(f64, f64)>,
    ridge: &BinnedRidge,
    fit_curve: Vec<(f64, f64)>,
    residuals: Vec<(f64, f64)>,
) -> Result<()> {
    let path = ctx.out().figure(name)?;
    let root = SVGBackend::new(&path, (900, 1100)).into_drawing_area();
    root.fill(&WHITE)?;
    // Scatter panel twice the height of the residual panel.
    let (top, bottom) = root.split_vertically(730);

    let mut main_chart = ChartBuilder::on(&top)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range.0..x_range.1, 0.3..-1.2)?;
    main_chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()?;

    scatter(&mut main_chart, points, BLACK, 2, Some("Original"))?;
    let ridge_points: Vec<(f64, f64)> = ridge
        .centers
        .iter()
        .zip(&ridge.ridge)
        .map(|(&x, &y)| (x, y))
        .collect();
    let bars: Vec<(f64, f64, f64, f64)> = ridge_points
        .iter()
        .zip(&ridge.scatter)
        .map(|(&(x, y), &mad)| (x, y, mad, mad))
        .collect();
    error_bars(&mut main_chart, &bars, RED, (x_range.1 - x_range.0).abs() * 0.01)?;
    scatter(&mut main_chart, ridge_points, RED, 4, Some("Binned"))?;
    line(&mut main_chart, fit_curve, RED, 2, Some("Fit"))?;
    hline(&mut main_chart, x_range.0, x_range.1, 0.0, GRAY, 1)?;
    draw_legend(&mut main_chart, SeriesLabelPosition::UpperLeft)?;

    let mut residual_chart = ChartBuilder::on(&bottom)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range.0..x_range.1, 0.6..-1.4)?;
    residual_chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Residual (mag)")
        .draw()?;
    scatter(&mut residual_chart, residuals, BLACK, 2, None)?;
    hline(&mut residual_chart, x_range.0, x_range.1, 0.0, GRAY, 1)?;

    root.present()?;
    Ok(())
}
