//! Distributions of the corrected K excess

use plotters::prelude::*;

use isochrones::{REFERENCE_AGE_GYR, REFERENCE_FEH};
use rotmath::fitting::{binary_single_bounds, fit_double_gaussian, DoubleGaussian};
use rotmath::stats;

use crate::context::Context;
use crate::figures::{draw_legend, hist_bars, line, vline, Chart2d};
use crate::significance::{CONSERVATIVE_LIMIT, INCLUSIVE_LIMIT};
use crate::style::{ALGAE, BLUE, RED, VIOLET};
use crate::Result;

/// Scatter in the excess induced by the metallicity distribution alone,
/// before and after the empirical flattening.
pub fn metallicity_scatter(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let mist = ctx.mist()?;
    let corr = ctx.corrections()?;
    let dwarfs = apo.subsample(&["Dwarfs", "Statistics Teff"])?;

    let Some(reference) = mist.mag_at(5000.0, REFERENCE_FEH, REFERENCE_AGE_GYR) else {
        return Ok(());
    };

    // Hold temperature fixed: the excess spread left over is purely the
    // metallicity distribution mapped through the model.
    let raw: Vec<f64> = dwarfs
        .iter()
        .filter_map(|s| s.feh)
        .filter_map(|feh| {
            mist.mag_at(5000.0, feh, REFERENCE_AGE_GYR)
                .map(|m| m - reference)
        })
        .collect();
    let flattened: Vec<f64> = dwarfs
        .iter()
        .filter_map(|s| s.feh)
        .filter_map(|feh| {
            mist.mag_at(5000.0, feh, REFERENCE_AGE_GYR).map(|m| {
                m + corr.metallicity.eval(feh) - (reference + corr.metallicity.eval(REFERENCE_FEH))
            })
        })
        .collect();

    log::info!(
        "metallicity-induced scatter: {:.3} mag raw, {:.3} mag corrected",
        stats::std_dev(&raw),
        stats::std_dev(&flattened)
    );

    let edges = stats::linspace_edges(-0.5, 0.5, 60);
    let raw_counts = stats::histogram(&raw, &edges);
    let flat_counts = stats::histogram(&flattened, &edges);
    let peak = raw_counts
        .iter()
        .chain(&flat_counts)
        .copied()
        .max()
        .unwrap_or(1) as f64;

    let path = ctx.out().figure("met-scatter")?;
    let root = SVGBackend::new(&path, (1600, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    for (panel, counts, label) in [
        (&panels[0], &raw_counts, "K excess (mag)"),
        (&panels[1], &flat_counts, "Corrected K excess (mag)"),
    ] {
        let mut chart = ChartBuilder::on(panel)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..0.5, 0.0..peak * 1.15)?;
        chart.configure_mesh().x_desc(label).y_desc("N").draw()?;
        hist_bars(&mut chart, &edges, counts, BLUE)?;
    }

    root.present()?;
    Ok(())
}

/// Corrected-excess histograms with double-Gaussian decompositions and the
/// photometric-binary thresholds.
pub fn collapsed_histogram(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let corr = ctx.corrections()?;
    let cooldwarfs = apo.subsample(&["Dwarfs", "Statistics Teff"])?;

    let met_corrected: Vec<f64> = cooldwarfs.iter().map(|s| s.corrected_k_excess).collect();
    let solar_corrected: Vec<f64> = cooldwarfs
        .iter()
        .map(|s| corr.corrected_phot(s.solar_k_excess, s.sdss_teff.unwrap_or(s.teff)))
        .collect();

    let edges = stats::linspace_edges(-1.6, 1.1, 60);
    let centers: Vec<f64> = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    let met_counts = stats::histogram(&met_corrected, &edges);
    let solar_counts = stats::histogram(&solar_corrected, &edges);
    let peak = met_counts
        .iter()
        .chain(&solar_counts)
        .copied()
        .max()
        .unwrap_or(1) as f64;

    let met_fit = fit_excess_histogram(&centers, &met_counts, "[Fe/H]-corrected");
    let solar_fit = fit_excess_histogram(&centers, &solar_counts, "solar-reference");

    let path = ctx.out().figure("collapsed-hist")?;
    let root = SVGBackend::new(&path, (1600, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    let mut met_chart = panel_chart(&panels[0], "[Fe/H]-corrected", peak)?;
    hist_bars(&mut met_chart, &edges, &met_counts, BLUE)?;
    draw_fits(&mut met_chart, &met_fit, &solar_fit, peak, true)?;
    draw_legend(&mut met_chart, SeriesLabelPosition::UpperLeft)?;

    let mut solar_chart = panel_chart(&panels[1], "Reference [Fe/H]", peak)?;
    hist_bars(&mut solar_chart, &edges, &solar_counts, RED)?;
    draw_fits(&mut solar_chart, &met_fit, &solar_fit, peak, false)?;

    root.present()?;
    Ok(())
}

fn panel_chart<'a, 'b>(
    panel: &'a DrawingArea<SVGBackend<'b>, plotters::coord::Shift>,
    title: &str,
    peak: f64,
) -> Result<Chart2d<'a, 'b>> {
    let mut chart = ChartBuilder::on(panel)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-1.6..1.1, 0.0..peak * 1.2)?;
    chart
        .configure_mesh()
        .x_desc("Corrected K excess (mag)")
        .y_desc("N")
        .draw()?;
    Ok(chart)
}

fn fit_excess_histogram(centers: &[f64], counts: &[u64], label: &str) -> Option<DoubleGaussian> {
    let ys: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let peak = ys.iter().cloned().fold(0.0, f64::max);
    let initial = DoubleGaussian {
        amp1: peak,
        mean1: 0.0,
        sigma1: 0.1,
        amp2: peak / 5.0,
        mean2: -0.75,
        sigma2: 0.1,
    };
    match fit_double_gaussian(centers, &ys, initial, &binary_single_bounds()) {
        Ok(fit) => {
            if fit.converged {
                log::info!(
                    "{label} single-star width: {:.3} mag (binary peak at {:.2} mag)",
                    fit.model.sigma1,
                    fit.model.mean2
                );
            } else {
                log::warn!(
                    "{label} double-Gaussian fit did not converge after {} iterations \
                     (residual norm {:.1})",
                    fit.iterations,
                    fit.residual_norm
                );
            }
            Some(fit.model)
        }
        Err(err) => {
            log::warn!("{label} double-Gaussian fit failed: {err}");
            None
        }
    }
}

fn draw_fits(
    chart: &mut Chart2d,
    met_fit: &Option<DoubleGaussian>,
    solar_fit: &Option<DoubleGaussian>,
    peak: f64,
    with_labels: bool,
) -> Result<()> {
    let grid: Vec<f64> = (0..200).map(|i| -1.6 + 2.7 * i as f64 / 199.0).collect();
    for (fit, color, label) in [
        (met_fit, BLUE, "[Fe/H] corrected"),
        (solar_fit, RED, "Reference [Fe/H]"),
    ] {
        if let Some(model) = fit {
            let curve: Vec<(f64, f64)> = grid.iter().map(|&x| (x, model.eval(x))).collect();
            line(chart, curve, color, 3, with_labels.then_some(label))?;
        }
    }
    vline(chart, CONSERVATIVE_LIMIT, 0.0, peak * 1.2, VIOLET, 3)?;
    vline(chart, INCLUSIVE_LIMIT, 0.0, peak * 1.2, ALGAE, 3)?;
    Ok(())
}
