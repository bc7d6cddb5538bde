//! Figure functions and the CLI registry
//!
//! Every figure function takes the shared context and writes exactly one
//! file under the figures directory. The registry maps CLI tokens to
//! functions; `all` iterates it in dictionary order.

use std::collections::BTreeMap;

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::context::Context;
use crate::samples::SampleStar;
use crate::{Error, Result};

pub mod corrections;
pub mod distributions;
pub mod hr;
pub mod periods;
pub mod selection;

pub type FigureFn = fn(&Context) -> Result<()>;

/// All registered figure and table functions, keyed by CLI token.
pub fn registry() -> BTreeMap<&'static str, FigureFn> {
    let mut figs: BTreeMap<&'static str, FigureFn> = BTreeMap::new();
    figs.insert("age-isochrones", hr::age_isochrones);
    figs.insert("apogee-period-bins", periods::apogee_period_bins);
    figs.insert("apogee-selection", selection::apogee_selection);
    figs.insert("binary-fractions", periods::binary_fractions);
    figs.insert("collapsed-hist", distributions::collapsed_histogram);
    figs.insert("dwarf-metallicity", corrections::dwarf_metallicity);
    figs.insert("kexcess-hr", hr::k_excess_hr_diagram);
    figs.insert(
        "marginal-rotator-table",
        crate::tables::write_marginal_rotator_tables,
    );
    figs.insert("mcq-period-bins", periods::mcquillan_period_bins);
    figs.insert("mcq-selection", selection::mcquillan_selection);
    figs.insert("met-correction", corrections::metallicity_correction);
    figs.insert("met-scatter", distributions::metallicity_scatter);
    figs.insert("model-comparison", hr::model_comparison);
    figs.insert(
        "phot-teff-correction",
        corrections::phot_temperature_correction,
    );
    figs.insert(
        "rapid-rotator-table",
        crate::tables::write_rapid_rotator_tables,
    );
    figs.insert("significance", crate::significance::report_binary_significance);
    figs.insert(
        "spec-teff-correction",
        corrections::spec_temperature_correction,
    );
    figs.insert("transition-bins", periods::transition_bins);
    figs
}

/// Run one registered function by name.
pub fn run(name: &str, ctx: &Context) -> Result<()> {
    let figs = registry();
    let fig = figs
        .get(name)
        .ok_or_else(|| Error::UnknownFigure(name.to_string()))?;
    log::info!("generating {name}");
    fig(ctx)
}

/// Chart type every figure draws into.
pub(crate) type Chart2d<'a, 'b> =
    ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Project sample rows to (x, y) pairs.
pub(crate) fn xy<FX, FY>(rows: &[SampleStar], fx: FX, fy: FY) -> Vec<(f64, f64)>
where
    FX: Fn(&SampleStar) -> f64,
    FY: Fn(&SampleStar) -> f64,
{
    rows.iter().map(|s| (fx(s), fy(s))).collect()
}

/// Scatter points as filled circles, optionally with a legend entry.
pub(crate) fn scatter(
    chart: &mut Chart2d,
    points: Vec<(f64, f64)>,
    color: RGBColor,
    size: i32,
    label: Option<&str>,
) -> Result<()> {
    let series = chart.draw_series(
        points
            .into_iter()
            .map(move |p| Circle::new(p, size, color.filled())),
    )?;
    if let Some(text) = label {
        series
            .label(text)
            .legend(move |(x, y)| Circle::new((x, y), size, color.filled()));
    }
    Ok(())
}

/// Connected line, optionally with a legend entry.
pub(crate) fn line(
    chart: &mut Chart2d,
    points: Vec<(f64, f64)>,
    color: RGBColor,
    width: u32,
    label: Option<&str>,
) -> Result<()> {
    let style = color.stroke_width(width);
    let series = chart.draw_series(LineSeries::new(points, style))?;
    if let Some(text) = label {
        series
            .label(text)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(width)));
    }
    Ok(())
}

/// Horizontal guide line across `[x0, x1]`.
pub(crate) fn hline(chart: &mut Chart2d, x0: f64, x1: f64, y: f64, color: RGBColor, width: u32) -> Result<()> {
    line(chart, vec![(x0, y), (x1, y)], color, width, None)
}

/// Vertical guide line across `[y0, y1]`.
pub(crate) fn vline(chart: &mut Chart2d, x: f64, y0: f64, y1: f64, color: RGBColor, width: u32) -> Result<()> {
    line(chart, vec![(x, y0), (x, y1)], color, width, None)
}

/// Vertical error bars with caps, drawn as path segments.
pub(crate) fn error_bars(
    chart: &mut Chart2d,
    // (x, y, err_down, err_up)
    points: &[(f64, f64, f64, f64)],
    color: RGBColor,
    cap: f64,
) -> Result<()> {
    for &(x, y, down, up) in points {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, y - down), (x, y + up)],
            color.stroke_width(1),
        )))?;
        for end in [y - down, y + up] {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x - cap, end), (x + cap, end)],
                color.stroke_width(1),
            )))?;
        }
    }
    Ok(())
}

/// Post-step path through histogram values: each bin draws as a flat
/// segment from its left edge to its right edge.
pub(crate) fn step_path(edges: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    assert_eq!(edges.len(), values.len() + 1);
    let mut path = Vec::with_capacity(values.len() * 2);
    for (i, &v) in values.iter().enumerate() {
        path.push((edges[i], v));
        path.push((edges[i + 1], v));
    }
    path
}

/// Histogram bars as filled rectangles.
pub(crate) fn hist_bars(
    chart: &mut Chart2d,
    edges: &[f64],
    counts: &[u64],
    color: RGBColor,
) -> Result<()> {
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        chart.draw_series(std::iter::once(Rectangle::new(
            [(edges[i], 0.0), (edges[i + 1], count as f64)],
            color.mix(0.5).filled(),
        )))?;
    }
    Ok(())
}

/// Representative error-bar marker at a fixed position.
pub(crate) fn representative_error_bar(
    chart: &mut Chart2d,
    x: f64,
    y: f64,
    x_err: f64,
    y_err_down: f64,
    y_err_up: f64,
    color: RGBColor,
) -> Result<()> {
    error_bars(chart, &[(x, y, y_err_down, y_err_up)], color, x_err * 0.2)?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x - x_err, y), (x + x_err, y)],
        color.stroke_width(1),
    )))?;
    Ok(())
}

/// Standard legend styling shared by every figure.
pub(crate) fn draw_legend(chart: &mut Chart2d, position: SeriesLabelPosition) -> Result<()> {
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(position)
        .draw()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_sorted_and_complete() {
        let figs = registry();
        assert_eq!(figs.len(), 18);
        let names: Vec<&str> = figs.keys().copied().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted, "BTreeMap iteration must be dictionary order");
        assert!(figs.contains_key("kexcess-hr"));
        assert!(figs.contains_key("rapid-rotator-table"));
    }

    #[test]
    fn test_step_path_shape() {
        let path = step_path(&[0.0, 1.0, 2.0], &[3.0, 5.0]);
        assert_eq!(
            path,
            vec![(0.0, 3.0), (1.0, 3.0), (1.0, 5.0), (2.0, 5.0)]
        );
    }

    #[test]
    fn test_run_unknown_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = catalogs::CatalogStore::new(dir.path()).unwrap();
        let out = crate::output::OutputPaths::new(dir.path());
        let ctx = Context::with_synthetic_models(store, out);
        let result = run("no-such-figure", &ctx);
        assert!(matches!(result, Err(Error::UnknownFigure(_))));
    }
}
