//! Sample-selection figures: where the spectroscopic and rotation samples
//! sit in (Teff, M_Ks) coordinates

use plotters::prelude::*;

use rotmath::stats;

use crate::context::Context;
use crate::figures::{draw_legend, line, representative_error_bar, scatter, Chart2d};
use crate::samples::SampleStar;
use crate::style::{heat_color, log_norm, BLACK, BROWN, PINK, PURPLE, RED, SKY_BLUE};
use crate::Result;

/// Density of the rotation-period detections and the detection fraction in
/// selection coordinates.
pub fn mcquillan_selection(ctx: &Context) -> Result<()> {
    let mcq = ctx.mcquillan_sample()?;
    let nomcq = ctx.nondetection_sample()?;

    let teff_edges = stats::linspace_edges(4000.0, 7000.0, 60);
    let mk_edges = stats::linspace_edges(-3.0, 8.0, 110);

    let det = stats::histogram2d(
        &mcq.rows().iter().map(|s| s.teff).collect::<Vec<_>>(),
        &mcq.rows().iter().map(|s| s.m_k).collect::<Vec<_>>(),
        &teff_edges,
        &mk_edges,
    );
    let nondet = stats::histogram2d(
        &nomcq.rows().iter().map(|s| s.teff).collect::<Vec<_>>(),
        &nomcq.rows().iter().map(|s| s.m_k).collect::<Vec<_>>(),
        &teff_edges,
        &mk_edges,
    );
    let max_det = det.iter().copied().max().unwrap_or(1);

    let path = ctx.out().figure("mcq-selection")?;
    let root = SVGBackend::new(&path, (1600, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    let mut density_chart = ChartBuilder::on(&panels[0])
        .caption("Period detection density", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(7000.0..4000.0, 8.2..-3.0)?;
    density_chart
        .configure_mesh()
        .x_desc("Teff (K)")
        .y_desc("M_Ks (mag)")
        .draw()?;
    for i in 0..teff_edges.len() - 1 {
        for j in 0..mk_edges.len() - 1 {
            let count = det[[i, j]];
            if count == 0 {
                continue;
            }
            density_chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (teff_edges[i], mk_edges[j]),
                    (teff_edges[i + 1], mk_edges[j + 1]),
                ],
                heat_color(log_norm(count, max_det)).filled(),
            )))?;
        }
    }

    // Representative magnitude uncertainty among the cool dwarfs.
    let mut stacked: Vec<&SampleStar> = mcq.rows().iter().collect();
    stacked.extend(nomcq.rows().iter());
    let dwarf_errs: Vec<(f64, f64)> = stacked
        .iter()
        .filter(|s| s.teff < 5500.0 && s.m_k > 2.95)
        .map(|s| (s.m_k_err_up, s.m_k_err_down))
        .collect();
    if !dwarf_errs.is_empty() {
        let ups: Vec<f64> = dwarf_errs.iter().map(|&(u, _)| u).collect();
        let downs: Vec<f64> = dwarf_errs.iter().map(|&(_, d)| d).collect();
        representative_error_bar(
            &mut density_chart,
            6500.0,
            7.0,
            100.0,
            stats::median(&downs),
            stats::median(&ups),
            BLACK,
        )?;
    }

    let mut fraction_chart = ChartBuilder::on(&panels[1])
        .caption("Detection fraction", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(7000.0..4000.0, 8.2..-3.0)?;
    fraction_chart
        .configure_mesh()
        .x_desc("Teff (K)")
        .y_desc("M_Ks (mag)")
        .draw()?;
    for i in 0..teff_edges.len() - 1 {
        for j in 0..mk_edges.len() - 1 {
            let total = det[[i, j]] + nondet[[i, j]];
            if total == 0 {
                continue;
            }
            let fraction = det[[i, j]] as f64 / total as f64;
            fraction_chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (teff_edges[i], mk_edges[j]),
                    (teff_edges[i + 1], mk_edges[j + 1]),
                ],
                heat_color(fraction).filled(),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Targeting class of a spectroscopic row, from its program tag.
fn targeting_class(star: &SampleStar) -> Option<&'static str> {
    let program = star.program.as_deref()?;
    if program.contains("seismo") || program.contains("giant") {
        Some("Asteroseismic")
    } else if program.contains("dwarf") {
        Some("Dwarfs")
    } else if program.contains("eb") {
        Some("Eclipsing Binary")
    } else if program.contains("koi") || program.contains("host") || program.contains("monitor") {
        Some("KOI")
    } else {
        None
    }
}

/// APOGEE targeting classes on the HR diagram, plus the sample density with
/// 1 Gyr model isochrones.
pub fn apogee_selection(ctx: &Context) -> Result<()> {
    let apo = ctx.apogee_sample()?;
    let mist = ctx.mist()?;
    let rows = apo.rows();

    let path = ctx.out().figure("apogee-selection")?;
    let root = SVGBackend::new(&path, (1600, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    let mut class_chart = ChartBuilder::on(&panels[0])
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(7000.0..3500.0, 7.2..-8.0)?;
    class_chart
        .configure_mesh()
        .x_desc("Teff (K)")
        .y_desc("M_Ks (mag)")
        .draw()?;

    for (class, color) in [
        ("Asteroseismic", BLACK),
        ("Dwarfs", BROWN),
        ("Eclipsing Binary", SKY_BLUE),
        ("KOI", PURPLE),
    ] {
        let members: Vec<&SampleStar> = rows
            .iter()
            .filter(|s| targeting_class(s) == Some(class))
            .collect();
        log::info!("targeting class {class}: {} stars", members.len());
        let points: Vec<(f64, f64)> = members.iter().map(|s| (s.teff, s.m_k)).collect();
        scatter(&mut class_chart, points, color, 2, Some(class))?;
    }

    let dwarfs: Vec<&SampleStar> = rows
        .iter()
        .filter(|s| s.teff < 5500.0 && s.m_k > 2.95)
        .collect();
    if !dwarfs.is_empty() {
        let teff_errs: Vec<f64> = dwarfs.iter().map(|s| s.teff_err).collect();
        let ups: Vec<f64> = dwarfs.iter().map(|s| s.m_k_err_up).collect();
        let downs: Vec<f64> = dwarfs.iter().map(|s| s.m_k_err_down).collect();
        representative_error_bar(
            &mut class_chart,
            6500.0,
            6.0,
            stats::median(&teff_errs),
            stats::median(&downs),
            stats::median(&ups),
            BLACK,
        )?;
    }
    draw_legend(&mut class_chart, SeriesLabelPosition::UpperLeft)?;

    let mut density_chart = ChartBuilder::on(&panels[1])
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(7000.0..3500.0, 7.2..-8.0)?;
    density_chart
        .configure_mesh()
        .x_desc("Teff (K)")
        .y_desc("M_Ks (mag)")
        .draw()?;

    let teff_edges = stats::linspace_edges(3500.0, 7000.0, 35);
    let mk_edges = stats::linspace_edges(-8.0, 8.0, 160);
    let sample_teffs: Vec<f64> = rows.iter().map(|s| s.teff).collect();
    let sample_mks: Vec<f64> = rows.iter().map(|s| s.m_k).collect();
    let counts = stats::histogram2d(&sample_teffs, &sample_mks, &teff_edges, &mk_edges);
    let max_count = counts.iter().copied().max().unwrap_or(1);
    for i in 0..teff_edges.len() - 1 {
        for j in 0..mk_edges.len() - 1 {
            let count = counts[[i, j]];
            if count == 0 {
                continue;
            }
            density_chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (teff_edges[i], mk_edges[j]),
                    (teff_edges[i + 1], mk_edges[j + 1]),
                ],
                heat_color(log_norm(count, max_count)).filled(),
            )))?;
        }
    }

    draw_model_tracks(&mut density_chart, &mist)?;
    draw_legend(&mut density_chart, SeriesLabelPosition::UpperLeft)?;

    root.present()?;
    Ok(())
}

/// 1 Gyr isochrones at three metallicities.
fn draw_model_tracks(chart: &mut Chart2d, mist: &isochrones::IsochroneSet) -> Result<()> {
    let teffs: Vec<f64> = (0..100).map(|i| 3500.0 + 3500.0 * i as f64 / 99.0).collect();
    for (feh, color, label) in [
        (0.5, PINK, "[Fe/H] = 0.5"),
        (0.0, RED, "[Fe/H] = 0.0"),
        (-0.5, PURPLE, "[Fe/H] = -0.5"),
    ] {
        let track: Vec<(f64, f64)> = teffs
            .iter()
            .zip(mist.mag_fixed_age(&teffs, feh, 1.0))
            .filter_map(|(&t, mag)| mag.map(|m| (t, m)))
            .collect();
        line(chart, track, color, 2, Some(label))?;
    }
    Ok(())
}
