//! Machine-readable and LaTeX table output
//!
//! Each table operation emits two files: an AASTeX deluxetable holding the
//! first few rows for the typeset paper, and a fixed-width ASCII table with
//! the full row set and a comment block describing every column. Masked
//! values render as empty cells in both formats.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::context::Context;
use crate::output::write_text;
use crate::samples::SampleStar;
use crate::Result;

/// Rows shown in the abridged LaTeX version of each table.
const LATEX_ROWS: usize = 5;

/// One output column: display names, unit, and pre-formatted cells.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub latex_name: String,
    pub ascii_name: String,
    pub unit: Option<String>,
    pub values: Vec<String>,
}

impl TableColumn {
    pub fn new(latex_name: &str, ascii_name: &str, unit: Option<&str>, values: Vec<String>) -> Self {
        Self {
            latex_name: latex_name.to_string(),
            ascii_name: ascii_name.to_string(),
            unit: unit.map(str::to_string),
            values,
        }
    }
}

/// A full paper table with its LaTeX and ASCII metadata.
#[derive(Debug, Clone)]
pub struct PaperTable {
    pub columns: Vec<TableColumn>,
    /// LaTeX column alignment, e.g. `llcccccc`
    pub col_align: String,
    /// Caption including the `\label{}`
    pub caption: String,
    /// Contents of `\tablecomments{}`
    pub tablefoot: String,
    /// Leading `#` comment lines of the ASCII version
    pub comments: Vec<String>,
}

impl PaperTable {
    fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// Render the abridged AASTeX deluxetable.
    pub fn aastex(&self, max_rows: usize) -> Result<String> {
        let mut out = String::new();
        let n_rows = self.n_rows().min(max_rows);

        writeln!(out, "\\begin{{deluxetable}}{{{}}}", self.col_align)?;
        writeln!(out, "\\tablecaption{{{}}}", self.caption)?;

        let heads: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("\\colhead{{{}}}", c.latex_name))
            .collect();
        let units: Vec<String> = self
            .columns
            .iter()
            .map(|c| match &c.unit {
                Some(unit) => format!("\\colhead{{({unit})}}"),
                None => "\\colhead{}".to_string(),
            })
            .collect();
        writeln!(
            out,
            "\\tablehead{{{} \\\\\n{}}}",
            heads.join(" & "),
            units.join(" & ")
        )?;

        writeln!(out, "\\startdata")?;
        for row in 0..n_rows {
            let cells: Vec<&str> = self
                .columns
                .iter()
                .map(|c| c.values[row].as_str())
                .collect();
            let terminator = if row + 1 < n_rows { " \\\\" } else { "" };
            writeln!(out, "{}{}", cells.join(" & "), terminator)?;
        }
        writeln!(out, "\\enddata")?;
        writeln!(out, "\\tablecomments{{{}}}", self.tablefoot)?;
        writeln!(out, "\\end{{deluxetable}}")?;
        Ok(out)
    }

    /// Render the full fixed-width ASCII table.
    pub fn fixed_width(&self) -> Result<String> {
        let mut out = String::new();
        for comment in &self.comments {
            writeln!(out, "# {comment}")?;
        }

        let widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| {
                c.values
                    .iter()
                    .map(String::len)
                    .chain(std::iter::once(c.ascii_name.len()))
                    .max()
                    .unwrap_or(1)
            })
            .collect();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{:<w$}", c.ascii_name))
            .collect();
        writeln!(out, "| {} |", header.join(" | "))?;

        for row in 0..self.n_rows() {
            let cells: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(c, &w)| format!("{:<w$}", c.values[row]))
                .collect();
            writeln!(out, "| {} |", cells.join(" | "))?;
        }
        Ok(out)
    }
}

/// Format an optional value with fixed precision; masked renders empty.
pub fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => String::new(),
    }
}

/// Shortest-form float formatting, for whole-number temperatures.
pub fn fmt_g(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Write the abridged rapid-rotator table (1.5--7 day periods).
pub fn write_rapid_rotator_tables(ctx: &Context) -> Result<()> {
    rotator_tables(
        ctx,
        1.5,
        7.0,
        true,
        "table1",
        r"\Kepler{} Rapid Rotators\label{tab:rapidrot}",
        r"All objects in the rotation catalog with periods between 1.5--7 days and 4000 K < $\Teff{}$ < 5250 K. For objects with APOGEE observations, their APOGEE ID and \feh{} are given. This table is published in its entirety in the machine-readable format. A portion is shown here for guidance regarding its form and content.",
    )
}

/// Write the marginal-rotator follow-up table (7--11 day periods).
pub fn write_marginal_rotator_tables(ctx: &Context) -> Result<()> {
    rotator_tables(
        ctx,
        7.0,
        11.0,
        false,
        "table2",
        r"\Kepler{} Synchronization Follow-up Targets\label{tab:marginalrot}",
        r"All objects in the rotation catalog with periods between 7--11 days and 4000 K < $\Teff{}$ < 5250 K. For objects with APOGEE observations, their APOGEE ID and \feh{} are given. This table is published in its entirety in the machine-readable format. A portion is shown here for guidance regarding its form and content.",
    )
}

fn rotator_tables(
    ctx: &Context,
    min_period: f64,
    max_period: f64,
    upper_inclusive: bool,
    stem: &str,
    caption: &str,
    tablefoot: &str,
) -> Result<()> {
    let mcq = ctx.mcquillan_sample()?;
    let dwarfs = mcq.subsample(&["Dwarfs", "Statistics Teff"])?;
    let mut selected: Vec<SampleStar> = dwarfs
        .into_iter()
        .filter(|s| {
            s.prot.is_some_and(|p| {
                p > min_period && if upper_inclusive { p <= max_period } else { p < max_period }
            })
        })
        .collect();
    if selected.is_empty() {
        return Err(catalogs::CatalogError::EmptySample(format!(
            "{stem}: no rotators between {min_period} and {max_period} days"
        ))
        .into());
    }
    selected.sort_by_key(|s| s.kepid);
    log::info!("{stem}: {} rotators selected", selected.len());

    // Spectroscopic identifications come from the APOGEE cross-match; most
    // rotators have none and those cells stay masked.
    let apo = ctx.apogee_sample()?;
    let spec_by_kic: HashMap<u64, &SampleStar> =
        apo.rows().iter().map(|s| (s.kepid, s)).collect();

    let spec_rows: Vec<Option<&&SampleStar>> = selected
        .iter()
        .map(|s| spec_by_kic.get(&s.kepid))
        .collect();

    let table = PaperTable {
        columns: vec![
            TableColumn::new(
                "KIC",
                "KIC",
                None,
                selected.iter().map(|s| s.kepid.to_string()).collect(),
            ),
            TableColumn::new(
                "APOGEE ID",
                "APOGEE_ID",
                None,
                spec_rows
                    .iter()
                    .map(|m| {
                        m.and_then(|s| s.designation.clone())
                            .unwrap_or_default()
                    })
                    .collect(),
            ),
            TableColumn::new(
                r"$\Teff$",
                "Teff",
                Some("K"),
                selected.iter().map(|s| fmt_g(s.teff.round())).collect(),
            ),
            TableColumn::new(
                r"\(K\)",
                "K",
                Some("mag"),
                selected.iter().map(|s| format!("{:.3}", s.kmag)).collect(),
            ),
            TableColumn::new(
                r"\MK",
                "MK",
                Some("mag"),
                selected.iter().map(|s| format!("{:.3}", s.m_k)).collect(),
            ),
            TableColumn::new(
                r"$\Delta \MK$",
                "DELTA_K",
                Some("mag"),
                selected
                    .iter()
                    .map(|s| format!("{:.3}", s.corrected_k_excess))
                    .collect(),
            ),
            TableColumn::new(
                r"$P_{\mathrm{rot}}$",
                "Prot",
                Some("day"),
                selected.iter().map(|s| fmt_opt(s.prot, 2)).collect(),
            ),
            TableColumn::new(
                r"\feh",
                "[Fe/H]",
                Some("dex"),
                spec_rows
                    .iter()
                    .map(|m| fmt_opt(m.and_then(|s| s.feh), 2))
                    .collect(),
            ),
        ],
        col_align: "llcccccc".to_string(),
        caption: caption.to_string(),
        tablefoot: tablefoot.to_string(),
        comments: vec![
            "KIC - The Kepler Input Catalog ID for the star".to_string(),
            "APOGEE_ID - The APOGEE ID if this star was observed in APOGEE. \
             The APOGEE ID is equivalent to the 2MASS ID"
                .to_string(),
            "Teff - The SDSS-calibrated photometric effective temperature".to_string(),
            "K - The 2MASS K-band apparent magnitude".to_string(),
            "MK - The 2MASS K-band absolute magnitude derived from Gaia parallaxes".to_string(),
            "DELTA_K - The vertical displacement above the median-metallicity \
             isochrone as derived in this work"
                .to_string(),
            "Prot - The photometric rotation period".to_string(),
            "[Fe/H] - The APOGEE iron abundance if this star was observed in APOGEE".to_string(),
        ],
    };

    write_text(&ctx.out().table(&format!("{stem}.tex"))?, &table.aastex(LATEX_ROWS)?)?;
    write_text(&ctx.out().table(&format!("{stem}.txt"))?, &table.fixed_width()?)?;
    Ok(())
}
