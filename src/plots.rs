//! Diagnostic plot rendering.
//!
//! All four plots are drawn from pixel-space primitives without any
//! text, so rendering works in headless environments with no font
//! files available.

use plotters::prelude::*;
use std::path::Path;
use tracing::info;

use crate::corr::correlation_matrix;
use crate::error::{PanelError, Result};
use crate::filter::indicator_columns;
use crate::utils::{column_as_f64, numeric_column_names};

const PLOT_WIDTH: u32 = 1200;
const PLOT_HEIGHT: u32 = 800;
const MARGIN: i32 = 20;

fn plot_err(e: impl std::fmt::Display) -> PanelError {
    PanelError::Plot(e.to_string())
}

/// Diverging blue-white-red color for a correlation in `-1.0..=1.0`.
/// NaN renders gray.
fn correlation_color(r: f64) -> RGBColor {
    if r.is_nan() {
        return RGBColor(180, 180, 180);
    }
    let r = r.clamp(-1.0, 1.0);
    if r >= 0.0 {
        let t = r;
        RGBColor(255, (255.0 * (1.0 - t)) as u8, (255.0 * (1.0 - t)) as u8)
    } else {
        let t = -r;
        RGBColor((255.0 * (1.0 - t)) as u8, (255.0 * (1.0 - t)) as u8, 255)
    }
}

/// Cell grid of missing values, one column of cells per table column.
pub fn missingness_heatmap(df: &polars::prelude::DataFrame, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let n_cols = df.width();
    let n_rows = df.height();
    if n_cols == 0 || n_rows == 0 {
        root.present().map_err(plot_err)?;
        return Ok(());
    }

    let w = (PLOT_WIDTH as i32 - 2 * MARGIN) as f64 / n_cols as f64;
    let h = (PLOT_HEIGHT as i32 - 2 * MARGIN) as f64 / n_rows as f64;

    for (c, column) in df.get_columns().iter().enumerate() {
        let nulls = column.as_materialized_series().is_null();
        for (r, missing) in nulls.into_iter().enumerate() {
            let color = if missing.unwrap_or(true) {
                RGBColor(40, 40, 90)
            } else {
                RGBColor(235, 220, 160)
            };
            let x0 = MARGIN + (c as f64 * w) as i32;
            let y0 = MARGIN + (r as f64 * h) as i32;
            let x1 = MARGIN + ((c + 1) as f64 * w) as i32;
            let y1 = (MARGIN + ((r + 1) as f64 * h) as i32).max(y0 + 1);
            root.draw(&Rectangle::new(
                [(x0, y0), (x1, y1)],
                color.filled(),
            ))
            .map_err(plot_err)?;
        }
    }

    root.present().map_err(plot_err)?;
    info!(path = %path.display(), "missingness heatmap written");
    Ok(())
}

/// Columns shown in the distribution grid: the indicators plus the
/// time axis and accession year, without the 0/1 membership flags.
fn distribution_columns(df: &polars::prelude::DataFrame) -> Vec<String> {
    numeric_column_names(df)
        .into_iter()
        .filter(|name| name != "in_eu" && name != "ever_joined")
        .collect()
}

/// Histogram per column, arranged in a near-square grid.
pub fn distribution_grid(df: &polars::prelude::DataFrame, path: &Path) -> Result<()> {
    let names = distribution_columns(df);
    let root = BitMapBackend::new(path, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    if names.is_empty() {
        root.present().map_err(plot_err)?;
        return Ok(());
    }

    let grid_cols = (names.len() as f64).sqrt().ceil() as usize;
    let grid_rows = names.len().div_ceil(grid_cols);
    let panels = root.split_evenly((grid_rows, grid_cols));

    for (name, panel) in names.iter().zip(panels.iter()) {
        let values: Vec<f64> = column_as_f64(df, name)?.into_iter().flatten().collect();
        draw_histogram(panel, &values)?;
    }

    root.present().map_err(plot_err)?;
    info!(path = %path.display(), columns = names.len(), "distribution grid written");
    Ok(())
}

fn draw_histogram(
    panel: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    values: &[f64],
) -> Result<()> {
    let (pw, ph) = panel.dim_in_pixel();
    let pw = pw as i32;
    let ph = ph as i32;
    let inner = 8;

    panel
        .draw(&Rectangle::new(
            [(2, 2), (pw - 2, ph - 2)],
            RGBColor(120, 120, 120).stroke_width(1),
        ))
        .map_err(plot_err)?;
    if values.is_empty() {
        return Ok(());
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };

    let n_bins = 20usize;
    let mut bins = vec![0usize; n_bins];
    for v in values {
        let b = (((v - min) / span) * n_bins as f64) as usize;
        bins[b.min(n_bins - 1)] += 1;
    }
    let peak = *bins.iter().max().unwrap_or(&1) as f64;

    let bar_w = (pw - 2 * inner) as f64 / n_bins as f64;
    for (b, count) in bins.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let frac = *count as f64 / peak;
        let x0 = inner + (b as f64 * bar_w) as i32;
        let x1 = inner + ((b + 1) as f64 * bar_w) as i32 - 1;
        let y1 = ph - inner;
        let y0 = y1 - ((ph - 2 * inner) as f64 * frac) as i32;
        panel
            .draw(&Rectangle::new(
                [(x0, y0), (x1.max(x0 + 1), y1)],
                RGBColor(70, 110, 180).filled(),
            ))
            .map_err(plot_err)?;
    }
    Ok(())
}

/// Pairwise Pearson correlation heatmap over the indicator columns.
pub fn correlation_heatmap(df: &polars::prelude::DataFrame, path: &Path) -> Result<()> {
    let indicators = indicator_columns(df);
    let subset = df.select(indicators)?;
    let (names, matrix) = correlation_matrix(&subset)?;
    let root = BitMapBackend::new(path, (PLOT_HEIGHT, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let n = names.len();
    if n == 0 {
        root.present().map_err(plot_err)?;
        return Ok(());
    }

    let cell = (PLOT_HEIGHT as i32 - 2 * MARGIN) as f64 / n as f64;
    for (i, row) in matrix.iter().enumerate() {
        for (j, r) in row.iter().enumerate() {
            let x0 = MARGIN + (j as f64 * cell) as i32;
            let y0 = MARGIN + (i as f64 * cell) as i32;
            let x1 = MARGIN + ((j + 1) as f64 * cell) as i32;
            let y1 = MARGIN + ((i + 1) as f64 * cell) as i32;
            root.draw(&Rectangle::new(
                [(x0, y0), (x1, y1)],
                correlation_color(*r).filled(),
            ))
            .map_err(plot_err)?;
        }
    }

    root.present().map_err(plot_err)?;
    info!(path = %path.display(), columns = n, "correlation heatmap written");
    Ok(())
}

/// Quartile box with whiskers per indicator column, one panel each.
pub fn box_plot_grid(df: &polars::prelude::DataFrame, path: &Path) -> Result<()> {
    let names = indicator_columns(df);
    let root = BitMapBackend::new(path, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    if names.is_empty() {
        root.present().map_err(plot_err)?;
        return Ok(());
    }

    let grid_cols = (names.len() as f64).sqrt().ceil() as usize;
    let grid_rows = names.len().div_ceil(grid_cols);
    let panels = root.split_evenly((grid_rows, grid_cols));

    for (name, panel) in names.iter().zip(panels.iter()) {
        let mut values: Vec<f64> = column_as_f64(df, name)?.into_iter().flatten().collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        draw_box(panel, &values)?;
    }

    root.present().map_err(plot_err)?;
    info!(path = %path.display(), columns = names.len(), "box plots written");
    Ok(())
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

fn draw_box(
    panel: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    sorted: &[f64],
) -> Result<()> {
    let (pw, ph) = panel.dim_in_pixel();
    let pw = pw as i32;
    let ph = ph as i32;
    let inner = 10;

    panel
        .draw(&Rectangle::new(
            [(2, 2), (pw - 2, ph - 2)],
            RGBColor(120, 120, 120).stroke_width(1),
        ))
        .map_err(plot_err)?;
    if sorted.is_empty() {
        return Ok(());
    }

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let span = if max > min { max - min } else { 1.0 };
    let q1 = quantile(sorted, 0.25);
    let median = quantile(sorted, 0.5);
    let q3 = quantile(sorted, 0.75);

    // Value v mapped to a y pixel, low values at the bottom.
    let y = |v: f64| -> i32 {
        let frac = (v - min) / span;
        ph - inner - ((ph - 2 * inner) as f64 * frac) as i32
    };
    let cx = pw / 2;
    let half_w = (pw / 5).max(4);
    let style = RGBColor(70, 110, 180);

    panel
        .draw(&PathElement::new(vec![(cx, y(min)), (cx, y(max))], style.stroke_width(1)))
        .map_err(plot_err)?;
    for v in [min, max] {
        panel
            .draw(&PathElement::new(
                vec![(cx - half_w / 2, y(v)), (cx + half_w / 2, y(v))],
                style.stroke_width(1),
            ))
            .map_err(plot_err)?;
    }
    panel
        .draw(&Rectangle::new(
            [(cx - half_w, y(q3)), (cx + half_w, y(q1).max(y(q3) + 1))],
            style.mix(0.35).filled(),
        ))
        .map_err(plot_err)?;
    panel
        .draw(&Rectangle::new(
            [(cx - half_w, y(q3)), (cx + half_w, y(q1).max(y(q3) + 1))],
            style.stroke_width(1),
        ))
        .map_err(plot_err)?;
    panel
        .draw(&PathElement::new(
            vec![(cx - half_w, y(median)), (cx + half_w, y(median))],
            style.stroke_width(2),
        ))
        .map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{df, DataFrame};
    use tempfile::tempdir;

    fn sample() -> DataFrame {
        df![
            "country" => ["A", "A", "B", "B"],
            "year" => [2000i64, 2001, 2000, 2001],
            "x" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "y" => [Some(2.0), Some(4.0), None, Some(8.0)],
        ]
        .unwrap()
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 1.0), 4.0);
        assert_eq!(quantile(&sorted, 0.5), 2.5);
    }

    #[test]
    fn test_correlation_color_endpoints() {
        assert_eq!(correlation_color(1.0), RGBColor(255, 0, 0));
        assert_eq!(correlation_color(-1.0), RGBColor(0, 0, 255));
        assert_eq!(correlation_color(0.0), RGBColor(255, 255, 255));
    }

    #[test]
    fn test_distribution_columns_skip_membership_flags() {
        let df = df![
            "country" => ["France"],
            "year" => [2000i64],
            "year_joined" => [1958.0],
            "in_eu" => [1i32],
            "ever_joined" => [1i32],
            "gdp" => [1.0],
        ]
        .unwrap();
        assert_eq!(
            distribution_columns(&df),
            vec!["year", "year_joined", "gdp"]
        );
        assert_eq!(crate::filter::indicator_columns(&df), vec!["gdp"]);
    }

    #[test]
    fn test_plots_render_with_membership_columns() {
        let df = df![
            "country" => ["France", "France", "France", "France"],
            "year" => [2000i64, 2001, 2002, 2003],
            "year_joined" => [1958.0, 1958.0, 1958.0, 1958.0],
            "in_eu" => [1i32, 1, 1, 1],
            "ever_joined" => [1i32, 1, 1, 1],
            "gdp" => [Some(1.0), Some(2.0), None, Some(4.0)],
        ]
        .unwrap();
        let dir = tempdir().unwrap();
        distribution_grid(&df, &dir.path().join("dist.png")).unwrap();
        correlation_heatmap(&df, &dir.path().join("corr.png")).unwrap();
        box_plot_grid(&df, &dir.path().join("box.png")).unwrap();
    }

    #[test]
    fn test_all_plots_render() {
        let df = sample();
        let dir = tempdir().unwrap();

        missingness_heatmap(&df, &dir.path().join("missing.png")).unwrap();
        distribution_grid(&df, &dir.path().join("dist.png")).unwrap();
        correlation_heatmap(&df, &dir.path().join("corr.png")).unwrap();
        box_plot_grid(&df, &dir.path().join("box.png")).unwrap();

        for name in ["missing.png", "dist.png", "corr.png", "box.png"] {
            assert!(dir.path().join(name).exists());
        }
    }
}
