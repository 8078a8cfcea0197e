//! Filter stage: year window, sparse-column drops, redundant-column
//! drops, and sparse-country drops.
//!
//! Every function takes and returns an owned `DataFrame` and reports
//! what it dropped, so the pipeline can record each action in the run
//! summary. Applied to already-filtered data the stage is a no-op.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::membership::BOOKKEEPING_COLUMNS;
use crate::utils::{column_as_f64, country_row_groups, null_fraction, numeric_column_names};
use polars::prelude::*;
use tracing::{debug, info};

/// Indicator columns that duplicate information carried by a retained
/// sibling (totals next to per-capita forms, component breakdowns next
/// to aggregates).
pub const REDUNDANT_COLUMNS: [&str; 18] = [
    "GDP",
    "Population",
    "ElectricityAccess_Rural",
    "Percent_FDIInflow_GDP",
    "Imports_AnnualGrowth",
    "Imports",
    "ElectricityAccess_Urban",
    "Exports_AnnualGrowth",
    "Exports",
    "ElectricityAccess",
    "CO2_kt",
    "Merchandise_exports",
    "Merchandise_imports",
    "Percent_Remittances_Received_GDP",
    "Agr_raw_mat_exports",
    "Agr_raw_mat_imports",
    "CO2_kgperGDP",
    "GDP_CurrentD",
];

/// Numeric columns that hold indicator data, in schema order.
///
/// Excludes the key and derived membership columns.
pub fn indicator_columns(df: &DataFrame) -> Vec<String> {
    numeric_column_names(df)
        .into_iter()
        .filter(|name| !BOOKKEEPING_COLUMNS.contains(&name.as_str()))
        .collect()
}

/// Keep only rows whose year falls inside the inclusive window.
pub fn filter_year_range(df: DataFrame, year_min: i32, year_max: i32) -> Result<DataFrame> {
    let years = column_as_f64(&df, "year")?;
    let mask: Vec<bool> = years
        .iter()
        .map(|y| matches!(y, Some(v) if *v >= year_min as f64 && *v <= year_max as f64))
        .collect();
    let mask = BooleanChunked::from_slice("window".into(), &mask);
    Ok(df.filter(&mask)?)
}

/// Drop the ISO code column when the loader carried it through.
pub fn drop_country_code(df: DataFrame) -> (DataFrame, bool) {
    match df.drop("countrycode") {
        Ok(dropped) => (dropped, true),
        Err(_) => (df, false),
    }
}

/// Drop indicator columns whose overall missing fraction exceeds the
/// threshold. Returns the names dropped.
pub fn drop_sparse_columns(df: DataFrame, threshold: f64) -> Result<(DataFrame, Vec<String>)> {
    let mut to_drop = Vec::new();
    for name in indicator_columns(&df) {
        if null_fraction(&df, &name)? > threshold {
            to_drop.push(name);
        }
    }
    if to_drop.is_empty() {
        return Ok((df, to_drop));
    }
    debug!(count = to_drop.len(), "dropping sparse columns");
    let names: Vec<PlSmallStr> = to_drop.iter().map(|n| n.as_str().into()).collect();
    Ok((df.drop_many(names), to_drop))
}

/// Drop indicator columns too sparse within the pre-accession rows of
/// member states.
///
/// Pre-accession means a row of an ever-member country observed before
/// its accession year. With no such rows present nothing is dropped.
pub fn drop_pre_accession_sparse_columns(
    df: DataFrame,
    threshold: f64,
) -> Result<(DataFrame, Vec<String>)> {
    let years = column_as_f64(&df, "year")?;
    let joined = column_as_f64(&df, "year_joined")?;

    let mask: Vec<bool> = years
        .iter()
        .zip(joined.iter())
        .map(|(y, j)| matches!((y, j), (Some(y), Some(j)) if y < j))
        .collect();
    if !mask.iter().any(|&m| m) {
        return Ok((df, Vec::new()));
    }

    let mask = BooleanChunked::from_slice("pre_accession".into(), &mask);
    let subset = df.filter(&mask)?;

    let mut to_drop = Vec::new();
    for name in indicator_columns(&df) {
        if null_fraction(&subset, &name)? > threshold {
            to_drop.push(name);
        }
    }
    if to_drop.is_empty() {
        return Ok((df, to_drop));
    }
    debug!(count = to_drop.len(), "dropping pre-accession sparse columns");
    let names: Vec<PlSmallStr> = to_drop.iter().map(|n| n.as_str().into()).collect();
    Ok((df.drop_many(names), to_drop))
}

/// Drop the fixed redundant-indicator list, ignoring absent names.
pub fn drop_redundant_columns(df: DataFrame) -> (DataFrame, Vec<String>) {
    let present: Vec<String> = REDUNDANT_COLUMNS
        .iter()
        .filter(|name| df.column(name).is_ok())
        .map(|name| name.to_string())
        .collect();
    if present.is_empty() {
        return (df, present);
    }
    let names: Vec<PlSmallStr> = present.iter().map(|n| n.as_str().into()).collect();
    (df.drop_many(names), present)
}

/// Drop every row of countries with any indicator column above the
/// missingness threshold. Returns the country names dropped.
pub fn drop_sparse_countries(df: DataFrame, threshold: f64) -> Result<(DataFrame, Vec<String>)> {
    let indicators = indicator_columns(&df);
    let columns: Vec<Vec<Option<f64>>> = indicators
        .iter()
        .map(|name| column_as_f64(&df, name))
        .collect::<Result<_>>()?;

    let mut dropped = Vec::new();
    let mut keep = vec![true; df.height()];
    for (country, rows) in country_row_groups(&df)? {
        let too_sparse = columns.iter().any(|values| {
            let missing = rows.iter().filter(|&&i| values[i].is_none()).count();
            missing as f64 / rows.len() as f64 > threshold
        });
        if too_sparse {
            for &i in &rows {
                keep[i] = false;
            }
            dropped.push(country);
        }
    }

    if dropped.is_empty() {
        return Ok((df, dropped));
    }
    debug!(count = dropped.len(), "dropping sparse countries");
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok((df.filter(&mask)?, dropped))
}

/// Run the full filter stage in order, recording each action taken.
///
/// Order: year window, ISO code drop, overall sparse-column drop,
/// pre-accession sparse-column drop, redundant drop, sparse-country
/// drop.
pub fn apply_filters(df: DataFrame, config: &PipelineConfig) -> Result<(DataFrame, Vec<String>)> {
    let mut actions = Vec::new();

    let rows_in = df.height();
    let df = filter_year_range(df, config.year_min, config.year_max)?;
    if df.height() != rows_in {
        actions.push(format!(
            "Restricted years to {}..={} ({} rows removed)",
            config.year_min,
            config.year_max,
            rows_in - df.height()
        ));
    }

    let (df, code_dropped) = drop_country_code(df);
    if code_dropped {
        actions.push("Dropped countrycode column".to_string());
    }

    let (df, sparse) = drop_sparse_columns(df, config.column_missing_threshold)?;
    if !sparse.is_empty() {
        actions.push(format!(
            "Dropped {} columns above {:.0}% overall missingness: {}",
            sparse.len(),
            config.column_missing_threshold * 100.0,
            sparse.join(", ")
        ));
    }

    let (df, pre) = drop_pre_accession_sparse_columns(df, config.pre_accession_missing_threshold)?;
    if !pre.is_empty() {
        actions.push(format!(
            "Dropped {} columns above {:.0}% pre-accession missingness: {}",
            pre.len(),
            config.pre_accession_missing_threshold * 100.0,
            pre.join(", ")
        ));
    }

    let (df, redundant) = drop_redundant_columns(df);
    if !redundant.is_empty() {
        actions.push(format!(
            "Dropped {} redundant columns: {}",
            redundant.len(),
            redundant.join(", ")
        ));
    }

    let (df, countries) = drop_sparse_countries(df, config.country_missing_threshold)?;
    if !countries.is_empty() {
        actions.push(format!(
            "Dropped {} countries above {:.0}% missingness in some column: {}",
            countries.len(),
            config.country_missing_threshold * 100.0,
            countries.join(", ")
        ));
    }

    info!(
        rows = df.height(),
        columns = df.width(),
        "filter stage complete"
    );
    Ok((df, actions))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_year_window_is_inclusive() {
        let df = df![
            "country" => ["A", "A", "A", "A"],
            "year" => [1979i64, 1980, 2018, 2019],
        ]
        .unwrap();
        let filtered = filter_year_range(df, 1980, 2018).unwrap();
        assert_eq!(filtered.height(), 2);
    }

    #[test]
    fn test_drop_country_code_absent_is_noop() {
        let df = df!["country" => ["A"], "year" => [2000i64]].unwrap();
        let (df, dropped) = drop_country_code(df);
        assert!(!dropped);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_sparse_column_dropped_above_threshold() {
        let df = df![
            "country" => ["A", "A", "A", "A"],
            "year" => [2000i64, 2001, 2002, 2003],
            "dense" => [Some(1.0), Some(2.0), Some(3.0), None],
            "sparse" => [Some(1.0), None, None, None],
        ]
        .unwrap();
        let (df, dropped) = drop_sparse_columns(df, 0.5).unwrap();
        assert_eq!(dropped, vec!["sparse"]);
        assert!(df.column("dense").is_ok());
        assert!(df.column("sparse").is_err());
    }

    #[test]
    fn test_boundary_missingness_is_kept() {
        // Exactly at the threshold is not above it.
        let df = df![
            "country" => ["A", "A"],
            "year" => [2000i64, 2001],
            "half" => [Some(1.0), None],
        ]
        .unwrap();
        let (_, dropped) = drop_sparse_columns(df, 0.5).unwrap();
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_pre_accession_drop_ignores_non_members() {
        let df = df![
            "country" => ["A", "A", "B", "B"],
            "year" => [1990i64, 2000, 1990, 2000],
            "year_joined" => [Some(1995.0), Some(1995.0), None, None],
            "x" => [None, Some(1.0), None, None],
        ]
        .unwrap();
        // Pre-accession rows: only A/1990, which is fully missing in x.
        let (df, dropped) = drop_pre_accession_sparse_columns(df, 0.5).unwrap();
        assert_eq!(dropped, vec!["x"]);
        assert!(df.column("x").is_err());
    }

    #[test]
    fn test_pre_accession_noop_without_members() {
        let df = df![
            "country" => ["B", "B"],
            "year" => [1990i64, 2000],
            "year_joined" => [None::<f64>, None],
            "x" => [None::<f64>, None],
        ]
        .unwrap();
        let (df, dropped) = drop_pre_accession_sparse_columns(df, 0.5).unwrap();
        assert!(dropped.is_empty());
        assert!(df.column("x").is_ok());
    }

    #[test]
    fn test_redundant_columns_dropped_when_present() {
        let df = df![
            "country" => ["A"],
            "year" => [2000i64],
            "GDP" => [1.0],
            "GDP_percap" => [2.0],
        ]
        .unwrap();
        let (df, dropped) = drop_redundant_columns(df);
        assert_eq!(dropped, vec!["GDP"]);
        assert!(df.column("GDP_percap").is_ok());
    }

    #[test]
    fn test_sparse_country_dropped() {
        let df = df![
            "country" => ["A", "A", "B", "B"],
            "year" => [2000i64, 2001, 2000, 2001],
            "x" => [Some(1.0), Some(2.0), None, None],
        ]
        .unwrap();
        let (df, dropped) = drop_sparse_countries(df, 0.6).unwrap();
        assert_eq!(dropped, vec!["B"]);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_filter_stage_idempotent() {
        let df = df![
            "country" => ["A", "A", "A", "B", "B", "B"],
            "year" => [1979i64, 2000, 2001, 2000, 2001, 2002],
            "year_joined" => [Some(1995.0), Some(1995.0), Some(1995.0), None, None, None],
            "x" => [Some(1.0), Some(2.0), Some(3.0), Some(1.0), Some(2.0), None],
            "sparse" => [None, None, Some(1.0), None, None, None],
        ]
        .unwrap();

        let (once, _) = apply_filters(df, &config()).unwrap();
        let (twice, actions) = apply_filters(once.clone(), &config()).unwrap();
        assert!(actions.is_empty());
        assert_eq!(once, twice);
    }
}
