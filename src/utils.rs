//! Shared helpers for working with the observation table.
//!
//! Thin wrappers over polars for the access patterns the pipeline uses
//! everywhere: numeric dtype checks, f64 extraction, missingness
//! fractions, and per-country row grouping.

use crate::error::{PanelError, Result};
use polars::prelude::*;

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Names of all numeric columns, in schema order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

/// Extract a column as `Vec<Option<f64>>`, casting integers as needed.
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(name)
        .map_err(|_| PanelError::ColumnNotFound(name.to_string()))?;
    let series = col.as_materialized_series();
    let float_series = series.cast(&DataType::Float64)?;
    let ca = float_series.f64()?;
    Ok(ca.into_iter().collect())
}

/// Fraction of null entries in a column, in `0.0..=1.0`.
pub fn null_fraction(df: &DataFrame, name: &str) -> Result<f64> {
    let col = df
        .column(name)
        .map_err(|_| PanelError::ColumnNotFound(name.to_string()))?;
    if df.height() == 0 {
        return Ok(0.0);
    }
    Ok(col.null_count() as f64 / df.height() as f64)
}

/// Replace a numeric column with new values, preserving its name.
pub fn replace_f64_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    let series = Series::new(name.into(), values);
    df.replace(name, series)?;
    Ok(())
}

/// Group row indices by country, in order of first appearance.
///
/// Rows with a null country are skipped; they belong to no partition.
pub fn country_row_groups(df: &DataFrame) -> Result<Vec<(String, Vec<usize>)>> {
    let col = df
        .column("country")
        .map_err(|_| PanelError::MissingRequiredColumn("country".to_string()))?;
    let series = col.as_materialized_series();
    let ca = series.str()?;

    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<usize>> =
        std::collections::HashMap::new();

    for (idx, value) in ca.into_iter().enumerate() {
        if let Some(name) = value {
            let entry = groups.entry(name.to_string()).or_insert_with(|| {
                order.push(name.to_string());
                Vec::new()
            });
            entry.push(idx);
        }
    }

    Ok(order
        .into_iter()
        .map(|name| {
            let indices = groups.remove(&name).unwrap_or_default();
            (name, indices)
        })
        .collect())
}

/// Distinct country names, in order of first appearance.
pub fn unique_countries(df: &DataFrame) -> Result<Vec<String>> {
    Ok(country_row_groups(df)?
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_numeric_column_names_schema_order() {
        let df = df![
            "country" => ["A", "B"],
            "year" => [2000i64, 2001],
            "gdp" => [1.0, 2.0],
        ]
        .unwrap();
        assert_eq!(numeric_column_names(&df), vec!["year", "gdp"]);
    }

    #[test]
    fn test_column_as_f64_casts_integers() {
        let df = df!["year" => [2000i64, 2001]].unwrap();
        let values = column_as_f64(&df, "year").unwrap();
        assert_eq!(values, vec![Some(2000.0), Some(2001.0)]);
    }

    #[test]
    fn test_column_as_f64_preserves_nulls() {
        let df = df!["x" => [Some(1.0), None, Some(3.0)]].unwrap();
        let values = column_as_f64(&df, "x").unwrap();
        assert_eq!(values, vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_null_fraction() {
        let df = df!["x" => [Some(1.0), None, None, Some(4.0)]].unwrap();
        assert_eq!(null_fraction(&df, "x").unwrap(), 0.5);
    }

    #[test]
    fn test_country_row_groups_first_appearance_order() {
        let df = df![
            "country" => ["Beta", "Alpha", "Beta", "Alpha"],
            "year" => [2000i64, 2000, 2001, 2001],
        ]
        .unwrap();
        let groups = country_row_groups(&df).unwrap();
        assert_eq!(groups[0].0, "Beta");
        assert_eq!(groups[0].1, vec![0, 2]);
        assert_eq!(groups[1].0, "Alpha");
        assert_eq!(groups[1].1, vec![1, 3]);
    }

    #[test]
    fn test_missing_column_error() {
        let df = df!["x" => [1.0]].unwrap();
        assert!(column_as_f64(&df, "nope").is_err());
    }
}
