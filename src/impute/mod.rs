//! Imputation engine: per-country covariate selection plus a
//! gradient-boosted regressor for every column with gaps.
//!
//! Columns are visited in schema order and written back in place, so a
//! column imputed early serves as a complete covariate for the columns
//! after it. Countries never share training rows.

mod gbt;
mod regressor;

pub use gbt::{GbtParams, GbtRegressor};
pub use regressor::Regressor;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::corr::select_covariates;
use crate::error::Result;
use crate::membership::BOOKKEEPING_COLUMNS;
use crate::types::ColumnMissingness;
use crate::utils::{column_as_f64, country_row_groups, numeric_column_names, replace_f64_column};

/// Fills missing indicator values country by country.
///
/// Generic over the regressor: a fresh model is cloned from the
/// prototype for every (country, column) fit, so swapping models is a
/// [`Regressor`] impl, not an engine change.
#[derive(Debug, Clone)]
pub struct ImputationEngine<R: Regressor + Clone = GbtRegressor> {
    correlation_threshold: f64,
    prototype: R,
}

impl ImputationEngine<GbtRegressor> {
    pub fn new(correlation_threshold: f64, params: GbtParams, seed: u64) -> Self {
        Self::with_regressor(correlation_threshold, GbtRegressor::new(params, seed))
    }
}

impl<R: Regressor + Clone> ImputationEngine<R> {
    /// Engine backed by any regressor prototype.
    pub fn with_regressor(correlation_threshold: f64, prototype: R) -> Self {
        Self {
            correlation_threshold,
            prototype,
        }
    }

    /// Columns the engine will visit, in schema order.
    ///
    /// Numeric indicator columns only; the key and membership columns
    /// are never imputation targets.
    pub fn target_columns(df: &DataFrame) -> Vec<String> {
        numeric_column_names(df)
            .into_iter()
            .filter(|name| !BOOKKEEPING_COLUMNS.contains(&name.as_str()))
            .collect()
    }

    /// Impute every target column with at least one gap.
    pub fn impute_all(&self, df: &mut DataFrame) -> Result<Vec<ColumnMissingness>> {
        let mut report = Vec::new();
        for target in Self::target_columns(df) {
            let missing = df.column(&target)?.null_count();
            if missing == 0 {
                continue;
            }
            report.push(self.impute_column(df, &target)?);
        }
        Ok(report)
    }

    /// Fill the gaps of one column, training one model per country.
    ///
    /// Rows of a country with no observed target value at all are left
    /// missing and reported as such.
    pub fn impute_column(&self, df: &mut DataFrame, target: &str) -> Result<ColumnMissingness> {
        let mut values = column_as_f64(df, target)?;
        let missing_before = values.iter().filter(|v| v.is_none()).count();

        for (country, rows) in country_row_groups(df)? {
            let fit_rows: Vec<usize> = rows.iter().copied().filter(|&i| values[i].is_some()).collect();
            let gap_rows: Vec<usize> = rows.iter().copied().filter(|&i| values[i].is_none()).collect();

            if gap_rows.is_empty() {
                continue;
            }
            if fit_rows.is_empty() {
                warn!(country = %country, column = %target, "no observed values to fit on");
                continue;
            }

            let features = select_covariates(df, &rows, target, self.correlation_threshold)?;
            debug!(
                country = %country,
                column = %target,
                covariates = features.len(),
                "fitting imputation model"
            );

            let feature_columns: Vec<Vec<Option<f64>>> = features
                .iter()
                .map(|name| column_as_f64(df, name))
                .collect::<Result<_>>()?;

            let matrix = |indices: &[usize]| -> Vec<Vec<f64>> {
                indices
                    .iter()
                    .map(|&i| {
                        feature_columns
                            .iter()
                            .map(|col| col[i].unwrap_or(f64::NAN))
                            .collect()
                    })
                    .collect()
            };

            let targets: Vec<f64> = fit_rows
                .iter()
                .filter_map(|&i| values[i])
                .collect();

            let mut model = self.prototype.clone();
            model.fit(&matrix(&fit_rows), &targets)?;
            let predictions = model.predict(&matrix(&gap_rows))?;

            for (&i, prediction) in gap_rows.iter().zip(predictions.iter()) {
                values[i] = Some(*prediction);
            }
        }

        let missing_after = values.iter().filter(|v| v.is_none()).count();
        replace_f64_column(df, target, values)?;

        Ok(ColumnMissingness {
            column: target.to_string(),
            missing_before,
            missing_after,
        })
    }
}
