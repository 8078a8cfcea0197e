//! Configuration for the panel cleaning pipeline.
//!
//! All thresholds, the year window, file paths, and the regressor
//! hyperparameters live here, set through a fluent builder and checked
//! by `validate()`.

use crate::impute::GbtParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the panel pipeline.
///
/// Use [`PipelineConfig::builder()`] for fluent setup.
///
/// # Example
///
/// ```rust,ignore
/// use eupanel::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .year_range(1980, 2018)
///     .correlation_threshold(0.5)
///     .output_dir("output")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// First year kept in the panel (inclusive). Default: 1980.
    pub year_min: i32,

    /// Last year kept in the panel (inclusive). Default: 2018.
    pub year_max: i32,

    /// Columns whose overall missing fraction exceeds this are dropped.
    /// Default: 0.5.
    pub column_missing_threshold: f64,

    /// Columns whose missing fraction within pre-accession rows of EU
    /// members exceeds this are dropped. Default: 0.5.
    pub pre_accession_missing_threshold: f64,

    /// Countries with any numeric column above this missing fraction are
    /// dropped entirely. Default: 0.6.
    pub country_missing_threshold: f64,

    /// Minimum absolute Pearson correlation for a column to be selected
    /// as an imputation covariate. Default: 0.5.
    pub correlation_threshold: f64,

    /// Minimum number of numeric indicator columns the input must carry
    /// beyond the key columns. Default: 1.
    pub min_indicator_columns: usize,

    /// Hyperparameters for the gradient-boosted tree regressor.
    pub gbt: GbtParams,

    /// Seed for the regressor's stochastic internals. Default: 42.
    pub seed: u64,

    /// Output directory for the workbook and plots. Default: "output".
    pub output_dir: PathBuf,

    /// File name of the exported workbook. Default: "eu_cleaned.xlsx".
    pub workbook_name: String,

    /// Whether to render the diagnostic plots. Default: true.
    pub generate_plots: bool,

    /// Whether to write any files at all. When false the pipeline runs
    /// in memory only, which is what the tests use. Default: true.
    pub save_to_disk: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year_min: 1980,
            year_max: 2018,
            column_missing_threshold: 0.5,
            pre_accession_missing_threshold: 0.5,
            country_missing_threshold: 0.6,
            correlation_threshold: 0.5,
            min_indicator_columns: 1,
            gbt: GbtParams::default(),
            seed: 42,
            output_dir: PathBuf::from("output"),
            workbook_name: "eu_cleaned.xlsx".to_string(),
            generate_plots: true,
            save_to_disk: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.year_min > self.year_max {
            return Err(ConfigValidationError::InvalidYearRange {
                min: self.year_min,
                max: self.year_max,
            });
        }

        for (field, value) in [
            ("column_missing_threshold", self.column_missing_threshold),
            (
                "pre_accession_missing_threshold",
                self.pre_accession_missing_threshold,
            ),
            ("country_missing_threshold", self.country_missing_threshold),
            ("correlation_threshold", self.correlation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.gbt.n_trees == 0 {
            return Err(ConfigValidationError::InvalidRegressor(
                "n_trees must be at least 1".to_string(),
            ));
        }
        if self.gbt.learning_rate <= 0.0 || self.gbt.learning_rate > 1.0 {
            return Err(ConfigValidationError::InvalidRegressor(format!(
                "learning_rate {} outside (0, 1]",
                self.gbt.learning_rate
            )));
        }
        if self.gbt.subsample <= 0.0 || self.gbt.subsample > 1.0 {
            return Err(ConfigValidationError::InvalidRegressor(format!(
                "subsample {} outside (0, 1]",
                self.gbt.subsample
            )));
        }

        Ok(())
    }

    /// Full path of the exported workbook.
    pub fn workbook_path(&self) -> PathBuf {
        self.output_dir.join(&self.workbook_name)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid year range: {min}..={max}")]
    InvalidYearRange { min: i32, max: i32 },

    #[error("Invalid regressor parameters: {0}")]
    InvalidRegressor(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    year_min: Option<i32>,
    year_max: Option<i32>,
    column_missing_threshold: Option<f64>,
    pre_accession_missing_threshold: Option<f64>,
    country_missing_threshold: Option<f64>,
    correlation_threshold: Option<f64>,
    min_indicator_columns: Option<usize>,
    gbt: Option<GbtParams>,
    seed: Option<u64>,
    output_dir: Option<PathBuf>,
    workbook_name: Option<String>,
    generate_plots: Option<bool>,
    save_to_disk: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the inclusive year window kept by the filter stage.
    pub fn year_range(mut self, min: i32, max: i32) -> Self {
        self.year_min = Some(min);
        self.year_max = Some(max);
        self
    }

    /// Set the overall column-missingness drop threshold.
    pub fn column_missing_threshold(mut self, threshold: f64) -> Self {
        self.column_missing_threshold = Some(threshold);
        self
    }

    /// Set the pre-accession column-missingness drop threshold.
    pub fn pre_accession_missing_threshold(mut self, threshold: f64) -> Self {
        self.pre_accession_missing_threshold = Some(threshold);
        self
    }

    /// Set the per-country missingness drop threshold.
    pub fn country_missing_threshold(mut self, threshold: f64) -> Self {
        self.country_missing_threshold = Some(threshold);
        self
    }

    /// Set the covariate-selection correlation threshold.
    pub fn correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = Some(threshold);
        self
    }

    /// Set the minimum number of indicator columns required of the input.
    pub fn min_indicator_columns(mut self, count: usize) -> Self {
        self.min_indicator_columns = Some(count);
        self
    }

    /// Set the regressor hyperparameters.
    pub fn gbt_params(mut self, params: GbtParams) -> Self {
        self.gbt = Some(params);
        self
    }

    /// Set the regressor seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the output directory for the workbook and plots.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the workbook file name.
    pub fn workbook_name(mut self, name: impl Into<String>) -> Self {
        self.workbook_name = Some(name.into());
        self
    }

    /// Enable or disable diagnostic plot rendering.
    pub fn generate_plots(mut self, generate: bool) -> Self {
        self.generate_plots = Some(generate);
        self
    }

    /// Enable or disable writing output files.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            year_min: self.year_min.unwrap_or(defaults.year_min),
            year_max: self.year_max.unwrap_or(defaults.year_max),
            column_missing_threshold: self
                .column_missing_threshold
                .unwrap_or(defaults.column_missing_threshold),
            pre_accession_missing_threshold: self
                .pre_accession_missing_threshold
                .unwrap_or(defaults.pre_accession_missing_threshold),
            country_missing_threshold: self
                .country_missing_threshold
                .unwrap_or(defaults.country_missing_threshold),
            correlation_threshold: self
                .correlation_threshold
                .unwrap_or(defaults.correlation_threshold),
            min_indicator_columns: self
                .min_indicator_columns
                .unwrap_or(defaults.min_indicator_columns),
            gbt: self.gbt.unwrap_or_default(),
            seed: self.seed.unwrap_or(defaults.seed),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            workbook_name: self.workbook_name.unwrap_or(defaults.workbook_name),
            generate_plots: self.generate_plots.unwrap_or(defaults.generate_plots),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
        };

        config.validate()?;
        Ok(config)
    }
}
