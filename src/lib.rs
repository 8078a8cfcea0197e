//! Cleaning and imputation pipeline for European country-year panels.
//!
//! Takes a raw country-year indicator table, derives EU membership
//! metadata, restricts the panel to Europe and a fixed year window,
//! drops sparse and redundant columns and sparse countries, then fills
//! the remaining gaps with per-country gradient-boosted regression
//! models whose covariates are picked by Pearson correlation. The
//! cleaned panel is exported as an xlsx workbook alongside diagnostic
//! plots.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use eupanel::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .year_range(1980, 2018)
//!     .output_dir("output")
//!     .build()?;
//! let result = Pipeline::new(config)?.run(df)?;
//! println!("{} missing values left", result.summary.remaining_missing());
//! ```

pub mod config;
pub mod corr;
pub mod error;
pub mod export;
pub mod filter;
pub mod impute;
pub mod membership;
pub mod pipeline;
pub mod plots;
pub mod types;
pub mod utils;

pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{PanelError, Result, ResultExt};
pub use impute::{GbtParams, GbtRegressor, ImputationEngine, Regressor};
pub use pipeline::{Pipeline, PipelineBuilder, REQUIRED_COLUMNS};
pub use types::{ColumnMissingness, PipelineResult, PipelineSummary};
