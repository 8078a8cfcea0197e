//! Pipeline orchestration: validate, enrich, filter, impute, export.

use polars::prelude::*;
use static_assertions::assert_impl_all;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, info_span};

use crate::config::PipelineConfig;
use crate::error::{PanelError, Result, ResultExt};
use crate::export::write_workbook;
use crate::filter::{apply_filters, indicator_columns};
use crate::impute::ImputationEngine;
use crate::membership::{derive_membership_columns, restrict_to_europe};
use crate::plots;
use crate::types::{PipelineResult, PipelineSummary};
use crate::utils::unique_countries;

/// Columns the input must carry for any stage to make sense.
pub const REQUIRED_COLUMNS: [&str; 2] = ["country", "year"];

/// The cleaning pipeline, configured once and reusable across inputs.
pub struct Pipeline {
    config: PipelineConfig,
}

assert_impl_all!(Pipeline: Send, Sync);

/// Builder for [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        Pipeline::new(self.config.unwrap_or_default())
    }
}

impl Pipeline {
    /// Build a pipeline from a validated configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| PanelError::InvalidConfig(e.to_string()))?;
        Ok(Self { config })
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Pipeline with the default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fail unless the key columns and enough indicator columns exist.
    fn validate_input(&self, df: &DataFrame) -> Result<()> {
        for name in REQUIRED_COLUMNS {
            if df.column(name).is_err() {
                return Err(PanelError::MissingRequiredColumn(name.to_string()));
            }
        }
        let indicators = indicator_columns(df).len();
        if indicators < self.config.min_indicator_columns {
            return Err(PanelError::InvalidConfig(format!(
                "input carries {} indicator columns, at least {} required",
                indicators, self.config.min_indicator_columns
            )));
        }
        Ok(())
    }

    /// Run the full pipeline over a loaded observation table.
    pub fn run(&self, df: DataFrame) -> Result<PipelineResult> {
        let started = Instant::now();
        let span = info_span!("pipeline");
        let _guard = span.enter();

        let mut summary = PipelineSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();
        summary.countries_before = unique_countries(&df)?.len();

        self.validate_input(&df)?;

        let mut df = df;
        derive_membership_columns(&mut df).context("While deriving membership columns")?;
        summary.add_step("Derived year_joined, in_eu, ever_joined".to_string());

        let rows = df.height();
        let df = restrict_to_europe(df).context("While restricting to Europe")?;
        if df.height() != rows {
            summary.add_step(format!(
                "Restricted to Europe ({} rows removed)",
                rows - df.height()
            ));
        }

        let (mut df, actions) = apply_filters(df, &self.config)?;
        for action in actions {
            summary.add_step(action);
        }

        let mut outputs: Vec<PathBuf> = Vec::new();
        let render = self.config.save_to_disk && self.config.generate_plots;
        if self.config.save_to_disk {
            std::fs::create_dir_all(&self.config.output_dir)?;
        }

        // The missingness heatmap shows the gaps the engine is about to
        // fill, so it renders before imputation.
        if render {
            let path = self.config.output_dir.join("missingness.png");
            plots::missingness_heatmap(&df, &path)?;
            outputs.push(path);
        }

        let engine = ImputationEngine::new(
            self.config.correlation_threshold,
            self.config.gbt.clone(),
            self.config.seed,
        );
        summary.missingness = engine.impute_all(&mut df)?;
        let filled: usize = summary.missingness.iter().map(|m| m.filled()).sum();
        summary.add_step(format!(
            "Imputed {} values across {} columns",
            filled,
            summary.missingness.len()
        ));

        if self.config.save_to_disk {
            let path = self.config.workbook_path();
            write_workbook(&df, &path)?;
            summary.add_step(format!("Exported workbook to {}", path.display()));
            outputs.push(path);
        }
        if render {
            type PlotFn = fn(&DataFrame, &std::path::Path) -> Result<()>;
            let renders: [(&str, PlotFn); 3] = [
                ("distributions.png", plots::distribution_grid),
                ("correlation.png", plots::correlation_heatmap),
                ("box_plots.png", plots::box_plot_grid),
            ];
            for (name, render_fn) in renders {
                let path = self.config.output_dir.join(name);
                render_fn(&df, &path)?;
                outputs.push(path);
            }
        }

        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.countries_after = unique_countries(&df)?.len();
        summary.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            rows = summary.rows_after,
            columns = summary.columns_after,
            countries = summary.countries_after,
            remaining_missing = summary.remaining_missing(),
            duration_ms = summary.duration_ms,
            "pipeline complete"
        );

        Ok(PipelineResult {
            data: df,
            summary,
            outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory_pipeline() -> Pipeline {
        let config = PipelineConfig::builder()
            .save_to_disk(false)
            .build()
            .unwrap();
        Pipeline::new(config).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().year_min, 1980);
        assert_eq!(pipeline.config().seed, 42);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let df = df!["year" => [2000i64], "x" => [1.0]].unwrap();
        let err = in_memory_pipeline().run(df).unwrap_err();
        assert!(matches!(err, PanelError::MissingRequiredColumn(c) if c == "country"));
    }

    #[test]
    fn test_requires_indicator_columns() {
        let df = df![
            "country" => ["France"],
            "year" => [2000i64],
        ]
        .unwrap();
        let err = in_memory_pipeline().run(df).unwrap_err();
        assert!(matches!(err, PanelError::InvalidConfig(_)));
    }

    #[test]
    fn test_run_produces_clean_panel() {
        let n = 10usize;
        let years: Vec<i64> = (0..n as i64).map(|i| 2000 + i).collect();
        let mut gdp: Vec<Option<f64>> = (0..n).map(|i| Some(100.0 + i as f64 * 5.0)).collect();
        gdp[3] = None;
        let trade: Vec<Option<f64>> = (0..n).map(|i| Some(50.0 + i as f64 * 2.0)).collect();

        let mut country = vec!["France"; n];
        let mut all_years = years.clone();
        let mut all_gdp = gdp.clone();
        let mut all_trade = trade.clone();
        country.extend(vec!["Japan"; n]);
        all_years.extend(years);
        all_gdp.extend(gdp);
        all_trade.extend(trade);

        let df = df![
            "country" => country,
            "year" => all_years,
            "gdp" => all_gdp,
            "trade" => all_trade,
        ]
        .unwrap();

        let result = in_memory_pipeline().run(df).unwrap();
        assert_eq!(result.summary.countries_before, 2);
        assert_eq!(result.summary.countries_after, 1);
        assert_eq!(result.summary.remaining_missing(), 0);
        assert!(result.outputs.is_empty());
        assert_eq!(result.data.column("gdp").unwrap().null_count(), 0);
        assert!(result.data.column("in_eu").is_ok());
    }
}
