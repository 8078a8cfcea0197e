//! Error types for the panel cleaning pipeline.
//!
//! A single `thiserror` hierarchy used across every stage, with a
//! `Result` alias and a context-wrapping combinator.

use thiserror::Error;

/// The main error type for the panel pipeline.
#[derive(Error, Debug)]
pub enum PanelError {
    /// A column the pipeline cannot run without is absent from the input.
    #[error("Required column '{0}' not found in dataset")]
    MissingRequiredColumn(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Imputation failed for a specific column.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// Regression model training or prediction failed.
    #[error("Regression failed: {0}")]
    Regression(String),

    /// Spreadsheet export failed.
    #[error("Failed to export workbook: {0}")]
    Export(String),

    /// Diagnostic plot rendering failed.
    #[error("Failed to render plot: {0}")]
    Plot(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PanelError>,
    },
}

impl PanelError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PanelError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PanelError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_context_preserves_source() {
        let error = PanelError::ColumnNotFound("gdp".to_string()).with_context("During filtering");
        let msg = error.to_string();
        assert!(msg.contains("During filtering"));
        assert!(matches!(
            error,
            PanelError::WithContext { source, .. } if matches!(*source, PanelError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_missing_required_column_message() {
        let error = PanelError::MissingRequiredColumn("country".to_string());
        assert!(error.to_string().contains("country"));
    }

    #[test]
    fn test_result_ext_on_polars_result() {
        let bad: std::result::Result<(), polars::error::PolarsError> = Err(
            polars::error::PolarsError::ComputeError("boom".into()),
        );
        let wrapped = bad.context("While selecting columns");
        assert!(wrapped.unwrap_err().to_string().contains("While selecting"));
    }
}
