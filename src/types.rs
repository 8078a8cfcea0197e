//! Result and summary types produced by the pipeline.

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-column missingness counts around the imputation stage.
///
/// `missing_after` can stay above zero only when a country had no
/// non-missing target rows to fit on; that case is deliberately left
/// unresolved and surfaced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMissingness {
    pub column: String,
    pub missing_before: usize,
    pub missing_after: usize,
}

impl ColumnMissingness {
    pub fn filled(&self) -> usize {
        self.missing_before.saturating_sub(self.missing_after)
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub countries_before: usize,
    pub countries_after: usize,

    /// Missingness per imputed column, before and after the engine ran.
    pub missingness: Vec<ColumnMissingness>,

    /// Human-readable record of what each stage did.
    pub steps: Vec<String>,
}

impl PipelineSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            duration_ms: 0,
            rows_before: 0,
            rows_after: 0,
            columns_before: 0,
            columns_after: 0,
            countries_before: 0,
            countries_after: 0,
            missingness: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn add_step(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }

    /// Total missing cells left after imputation, across all columns.
    pub fn remaining_missing(&self) -> usize {
        self.missingness.iter().map(|m| m.missing_after).sum()
    }
}

impl Default for PipelineSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of a full pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    /// The cleaned, imputed observation table.
    pub data: DataFrame,
    pub summary: PipelineSummary,
    /// Paths of every file the run wrote, empty when `save_to_disk` is off.
    pub outputs: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_missingness_filled() {
        let m = ColumnMissingness {
            column: "gdp".to_string(),
            missing_before: 10,
            missing_after: 3,
        };
        assert_eq!(m.filled(), 7);
    }

    #[test]
    fn test_summary_remaining_missing() {
        let mut summary = PipelineSummary::new();
        summary.missingness.push(ColumnMissingness {
            column: "a".to_string(),
            missing_before: 5,
            missing_after: 0,
        });
        summary.missingness.push(ColumnMissingness {
            column: "b".to_string(),
            missing_before: 4,
            missing_after: 2,
        });
        assert_eq!(summary.remaining_missing(), 2);
    }

    #[test]
    fn test_summary_serializes() {
        let summary = PipelineSummary::new();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("rows_before"));
    }
}
