//! Workbook export of the cleaned observation table.

use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::info;

use crate::error::{PanelError, Result};
use crate::utils::{column_as_f64, is_numeric_dtype};

/// Write the table to a single-sheet xlsx workbook.
///
/// Row one carries the column names; data rows follow in frame order
/// with no index column. Missing cells are left empty.
pub fn write_workbook(df: &DataFrame, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = col_idx as u16;
        worksheet
            .write_string(0, col, column.name().as_str())
            .map_err(|e| PanelError::Export(e.to_string()))?;

        if is_numeric_dtype(column.dtype()) {
            let values = column_as_f64(df, column.name().as_str())?;
            for (row_idx, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    worksheet
                        .write_number(row_idx as u32 + 1, col, *v)
                        .map_err(|e| PanelError::Export(e.to_string()))?;
                }
            }
        } else {
            let series = column.as_materialized_series();
            let ca = series.str()?;
            for (row_idx, value) in ca.into_iter().enumerate() {
                if let Some(s) = value {
                    worksheet
                        .write_string(row_idx as u32 + 1, col, s)
                        .map_err(|e| PanelError::Export(e.to_string()))?;
                }
            }
        }
    }

    workbook
        .save(path)
        .map_err(|e| PanelError::Export(e.to_string()))?;
    info!(path = %path.display(), rows = df.height(), "workbook written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_workbook_file() {
        let df = df![
            "country" => ["France", "Spain"],
            "year" => [2000i64, 2001],
            "gdp" => [Some(1.5), None],
        ]
        .unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.xlsx");

        write_workbook(&df, &path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
    }

    #[test]
    fn test_empty_frame_still_writes_header() {
        let df = df![
            "country" => Vec::<String>::new(),
            "year" => Vec::<i64>::new(),
        ]
        .unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        write_workbook(&df, &path).unwrap();
        assert!(path.exists());
    }
}
