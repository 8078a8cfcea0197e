//! Pairwise-complete Pearson correlation and covariate selection.

use polars::prelude::*;

use crate::error::Result;
use crate::utils::column_as_f64;

/// Pearson correlation over rows where both values are present.
///
/// Returns `None` with fewer than two complete pairs or when either
/// side has zero variance over the complete pairs.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some((*a, *b)),
            _ => None,
        })
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Pick imputation covariates for `target` within one country's rows.
///
/// Candidates are every numeric column except the target itself.
/// Membership flags like `in_eu` compete like any indicator; the
/// per-country constants (`year_joined`, `ever_joined`) fall out
/// through the degenerate-correlation rule. Columns whose absolute
/// correlation with the target meets the threshold are returned
/// strongest first; ties keep schema order. `year` is always prepended
/// regardless of its correlation, never duplicated.
pub fn select_covariates(
    df: &DataFrame,
    rows: &[usize],
    target: &str,
    threshold: f64,
) -> Result<Vec<String>> {
    let target_full = column_as_f64(df, target)?;
    let target_vals: Vec<Option<f64>> = rows.iter().map(|&i| target_full[i]).collect();

    let mut scored: Vec<(String, f64)> = Vec::new();
    for col in df.get_columns() {
        let name = col.name().as_str();
        if name == target || name == "year" || !crate::utils::is_numeric_dtype(col.dtype()) {
            continue;
        }
        let full = column_as_f64(df, name)?;
        let vals: Vec<Option<f64>> = rows.iter().map(|&i| full[i]).collect();
        if let Some(r) = pearson(&target_vals, &vals) {
            if r.abs() >= threshold {
                scored.push((name.to_string(), r.abs()));
            }
        }
    }

    // Stable sort keeps schema order among equal scores.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut features = vec!["year".to_string()];
    features.extend(scored.into_iter().map(|(name, _)| name));
    Ok(features)
}

/// Full correlation matrix over the numeric indicator columns, for the
/// diagnostic heatmap. Cells without a defined correlation are NaN.
pub fn correlation_matrix(df: &DataFrame) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    let names: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|col| crate::utils::is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect();

    let columns: Vec<Vec<Option<f64>>> = names
        .iter()
        .map(|name| column_as_f64(df, name))
        .collect::<Result<_>>()?;

    let n = names.len();
    let mut matrix = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&columns[i], &columns[j]).unwrap_or(f64::NAN);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    Ok((names, matrix))
}
