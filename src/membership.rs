//! EU membership metadata and the derived membership columns.
//!
//! The accession table maps each member state to the year its wave
//! joined; geographic Europe is the union of ever-members and a static
//! allow-list of non-EU European countries.

use crate::error::Result;
use crate::utils::column_as_f64;
use once_cell::sync::Lazy;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

/// Columns that carry panel structure rather than indicator data.
///
/// `year` stays a model feature; the rest never enter imputation as
/// targets.
pub const BOOKKEEPING_COLUMNS: [&str; 4] = ["year", "year_joined", "in_eu", "ever_joined"];

/// Accession year per EU member state, by enlargement wave.
pub static ACCESSION_YEARS: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    let waves: [(&[&str], i32); 8] = [
        (
            &[
                "Belgium",
                "France",
                "Germany",
                "Italy",
                "Luxembourg",
                "Netherlands",
            ],
            1958,
        ),
        (&["Denmark", "Ireland"], 1973),
        (&["Greece"], 1981),
        (&["Portugal", "Spain"], 1986),
        (&["Austria", "Finland", "Sweden"], 1995),
        (
            &[
                "Cyprus",
                "Czech Republic",
                "Estonia",
                "Hungary",
                "Latvia",
                "Lithuania",
                "Malta",
                "Poland",
                "Slovakia",
                "Slovenia",
            ],
            2004,
        ),
        (&["Bulgaria", "Romania"], 2007),
        (&["Croatia"], 2013),
    ];

    let mut map = HashMap::new();
    for (countries, year) in waves {
        for country in countries {
            map.insert(*country, year);
        }
    }
    map
});

/// European countries that never joined the EU but belong to the panel.
pub static NON_EU_EUROPEAN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Andorra",
        "Belarus",
        "Iceland",
        "Liechtenstein",
        "Moldova",
        "Monaco",
        "Norway",
        "Russian Federation",
        "San Marino",
        "Switzerland",
        "Ukraine",
        "Bosnia and Herzegovina",
        "Albania",
        "Montenegro",
        "Serbia",
        "North Macedonia",
    ]
    .into_iter()
    .collect()
});

/// The year a country joined the EU, if it ever did.
pub fn accession_year(country: &str) -> Option<i32> {
    ACCESSION_YEARS.get(country).copied()
}

/// Whether a country belongs to geographic Europe for this panel.
pub fn is_european(country: &str) -> bool {
    accession_year(country).is_some() || NON_EU_EUROPEAN.contains(country)
}

/// Append `year_joined`, `in_eu`, and `ever_joined` to the table.
///
/// `year_joined` stays null for never-members; `in_eu` is 1 from the
/// accession year onward; `ever_joined` is 1 for any member state
/// regardless of the observation year.
pub fn derive_membership_columns(df: &mut DataFrame) -> Result<()> {
    let countries: Vec<Option<String>> = {
        let col = df.column("country")?;
        let ca = col.as_materialized_series().str()?.clone();
        ca.into_iter().map(|v| v.map(|s| s.to_string())).collect()
    };
    let years = column_as_f64(df, "year")?;

    let mut year_joined: Vec<Option<f64>> = Vec::with_capacity(df.height());
    let mut in_eu: Vec<i32> = Vec::with_capacity(df.height());
    let mut ever_joined: Vec<i32> = Vec::with_capacity(df.height());

    for (country, year) in countries.iter().zip(years.iter()) {
        let joined = country.as_deref().and_then(accession_year);
        year_joined.push(joined.map(|y| y as f64));
        ever_joined.push(if joined.is_some() { 1 } else { 0 });
        let member_now = match (joined, year) {
            (Some(j), Some(y)) => *y >= j as f64,
            _ => false,
        };
        in_eu.push(if member_now { 1 } else { 0 });
    }

    df.with_column(Series::new("year_joined".into(), year_joined))?;
    df.with_column(Series::new("in_eu".into(), in_eu))?;
    df.with_column(Series::new("ever_joined".into(), ever_joined))?;
    Ok(())
}

/// Keep only rows whose country is classified as European.
pub fn restrict_to_europe(df: DataFrame) -> Result<DataFrame> {
    let mask: Vec<bool> = {
        let col = df.column("country")?;
        let ca = col.as_materialized_series().str()?.clone();
        ca.into_iter()
            .map(|v| v.map(is_european).unwrap_or(false))
            .collect()
    };
    let mask = BooleanChunked::from_slice("europe".into(), &mask);
    Ok(df.filter(&mask)?)
}
