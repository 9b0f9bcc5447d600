//! Column type inference.
//!
//! Each column commits to the first conversion that succeeds for every
//! non-missing cell, in the fixed order Numeric → Datetime → Categorical.
//! Numeric always goes first so a column of numeric-looking strings such as
//! years (`2019`, `2020`) can never be read as dates.

use super::frame::{datetime_column, float_column, str_values, string_column};
use super::types::{ColumnKind, ColumnTypeMap, Table};
use crate::error::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::{Column, DataFrame};
use rayon::prelude::*;

/// Tokens read as missing regardless of column type.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y",
    "%d %B %Y", "%b %d, %Y", "%B %d, %Y", "%b %d %Y",
];

/// Normalise a raw cell: trimmed text, or `None` for a missing marker.
pub fn normalize_cell(raw: Option<&str>) -> Option<&str> {
    let trimmed = raw?.trim();
    if MISSING_TOKENS.contains(&trimmed) {
        None
    } else {
        Some(trimmed)
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a calendar date or date-time into epoch milliseconds.
pub fn parse_datetime(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return d
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

/// Convert every value or give up on the first failure.
fn convert_all<T>(cells: &[Option<&str>], parse: impl Fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(text) => parse(text).map(Some),
        })
        .collect()
}

/// Classify one column and build its canonical typed representation.
pub fn infer_column(name: &str, raw: &[Option<String>]) -> Result<(ColumnKind, Column)> {
    let cells: Vec<Option<&str>> = raw
        .iter()
        .map(|c| normalize_cell(c.as_deref()))
        .collect();

    if let Some(values) = convert_all(&cells, parse_number) {
        return Ok((ColumnKind::Numeric, float_column(name, values)));
    }
    if let Some(values) = convert_all(&cells, parse_datetime) {
        return Ok((ColumnKind::Datetime, datetime_column(name, values)?));
    }
    let values = cells
        .into_iter()
        .map(|c| c.map(str::to_owned))
        .collect();
    Ok((ColumnKind::Categorical, string_column(name, values)))
}

/// Infer every column of `table`. Row order and row ids are unchanged.
pub fn infer_types(table: &Table) -> Result<(Table, ColumnTypeMap)> {
    let names = table.column_names();
    let raw: Vec<(String, Vec<Option<String>>)> = names
        .into_iter()
        .map(|name| str_values(&table.df, &name).map(|values| (name, values)))
        .collect::<Result<_>>()?;

    // Columns are independent; collect() keeps the input column order.
    let inferred: Vec<(String, ColumnKind, Column)> = raw
        .par_iter()
        .map(|(name, values)| {
            infer_column(name, values).map(|(kind, column)| (name.clone(), kind, column))
        })
        .collect::<Result<_>>()?;

    let mut types = ColumnTypeMap::new();
    let mut columns = Vec::with_capacity(inferred.len());
    for (name, kind, column) in inferred {
        tracing::debug!(column = %name, kind = kind.as_str(), "Column type inferred");
        types.push(name, kind);
        columns.push(column);
    }

    let df = DataFrame::new(columns)?;
    tracing::info!(
        numeric = types.columns_of(ColumnKind::Numeric).len(),
        datetime = types.columns_of(ColumnKind::Datetime).len(),
        categorical = types.columns_of(ColumnKind::Categorical).len(),
        "Type inference complete"
    );
    Ok((Table::with_row_ids(df, table.row_ids.clone()), types))
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;
    use crate::cleaner::frame::{datetime_values, f64_values};

    fn text(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| Some((*v).to_owned()))
            .collect()
    }

    fn text_table(columns: &[(&str, &[&str])]) -> Table {
        let cols = columns
            .iter()
            .map(|(name, values)| string_column(name, text(values)))
            .collect();
        Table::new(DataFrame::new(cols).unwrap())
    }

    #[test]
    fn test_numeric_strings_never_become_datetime() -> Result<()> {
        let years = ["2019", "2020", "2021"];
        let dates = ["2021-01-01", "2021-02-01", "2021-03-01"];

        for table in [
            text_table(&[("year", &years), ("when", &dates)]),
            text_table(&[("when", &dates), ("year", &years)]),
        ] {
            let (_, types) = infer_types(&table)?;
            assert_eq!(types.get("year"), Some(ColumnKind::Numeric));
            assert_eq!(types.get("when"), Some(ColumnKind::Datetime));
        }
        Ok(())
    }

    #[test]
    fn test_missing_tokens_become_nulls() -> Result<()> {
        let table = text_table(&[("score", &["1.5", "NA", " 3 ", "", "nan"])]);
        let (out, types) = infer_types(&table)?;
        assert_eq!(types.get("score"), Some(ColumnKind::Numeric));
        assert_eq!(
            f64_values(&out.df, "score")?,
            vec![Some(1.5), None, Some(3.0), None, None]
        );
        Ok(())
    }

    #[test]
    fn test_mixed_column_falls_back_to_categorical() -> Result<()> {
        let table = text_table(&[("code", &["12", "A7", "2021-01-01"])]);
        let (out, types) = infer_types(&table)?;
        assert_eq!(types.get("code"), Some(ColumnKind::Categorical));
        assert_eq!(out.df.column("code")?.null_count(), 0);
        Ok(())
    }

    #[test]
    fn test_datetime_layouts() -> Result<()> {
        assert_eq!(parse_datetime("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_datetime("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(parse_datetime("01/02/1970"), Some(86_400_000));
        assert_eq!(parse_datetime("2 Jan 1970"), Some(86_400_000));
        assert_eq!(parse_datetime("not a date"), None);

        let table = text_table(&[("when", &["1970-01-02", "N/A"])]);
        let (out, types) = infer_types(&table)?;
        assert_eq!(types.get("when"), Some(ColumnKind::Datetime));
        assert_eq!(datetime_values(&out.df, "when")?, vec![Some(86_400_000), None]);
        Ok(())
    }

    #[test]
    fn test_all_missing_column_is_numeric() -> Result<()> {
        let table = text_table(&[("empty", &["", "NA"])]);
        let (_, types) = infer_types(&table)?;
        assert_eq!(types.get("empty"), Some(ColumnKind::Numeric));
        Ok(())
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("-2.5e3"), Some(-2500.0));
    }
}
