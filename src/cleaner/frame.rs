//! Conversions between polars columns and plain Rust vectors.
//!
//! Stages do their arithmetic on `Vec<Option<_>>` and hand the result back as
//! a column of the canonical dtype for its [`ColumnKind`](super::ColumnKind):
//! Numeric → `Float64`, Datetime → `Datetime(ms)`, Categorical → `String`.

use crate::error::Result;
use polars::prelude::*;

pub fn datetime_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

/// A numeric column as `Float64`. Datetime columns come back as epoch
/// milliseconds.
pub fn f64_chunked(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = df.column(name)?.as_materialized_series();
    let casted = match series.dtype() {
        DataType::Datetime(..) => series.cast(&DataType::Int64)?.cast(&DataType::Float64)?,
        _ => series.cast(&DataType::Float64)?,
    };
    Ok(casted.f64()?.clone())
}

/// Values of a numeric (or numeric-castable) column.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(f64_chunked(df, name)?.into_iter().collect())
}

/// Epoch milliseconds of a datetime column.
pub fn datetime_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = df.column(name)?.as_materialized_series();
    let casted = series.cast(&DataType::Int64)?;
    Ok(casted.i64()?.into_iter().collect())
}

pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

pub fn float_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::from(Series::new(name.into(), values))
}

pub fn datetime_column(name: &str, values: Vec<Option<i64>>) -> Result<Column> {
    let series = Series::new(name.into(), values).cast(&datetime_dtype())?;
    Ok(Column::from(series))
}

pub fn string_column(name: &str, values: Vec<Option<String>>) -> Column {
    Column::from(Series::new(name.into(), values))
}

/// Copy of `df` with `column` replacing the same-named column in place.
pub fn replace_column(df: &DataFrame, column: Column) -> Result<DataFrame> {
    let mut out = df.clone();
    out.with_column(column)?;
    Ok(out)
}

/// Keep the rows where `keep` is true. Returns the filtered frame and the
/// matching subset of `row_ids`.
pub fn filter_rows(
    df: &DataFrame,
    row_ids: &[usize],
    keep: &[bool],
) -> Result<(DataFrame, Vec<usize>)> {
    let mask = Series::new("keep".into(), keep);
    let filtered = df.filter(mask.bool()?)?;
    let ids = row_ids
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(id, _)| *id)
        .collect();
    Ok((filtered, ids))
}

pub fn null_count(df: &DataFrame, name: &str) -> Result<usize> {
    Ok(df.column(name)?.null_count())
}

#[cfg(test)]
mod tests {
    #![expect(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_filter_rows_tracks_ids() -> Result<()> {
        let df = DataFrame::new(vec![float_column(
            "x",
            vec![Some(1.0), Some(2.0), Some(3.0)],
        )])?;
        let (out, ids) = filter_rows(&df, &[10, 11, 12], &[true, false, true])?;
        assert_eq!(out.height(), 2);
        assert_eq!(ids, vec![10, 12]);
        assert_eq!(f64_values(&out, "x")?, vec![Some(1.0), Some(3.0)]);
        Ok(())
    }

    #[test]
    fn test_datetime_roundtrip_through_column() -> Result<()> {
        let df = DataFrame::new(vec![datetime_column(
            "when",
            vec![Some(86_400_000), None],
        )?])?;
        assert_eq!(df.column("when")?.dtype(), &datetime_dtype());
        assert_eq!(datetime_values(&df, "when")?, vec![Some(86_400_000), None]);
        Ok(())
    }

    #[test]
    fn test_replace_column_keeps_position() -> Result<()> {
        let df = DataFrame::new(vec![
            float_column("a", vec![Some(1.0)]),
            string_column("b", vec![Some("x".to_owned())]),
        ])?;
        let out = replace_column(&df, float_column("a", vec![Some(5.0)]))?;
        assert_eq!(out.get_column_names()[0].as_str(), "a");
        assert_eq!(f64_values(&out, "a")?, vec![Some(5.0)]);
        assert_eq!(null_count(&out, "b")?, 0);
        Ok(())
    }
}
