//! Missing-value imputation.
//!
//! Each column is handled according to its [`ColumnKind`]:
//!
//! - Datetime: forward fill, then back fill for leading gaps.
//! - Categorical: most frequent value.
//! - Numeric with a missing ratio at or above the configured threshold: a
//!   [`MultivariateImputer`] fills all such columns jointly.
//! - Other numeric columns: median when the observed values are skewed,
//!   mean otherwise.
//!
//! Every decision reads the table as it was on entry, so the order columns
//! are visited in never changes the result. Problems with one column are
//! recorded as a [`ColumnDiagnostic`] and never abort the stage.

mod iterative;
mod knn;

pub use iterative::IterativeImputer;
pub use knn::KnnImputer;

use super::frame::{f64_chunked, f64_values, float_column};
use super::stats;
use super::types::{ColumnDiagnostic, ColumnKind, ColumnTypeMap, ImputeStrategy, MissingnessRecord, Table};
use crate::config::{HighMissingStrategy, PipelineConfig};
use crate::error::{Result, ScourError};
use ndarray::Array2;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Fills the `NaN` cells of selected matrix columns using the other columns.
pub trait MultivariateImputer: Send + Sync {
    fn strategy(&self) -> ImputeStrategy;

    /// Return a copy of `data` where every `NaN` in the `targets` columns is
    /// replaced. Other columns are returned unchanged.
    fn impute(&self, data: &Array2<f64>, targets: &[usize]) -> Result<Array2<f64>>;
}

fn multivariate_imputer(config: &PipelineConfig) -> Box<dyn MultivariateImputer> {
    match config.high_missing_strategy {
        HighMissingStrategy::Knn => Box::new(KnnImputer::new(config.knn_neighbors)),
        HighMissingStrategy::Iterative => Box::new(IterativeImputer::new(config.iterative_max_iter)),
    }
}

/// Everything the imputer learned about the table.
#[derive(Clone, Debug, Default)]
pub struct ImputationSummary {
    pub missingness: BTreeMap<String, MissingnessRecord>,
    pub diagnostics: Vec<ColumnDiagnostic>,
}

/// Per-column missing counts, ratios and row ids.
pub fn missingness(table: &Table) -> Result<BTreeMap<String, MissingnessRecord>> {
    let height = table.height();
    let mut records = BTreeMap::new();
    for name in table.column_names() {
        let validity = table.df.column(&name)?.is_null();
        let row_ids: Vec<usize> = validity
            .into_iter()
            .zip(&table.row_ids)
            .filter(|(null, _)| null.unwrap_or(false))
            .map(|(_, id)| *id)
            .collect();
        let count = row_ids.len();
        let ratio = if height == 0 { 0.0 } else { count as f64 / height as f64 };
        records.insert(name, MissingnessRecord { count, ratio, row_ids });
    }
    Ok(records)
}

fn all_missing(column: &str) -> ColumnDiagnostic {
    let err = ScourError::AllMissingColumn(column.to_owned());
    tracing::warn!(column, "{err}; imputation skipped");
    ColumnDiagnostic::Skipped {
        column: column.to_owned(),
        reason: err.to_string(),
    }
}

fn failed(column: &str, err: &ScourError) -> ColumnDiagnostic {
    tracing::warn!(column, error = %err, "Imputation failed; column left unmodified");
    ColumnDiagnostic::Failed {
        column: column.to_owned(),
        reason: err.to_string(),
    }
}

fn imputed(column: &str, strategy: ImputeStrategy, filled: usize) -> ColumnDiagnostic {
    tracing::debug!(column, strategy = strategy.as_str(), filled, "Column imputed");
    ColumnDiagnostic::Imputed {
        column: column.to_owned(),
        strategy,
        filled,
    }
}

/// Evaluate a fill expression over `df` into a column named `name`.
fn fill_with(df: &DataFrame, name: &str, expr: Expr) -> Result<Column> {
    let filled = df.clone().lazy().select([expr.alias(name)]).collect()?;
    Ok(filled.column(name)?.clone())
}

fn fill_datetime(name: &str, df: &DataFrame) -> Result<Option<Column>> {
    let series = df.column(name)?.as_materialized_series();
    if series.null_count() == series.len() {
        return Ok(None);
    }
    let filled = series
        .fill_null(FillNullStrategy::Forward(None))?
        .fill_null(FillNullStrategy::Backward(None))?;
    Ok(Some(Column::from(filled)))
}

/// Most frequent value; ties go to the lexicographically smallest.
fn fill_categorical(name: &str, df: &DataFrame) -> Result<Option<Column>> {
    if df.column(name)?.null_count() == df.height() {
        return Ok(None);
    }
    let mode = col(name)
        .drop_nulls()
        .mode()
        .sort(SortOptions::default())
        .first();
    Ok(Some(fill_with(df, name, col(name).fill_null(mode))?))
}

/// Mean or median fill, chosen by skewness.
fn fill_univariate(
    name: &str,
    df: &DataFrame,
    skewness_bound: f64,
) -> Result<Option<(Column, ImputeStrategy)>> {
    let values = f64_chunked(df, name)?;
    let Some(skew) = stats::skewness(&values) else {
        return Ok(None);
    };

    let (fill, strategy) = if skew.abs() > skewness_bound {
        (col(name).median(), ImputeStrategy::Median)
    } else {
        (col(name).mean(), ImputeStrategy::Mean)
    };
    tracing::debug!(column = name, skew, strategy = strategy.as_str(), "Univariate fill");
    Ok(Some((fill_with(df, name, col(name).fill_null(fill))?, strategy)))
}

/// Numeric columns as a matrix with `NaN` for missing cells.
fn numeric_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut data = Array2::from_elem((df.height(), columns.len()), f64::NAN);
    for (j, name) in columns.iter().enumerate() {
        let values = f64_values(df, name)?;
        for (cell, value) in data.column_mut(j).iter_mut().zip(values) {
            *cell = value.unwrap_or(f64::NAN);
        }
    }
    Ok(data)
}

/// Jointly impute the high-missing numeric columns. Predictors are every
/// numeric column with at least one observed value.
fn fill_multivariate(
    df: &DataFrame,
    usable: &[String],
    targets: &[String],
    imputer: &dyn MultivariateImputer,
) -> Result<Vec<Column>> {
    let data = numeric_matrix(df, usable)?;
    let target_idx: Vec<usize> = targets
        .iter()
        .filter_map(|t| usable.iter().position(|u| u == t))
        .collect();
    let filled = imputer.impute(&data, &target_idx)?;

    target_idx
        .iter()
        .map(|&j| {
            let values = filled.column(j).iter().map(|v| v.is_finite().then_some(*v)).collect();
            let name = usable.get(j).map(String::as_str).unwrap_or_default();
            Ok(float_column(name, values))
        })
        .collect()
}

/// Fill missing values column by column.
pub fn impute_missing(
    table: &Table,
    types: &ColumnTypeMap,
    config: &PipelineConfig,
) -> Result<(Table, ImputationSummary)> {
    impute_missing_with(table, types, config, multivariate_imputer(config).as_ref())
}

/// [`impute_missing`] with an explicit imputer for the high-missing columns.
pub fn impute_missing_with(
    table: &Table,
    types: &ColumnTypeMap,
    config: &PipelineConfig,
    imputer: &dyn MultivariateImputer,
) -> Result<(Table, ImputationSummary)> {
    let records = missingness(table)?;
    let df = &table.df;
    let mut diagnostics = Vec::new();
    let mut replacements: Vec<Column> = Vec::new();

    let mut usable = Vec::new();
    let mut high_missing = Vec::new();

    for (name, kind) in types.iter() {
        let Some(record) = records.get(name) else {
            continue;
        };
        let entirely_missing = record.count == table.height() && record.count > 0;
        match kind {
            ColumnKind::Numeric => {
                if !entirely_missing {
                    usable.push(name.to_owned());
                }
                if record.count == 0 {
                    continue;
                }
                if entirely_missing {
                    diagnostics.push(all_missing(name));
                } else if record.ratio >= config.high_missing_threshold {
                    high_missing.push(name.to_owned());
                } else {
                    match fill_univariate(name, df, config.skewness_bound) {
                        Ok(Some((column, strategy))) => {
                            diagnostics.push(imputed(name, strategy, record.count));
                            replacements.push(column);
                        }
                        Ok(None) => diagnostics.push(all_missing(name)),
                        Err(err) => diagnostics.push(failed(name, &err)),
                    }
                }
            }
            ColumnKind::Datetime => {
                if record.count == 0 {
                    continue;
                }
                match fill_datetime(name, df) {
                    Ok(Some(column)) => {
                        diagnostics.push(imputed(name, ImputeStrategy::ForwardBackFill, record.count));
                        replacements.push(column);
                    }
                    Ok(None) => diagnostics.push(all_missing(name)),
                    Err(err) => diagnostics.push(failed(name, &err)),
                }
            }
            ColumnKind::Categorical => {
                if record.count == 0 {
                    continue;
                }
                match fill_categorical(name, df) {
                    Ok(Some(column)) => {
                        diagnostics.push(imputed(name, ImputeStrategy::Mode, record.count));
                        replacements.push(column);
                    }
                    Ok(None) => diagnostics.push(all_missing(name)),
                    Err(err) => diagnostics.push(failed(name, &err)),
                }
            }
        }
    }

    if !high_missing.is_empty() {
        match fill_multivariate(df, &usable, &high_missing, imputer) {
            Ok(columns) => {
                for column in columns {
                    let name = column.name().to_string();
                    let filled = records.get(&name).map_or(0, |r| r.count);
                    diagnostics.push(imputed(&name, imputer.strategy(), filled));
                    replacements.push(column);
                }
            }
            Err(err) => {
                for name in &high_missing {
                    diagnostics.push(failed(name, &err));
                }
            }
        }
    }

    let mut out = df.clone();
    for column in replacements {
        out.with_column(column)?;
    }

    tracing::info!(
        imputed = diagnostics
            .iter()
            .filter(|d| matches!(d, ColumnDiagnostic::Imputed { .. }))
            .count(),
        skipped = diagnostics.iter().filter(|d| d.is_skipped()).count(),
        "Imputation complete"
    );

    Ok((
        Table::with_row_ids(out, table.row_ids.clone()),
        ImputationSummary {
            missingness: records,
            diagnostics,
        },
    ))
}
