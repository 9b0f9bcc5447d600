//! Profiling report assembled at the end of a run.

use super::frame::{f64_chunked, str_values};
use super::stats;
use super::types::{
    ColumnDiagnostic, ColumnKind, ColumnTypeMap, CorrelationRecord, DatasetShape, DuplicateRecord,
    MissingnessRecord, OutlierRecord, RuleRecord, Table,
};
use crate::config::PipelineConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalStats {
    pub min: Option<String>,
    pub max: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnStats {
    Numeric(NumericStats),
    Categorical(BTreeMap<String, usize>),
    Temporal(TemporalStats),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null: usize,
    pub unique: usize,
    pub stats: ColumnStats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfilingReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub config: PipelineConfig,
    pub original_shape: DatasetShape,
    pub cleaned_shape: DatasetShape,
    pub transformed_shape: Option<DatasetShape>,
    pub duplicates: DuplicateRecord,
    pub rules: BTreeMap<String, RuleRecord>,
    pub correlation: Option<CorrelationRecord>,
    pub missing_values: BTreeMap<String, MissingnessRecord>,
    pub imputation: Vec<ColumnDiagnostic>,
    pub outliers: Option<OutlierRecord>,
    pub columns: Vec<ColumnProfile>,
    pub warnings: Vec<String>,
}

impl ProfilingReport {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn format_millis(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339())
}

/// Non-null and distinct non-null value counts.
fn observed_counts(table: &Table, name: &str) -> Result<(usize, usize)> {
    let column = table.df.column(name)?;
    let non_null = column.len() - column.null_count();
    let distinct = column.as_materialized_series().drop_nulls().n_unique()?;
    Ok((non_null, distinct))
}

fn profile_column(table: &Table, name: &str, kind: ColumnKind) -> Result<ColumnProfile> {
    let (non_null, unique, stats) = match kind {
        ColumnKind::Numeric => {
            let values = f64_chunked(&table.df, name)?;
            let numeric = NumericStats {
                mean: values.mean(),
                std_dev: values.std(1),
                min: values.min(),
                q1: stats::quantile(&values, 0.25),
                median: values.median(),
                q3: stats::quantile(&values, 0.75),
                max: values.max(),
            };
            let (non_null, unique) = observed_counts(table, name)?;
            (non_null, unique, ColumnStats::Numeric(numeric))
        }
        ColumnKind::Datetime => {
            let series = table.df.column(name)?.as_materialized_series();
            let millis = series.cast(&DataType::Int64)?;
            let millis = millis.i64()?;
            let temporal = TemporalStats {
                min: millis.min().and_then(format_millis),
                max: millis.max().and_then(format_millis),
            };
            let (non_null, unique) = observed_counts(table, name)?;
            (non_null, unique, ColumnStats::Temporal(temporal))
        }
        ColumnKind::Categorical => {
            let mut frequencies = BTreeMap::new();
            for value in str_values(&table.df, name)?.into_iter().flatten() {
                *frequencies.entry(value).or_insert(0) += 1;
            }
            let non_null = frequencies.values().sum();
            (non_null, frequencies.len(), ColumnStats::Categorical(frequencies))
        }
    };

    Ok(ColumnProfile {
        name: name.to_owned(),
        kind,
        non_null,
        unique,
        stats,
    })
}

/// Per-column statistics for every column in `types` present in `table`.
pub fn profile_columns(table: &Table, types: &ColumnTypeMap) -> Result<Vec<ColumnProfile>> {
    types
        .retain_present(table)
        .iter()
        .map(|(name, kind)| profile_column(table, name, kind))
        .collect()
}
