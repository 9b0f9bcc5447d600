//! Model-ready feature encoding.
//!
//! Numeric and datetime columns are standardized; categorical columns are
//! replaced by one-hot indicators. The result is purely numeric.

use super::frame::{f64_chunked, f64_values, float_column, str_values};
use super::types::{ColumnKind, ColumnTypeMap, Table};
use crate::error::{Result, ScourError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::BTreeSet;

/// `(x - mean) / std` with population statistics; zero spread scales by 1.
fn standardize(values: &Float64Chunked) -> Column {
    let mean = values.mean().unwrap_or(0.0);
    let scale = values.std(0).filter(|s| *s > f64::EPSILON).unwrap_or(1.0);
    let scaled = values.apply_values(|x| (x - mean) / scale);
    Column::from(scaled.into_series().with_name(values.name().clone()))
}

/// `{column}_{category}`, suffixed with `_1`, `_2`, ... until it is not in
/// `taken`.
fn indicator_name(column: &str, category: &str, taken: &BTreeSet<String>) -> String {
    let base = format!("{column}_{category}");
    if !taken.contains(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Indicator columns for every category but the lexicographically first.
/// Names already in `taken` are not reused; new names are added to it.
fn one_hot(name: &str, values: &[Option<String>], taken: &mut BTreeSet<String>) -> Vec<Column> {
    let categories: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
    categories
        .into_iter()
        .skip(1)
        .map(|category| {
            let indicator = values
                .iter()
                .map(|v| Some(if v.as_deref() == Some(category) { 1.0 } else { 0.0 }))
                .collect();
            let column = indicator_name(name, category, taken);
            if column != format!("{name}_{category}") {
                tracing::warn!(column = name, category, renamed = %column, "Indicator name taken; renamed");
            }
            taken.insert(column.clone());
            float_column(&column, indicator)
        })
        .collect()
}

/// Encode every column; returns the new table and its all-numeric type map.
pub fn transform_features(table: &Table, types: &ColumnTypeMap) -> Result<(Table, ColumnTypeMap)> {
    let mut scaled = Vec::new();
    let mut indicators = Vec::new();
    let mut taken: BTreeSet<String> = types
        .iter()
        .filter(|(_, kind)| *kind != ColumnKind::Categorical)
        .map(|(name, _)| name.to_owned())
        .collect();

    for (name, kind) in types.iter() {
        match kind {
            ColumnKind::Numeric | ColumnKind::Datetime => {
                scaled.push(standardize(&f64_chunked(&table.df, name)?));
            }
            ColumnKind::Categorical => {
                let encoded = one_hot(name, &str_values(&table.df, name)?, &mut taken);
                tracing::debug!(column = name, indicators = encoded.len(), "One-hot encoded");
                indicators.extend(encoded);
            }
        }
    }

    scaled.extend(indicators);
    let mut out_types = ColumnTypeMap::new();
    for column in &scaled {
        out_types.push(column.name().as_str(), ColumnKind::Numeric);
    }

    let df = DataFrame::new(scaled)?;
    tracing::info!(columns_before = table.width(), columns_after = df.width(), "Feature transform complete");
    Ok((Table::with_row_ids(df, table.row_ids.clone()), out_types))
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::UInt64
            | DataType::UInt32
            | DataType::UInt16
            | DataType::UInt8
    )
}

/// Split a transformed table into a feature matrix (all but the last
/// column) and a target vector (the last column).
pub fn feature_target_split(table: &Table) -> Result<(Array2<f64>, Array1<f64>)> {
    let names = table.column_names();
    let Some((target, features)) = names.split_last().filter(|(_, f)| !f.is_empty()) else {
        return Err(ScourError::InsufficientColumns {
            required: 2,
            found: names.len(),
        });
    };

    let dense = |name: &str| -> Result<Vec<f64>> {
        let column = table.df.column(name)?;
        if !is_numeric_dtype(column.dtype()) {
            return Err(ScourError::StageFailure {
                stage: "feature_target_split".to_owned(),
                message: format!("column '{name}' is not numeric"),
            });
        }
        f64_values(&table.df, name)?
            .into_iter()
            .map(|v| {
                v.ok_or_else(|| ScourError::StageFailure {
                    stage: "feature_target_split".to_owned(),
                    message: format!("column '{name}' contains missing values"),
                })
            })
            .collect()
    };

    let mut x = Array2::zeros((table.height(), features.len()));
    for (mut column, name) in x.columns_mut().into_iter().zip(features) {
        for (cell, v) in column.iter_mut().zip(dense(name)?) {
            *cell = v;
        }
    }
    let y = Array1::from(dense(target)?);
    Ok((x, y))
}
