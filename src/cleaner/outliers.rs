//! Outlier removal, either column by column with z-scores or in one pass
//! with density clustering.

mod dbscan;
mod pca;
mod zscore;

pub use dbscan::{Clustering, Dbscan};
pub use pca::project;
pub use zscore::filter_column;

use super::frame::{f64_values, filter_rows, null_count};
use super::types::{ColumnKind, ColumnTypeMap, OutlierRecord, Table};
use crate::config::{OutlierMethod, PipelineConfig};
use crate::error::Result;
use ndarray::{Array2, Axis};
use std::collections::BTreeMap;

fn skipped(table: &Table, reason: &str) -> (Table, OutlierRecord) {
    tracing::warn!(reason, "Outlier removal skipped");
    (
        table.clone(),
        OutlierRecord::Skipped {
            reason: reason.to_owned(),
        },
    )
}

/// Each numeric column in table order sees the rows left by the previous one.
fn remove_by_zscore(
    table: &Table,
    numeric: &[String],
    config: &PipelineConfig,
) -> Result<(Table, OutlierRecord)> {
    let mut current = table.clone();
    let mut columns = BTreeMap::new();
    for column in numeric {
        let (next, record) = filter_column(&current, column, config.zscore_threshold, config.zscore_kind)?;
        if record.count > 0 {
            tracing::debug!(column = %column, removed = record.count, "Z-score outliers removed");
        }
        columns.insert(column.clone(), record);
        current = next;
    }

    let record = OutlierRecord::ZScore {
        threshold: config.zscore_threshold,
        columns,
        rows_before: table.height(),
        rows_after: current.height(),
    };
    Ok((current, record))
}

/// Column-standardized matrix of the given complete columns.
fn standardized_matrix(table: &Table, columns: &[String]) -> Result<Array2<f64>> {
    let mut data = Array2::zeros((table.height(), columns.len()));
    for (mut column, name) in data.axis_iter_mut(Axis(1)).zip(columns) {
        let values: Vec<f64> = f64_values(&table.df, name)?.into_iter().flatten().collect();
        for (cell, v) in column.iter_mut().zip(&values) {
            *cell = *v;
        }
    }

    let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| ndarray::Array1::zeros(columns.len()));
    let scale = data.std_axis(Axis(0), 0.0).mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
    Ok((data - &mean) / &scale)
}

fn remove_by_density(
    table: &Table,
    numeric: &[String],
    config: &PipelineConfig,
) -> Result<(Table, OutlierRecord)> {
    let mut complete = Vec::new();
    for name in numeric {
        if null_count(&table.df, name)? == 0 {
            complete.push(name.clone());
        }
    }
    if complete.is_empty() || table.height() == 0 {
        return Ok(skipped(table, "no complete numeric columns for density clustering"));
    }

    let standardized = standardized_matrix(table, &complete)?;
    let components = config.pca_components.min(complete.len());
    let points = if components == 0 {
        standardized
    } else {
        project(&standardized, components)
    };

    let clustering = Dbscan::new(config.density_eps, config.density_min_samples).fit(&points);
    let keep: Vec<bool> = clustering.labels.iter().map(Option::is_some).collect();
    let removed_row_ids: Vec<usize> = clustering
        .noise()
        .filter_map(|i| table.row_ids.get(i).copied())
        .collect();

    let (df, row_ids) = filter_rows(&table.df, &table.row_ids, &keep)?;
    let out = Table::with_row_ids(df, row_ids);
    tracing::debug!(clusters = clustering.clusters, noise = removed_row_ids.len(), "Density clustering done");

    let record = OutlierRecord::Density {
        eps: config.density_eps,
        min_samples: config.density_min_samples,
        components,
        clusters: clustering.clusters,
        rows_before: table.height(),
        rows_after: out.height(),
        removed_row_ids,
    };
    Ok((out, record))
}

/// Remove outlying rows using the configured method.
pub fn remove_outliers(
    table: &Table,
    types: &ColumnTypeMap,
    config: &PipelineConfig,
) -> Result<(Table, OutlierRecord)> {
    let numeric = types.columns_of(ColumnKind::Numeric);
    if numeric.is_empty() {
        return Ok(skipped(table, "no numeric columns"));
    }

    let (out, record) = match config.outlier_method {
        OutlierMethod::ZScore => remove_by_zscore(table, &numeric, config)?,
        OutlierMethod::Density => remove_by_density(table, &numeric, config)?,
    };

    tracing::info!(
        method = config.outlier_method.as_str(),
        rows_before = table.height(),
        rows_after = out.height(),
        "Outlier removal complete"
    );
    Ok((out, record))
}
