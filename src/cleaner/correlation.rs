//! Drop numeric features weakly correlated with the target column.
//!
//! The target is the last column of the table. The magnitudes |r| of every
//! other numeric column's correlation with it are z-scored against each
//! other; features whose z-score falls at or below the threshold are removed.
//! A strong inverse relationship counts as strong.

use super::frame::f64_chunked;
use super::stats;
use super::types::{ColumnKind, ColumnTypeMap, CorrelationRecord, Table};
use crate::error::{Result, ScourError};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Spread below which all magnitudes count as equal.
const FLAT_SPREAD: f64 = 1e-12;

pub fn drop_weak_correlations(
    table: &Table,
    types: &ColumnTypeMap,
    threshold: f64,
) -> Result<(Table, ColumnTypeMap, CorrelationRecord)> {
    let numeric = types.columns_of(ColumnKind::Numeric);
    if numeric.len() < 2 {
        return Err(ScourError::InsufficientColumns {
            required: 2,
            found: numeric.len(),
        });
    }

    let names = table.column_names();
    let target = names
        .last()
        .cloned()
        .ok_or(ScourError::InsufficientColumns { required: 2, found: 0 })?;
    if types.get(&target) != Some(ColumnKind::Numeric) {
        return Err(ScourError::StageFailure {
            stage: "correlation".to_owned(),
            message: format!("target column '{target}' is not numeric"),
        });
    }

    let target_values = f64_chunked(&table.df, &target)?;
    let mut correlations = BTreeMap::new();
    for column in numeric.iter().filter(|c| **c != target) {
        let values = f64_chunked(&table.df, column)?;
        correlations.insert(column.clone(), stats::pearson(&values, &target_values)?);
    }
    let magnitudes: BTreeMap<String, Option<f64>> = correlations
        .iter()
        .map(|(column, r)| (column.clone(), r.map(f64::abs)))
        .collect();

    let defined = Float64Chunked::from_iter_options(
        "magnitude".into(),
        magnitudes.values().copied(),
    );
    let centre = defined.mean().unwrap_or(0.0);
    let spread = defined.std(0).unwrap_or(0.0);

    let z_scores: BTreeMap<String, Option<f64>> = magnitudes
        .iter()
        .map(|(column, magnitude)| {
            let z = magnitude.map(|m| {
                if spread <= FLAT_SPREAD {
                    0.0
                } else {
                    (m - centre) / spread
                }
            });
            (column.clone(), z)
        })
        .collect();

    // Undefined correlations carry no signal and go too.
    let dropped: Vec<String> = numeric
        .iter()
        .filter(|c| match z_scores.get(*c) {
            Some(Some(z)) => *z <= threshold,
            Some(None) => true,
            None => false,
        })
        .cloned()
        .collect();

    let df = if dropped.is_empty() {
        table.df.clone()
    } else {
        table.df.drop_many(dropped.iter().map(String::as_str))
    };
    let out = Table::with_row_ids(df, table.row_ids.clone());
    let out_types = types.retain_present(&out);

    for column in &dropped {
        tracing::debug!(column = %column, "Dropped weakly correlated column");
    }
    tracing::info!(
        target = %target,
        dropped = dropped.len(),
        columns_after = out.width(),
        "Correlation filter complete"
    );

    Ok((
        out,
        out_types,
        CorrelationRecord {
            target,
            threshold,
            correlations,
            magnitudes,
            z_scores,
            dropped,
        },
    ))
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;
    use crate::cleaner::frame::{float_column, string_column};

    fn build(columns: Vec<(&str, Vec<f64>)>) -> (Table, ColumnTypeMap) {
        let mut types = ColumnTypeMap::new();
        let cols = columns
            .into_iter()
            .map(|(name, values)| {
                types.push(name, ColumnKind::Numeric);
                float_column(name, values.into_iter().map(Some).collect())
            })
            .collect();
        (Table::new(DataFrame::new(cols).unwrap()), types)
    }

    #[test]
    fn test_drops_below_threshold_and_keeps_target() -> Result<()> {
        let (table, types) = build(vec![
            ("strong", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            ("weak", vec![1.0, -1.0, 0.0, -1.0, 1.0]),
            ("inverse", vec![5.0, 4.0, 3.0, 2.0, 1.0]),
            ("target", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        ]);
        let (out, out_types, record) = drop_weak_correlations(&table, &types, -1.0)?;

        assert_eq!(record.target, "target");
        assert_eq!(record.dropped, vec!["weak"]);
        assert_eq!(out.column_names(), vec!["strong", "inverse", "target"]);
        assert_eq!(out_types.len(), 3);
        Ok(())
    }

    #[test]
    fn test_inverse_predictor_scores_by_magnitude() -> Result<()> {
        let (table, types) = build(vec![
            ("pos", vec![1.0, 2.0, 3.0, 4.0, 6.0]),
            ("weak", vec![1.0, -1.0, 0.0, -1.0, 1.0]),
            ("neg", vec![5.0, 4.0, 3.0, 2.0, 1.0]),
            ("target", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        ]);
        let (_, _, record) = drop_weak_correlations(&table, &types, -1.0)?;

        assert!((record.correlations["neg"].unwrap() + 1.0).abs() < 1e-9);
        assert!((record.magnitudes["neg"].unwrap() - 1.0).abs() < 1e-9);
        assert!(record.z_scores["neg"].unwrap() > 0.0);
        assert!(record.z_scores["weak"].unwrap() < -1.0);
        assert_eq!(record.dropped, vec!["weak"]);
        Ok(())
    }

    #[test]
    fn test_equal_correlations_have_zero_z() -> Result<()> {
        let (table, types) = build(vec![
            ("a", vec![1.0, 2.0, 3.0]),
            ("b", vec![2.0, 4.0, 6.0]),
            ("target", vec![3.0, 6.0, 9.0]),
        ]);
        let (out, _, record) = drop_weak_correlations(&table, &types, -1.0)?;
        assert_eq!(record.z_scores["a"], Some(0.0));
        assert_eq!(out.width(), 3);
        Ok(())
    }

    #[test]
    fn test_constant_column_dropped() -> Result<()> {
        let (table, types) = build(vec![
            ("flat", vec![1.0, 1.0, 1.0]),
            ("x", vec![1.0, 2.0, 3.0]),
            ("target", vec![1.0, 2.0, 3.0]),
        ]);
        let (_, _, record) = drop_weak_correlations(&table, &types, -1.0)?;
        assert_eq!(record.correlations["flat"], None);
        assert_eq!(record.dropped, vec!["flat"]);
        Ok(())
    }

    #[test]
    fn test_requires_two_numeric_columns() {
        let (table, types) = build(vec![("only", vec![1.0, 2.0])]);
        assert!(matches!(
            drop_weak_correlations(&table, &types, -1.0),
            Err(ScourError::InsufficientColumns { required: 2, found: 1 })
        ));
    }

    #[test]
    fn test_non_numeric_target_fails() {
        let df = DataFrame::new(vec![
            float_column("a", vec![Some(1.0), Some(2.0)]),
            float_column("b", vec![Some(2.0), Some(1.0)]),
            string_column("label", vec![Some("x".to_owned()), Some("y".to_owned())]),
        ])
        .unwrap();
        let types = ColumnTypeMap::from_entries(vec![
            ("a".to_owned(), ColumnKind::Numeric),
            ("b".to_owned(), ColumnKind::Numeric),
            ("label".to_owned(), ColumnKind::Categorical),
        ]);
        let err = drop_weak_correlations(&Table::new(df), &types, -1.0).unwrap_err();
        assert!(matches!(err, ScourError::StageFailure { .. }));
    }
}
