//! Rule-based row filtering.
//!
//! A rule file maps column names to either an inclusive numeric range or a
//! list of values to exclude:
//!
//! ```json
//! {
//!     "age": { "range": [0, 120] },
//!     "status": { "exclude": ["test", "void"] }
//! }
//! ```
//!
//! Range rules keep nulls; imputation deals with those later. Exclusions on
//! numeric and datetime columns match by value, so `"10"` excludes a stored
//! `10.0`.

use super::frame::{datetime_values, f64_values, filter_rows, str_values};
use super::inference::{parse_datetime, parse_number};
use super::types::{ColumnKind, ColumnTypeMap, RuleRecord, Table};
use crate::error::{Result, ResultExt as _, ScourError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowRule {
    Range([f64; 2]),
    Exclude(Vec<String>),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    pub rules: BTreeMap<String, RowRule>,
}

impl RuleSet {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file: {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rows satisfying `rule`, as a keep-mask over the current table.
fn evaluate(table: &Table, types: &ColumnTypeMap, column: &str, rule: &RowRule) -> Result<Vec<bool>> {
    let kind = types
        .get(column)
        .ok_or_else(|| ScourError::Config(format!("Rule references unknown column '{column}'")))?;

    match rule {
        RowRule::Range([lo, hi]) => match kind {
            ColumnKind::Numeric => Ok(f64_values(&table.df, column)?
                .into_iter()
                .map(|v| v.is_none_or(|x| (*lo..=*hi).contains(&x)))
                .collect()),
            ColumnKind::Datetime | ColumnKind::Categorical => Err(ScourError::Config(format!(
                "Range rule on '{column}' needs a numeric column, found {}",
                kind.as_str()
            ))),
        },
        RowRule::Exclude(values) => match kind {
            // Compare by value so "10" matches a stored 10.0.
            ColumnKind::Numeric => {
                let excluded: Vec<f64> = values.iter().filter_map(|v| parse_number(v.trim())).collect();
                Ok(f64_values(&table.df, column)?
                    .into_iter()
                    .map(|v| v.is_none_or(|x| !excluded.contains(&x)))
                    .collect())
            }
            ColumnKind::Datetime => {
                let excluded: Vec<i64> = values.iter().filter_map(|v| parse_datetime(v.trim())).collect();
                Ok(datetime_values(&table.df, column)?
                    .into_iter()
                    .map(|v| v.is_none_or(|ms| !excluded.contains(&ms)))
                    .collect())
            }
            ColumnKind::Categorical => Ok(str_values(&table.df, column)?
                .into_iter()
                .map(|v| v.is_none_or(|text| !values.contains(&text)))
                .collect()),
        },
    }
}

/// Apply every rule in column-name order.
pub fn apply_rules(
    table: &Table,
    types: &ColumnTypeMap,
    rules: &RuleSet,
) -> Result<(Table, BTreeMap<String, RuleRecord>)> {
    let mut current = table.clone();
    let mut records = BTreeMap::new();

    for (column, rule) in &rules.rules {
        let keep = evaluate(&current, types, column, rule)?;
        let removed: Vec<usize> = current
            .row_ids
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(id, _)| *id)
            .collect();

        let (df, row_ids) = filter_rows(&current.df, &current.row_ids, &keep)?;
        tracing::debug!(column = %column, removed = removed.len(), "Rule applied");
        records.insert(
            column.clone(),
            RuleRecord {
                removed: removed.len(),
                row_ids: removed,
            },
        );
        current = Table::with_row_ids(df, row_ids);
    }

    tracing::info!(
        rows_before = table.height(),
        rows_after = current.height(),
        "Rule filtering complete"
    );
    Ok((current, records))
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;
    use crate::cleaner::frame::{datetime_column, float_column, string_column};
    use polars::prelude::DataFrame;

    fn sample() -> (Table, ColumnTypeMap) {
        let df = DataFrame::new(vec![
            float_column("age", vec![Some(30.0), Some(-4.0), None, Some(150.0), Some(41.0)]),
            string_column(
                "status",
                vec![
                    Some("ok".to_owned()),
                    Some("ok".to_owned()),
                    Some("test".to_owned()),
                    Some("ok".to_owned()),
                    Some("void".to_owned()),
                ],
            ),
        ])
        .unwrap();
        let types = ColumnTypeMap::from_entries(vec![
            ("age".to_owned(), ColumnKind::Numeric),
            ("status".to_owned(), ColumnKind::Categorical),
        ]);
        (Table::new(df), types)
    }

    #[test]
    fn test_parse_rule_file_shape() {
        let rules: RuleSet = serde_json::from_str(
            r#"{"age": {"range": [0, 120]}, "status": {"exclude": ["test"]}}"#,
        )
        .unwrap();
        assert_eq!(rules.rules.get("age"), Some(&RowRule::Range([0.0, 120.0])));
        assert_eq!(
            rules.rules.get("status"),
            Some(&RowRule::Exclude(vec!["test".to_owned()]))
        );
    }

    #[test]
    fn test_range_keeps_nulls_and_exclude_drops_values() -> Result<()> {
        let (table, types) = sample();
        let mut rules = RuleSet::default();
        rules.rules.insert("age".to_owned(), RowRule::Range([0.0, 120.0]));
        rules
            .rules
            .insert("status".to_owned(), RowRule::Exclude(vec!["void".to_owned()]));

        let (out, records) = apply_rules(&table, &types, &rules)?;
        assert_eq!(out.row_ids, vec![0, 2]);
        assert_eq!(records["age"].row_ids, vec![1, 3]);
        assert_eq!(records["status"].row_ids, vec![4]);
        Ok(())
    }

    #[test]
    fn test_unknown_column_is_config_error() {
        let (table, types) = sample();
        let mut rules = RuleSet::default();
        rules.rules.insert("salary".to_owned(), RowRule::Range([0.0, 1.0]));
        assert!(matches!(
            apply_rules(&table, &types, &rules),
            Err(ScourError::Config(_))
        ));
    }

    #[test]
    fn test_exclude_matches_numbers_and_dates_by_value() -> Result<()> {
        let df = DataFrame::new(vec![
            float_column("qty", vec![Some(10.0), Some(2.5), Some(10.0), None]),
            datetime_column("day", vec![Some(0), Some(86_400_000), Some(0), Some(0)])?,
        ])?;
        let types = ColumnTypeMap::from_entries(vec![
            ("qty".to_owned(), ColumnKind::Numeric),
            ("day".to_owned(), ColumnKind::Datetime),
        ]);
        let rules: RuleSet = serde_json::from_str(
            r#"{"qty": {"exclude": ["10", "n/a"]}, "day": {"exclude": ["1970-01-02"]}}"#,
        )
        .unwrap();

        let (out, records) = apply_rules(&Table::new(df), &types, &rules)?;
        // "day" runs first: row 1 goes. Then "qty" drops the two 10s.
        assert_eq!(records["day"].row_ids, vec![1]);
        assert_eq!(records["qty"].row_ids, vec![0, 2]);
        assert_eq!(out.row_ids, vec![3]);
        Ok(())
    }
}
