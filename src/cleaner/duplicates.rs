//! Exact-duplicate row elimination.
//!
//! Each row is reduced to a SHA-256 digest over the canonical string form of
//! its cells. Rows sharing a digest are duplicates; the first occurrence in
//! row order is kept.

use super::frame::{filter_rows, str_values};
use super::types::{DuplicateRecord, Table};
use crate::error::Result;
use sha2::{Digest as _, Sha256};
use std::collections::HashMap;

/// Separates cells inside the hashed row string so `("ab", "c")` and
/// `("a", "bc")` never collide.
const CELL_SEPARATOR: u8 = 0x1f;
const NULL_MARKER: &[u8] = b"\x00null";

/// SHA-256 digest per row, in row order.
pub fn row_digests(table: &Table) -> Result<Vec<[u8; 32]>> {
    let rendered: Vec<Vec<Option<String>>> = table
        .column_names()
        .iter()
        .map(|name| str_values(&table.df, name))
        .collect::<Result<_>>()?;

    let digests: Vec<[u8; 32]> = (0..table.height())
        .map(|row| {
            let mut hasher = Sha256::new();
            for column in &rendered {
                match column.get(row).and_then(Option::as_deref) {
                    Some(text) => hasher.update(text.as_bytes()),
                    None => hasher.update(NULL_MARKER),
                }
                hasher.update([CELL_SEPARATOR]);
            }
            let digest: [u8; 32] = hasher.finalize().into();
            digest
        })
        .collect();
    Ok(digests)
}

/// Drop every row identical to an earlier one.
pub fn remove_duplicates(table: &Table) -> Result<(Table, DuplicateRecord)> {
    let digests = row_digests(table)?;
    let mut first_seen: HashMap<[u8; 32], usize> = HashMap::with_capacity(digests.len());
    let mut keep = Vec::with_capacity(digests.len());
    let mut record = DuplicateRecord::default();

    for (pos, digest) in digests.into_iter().enumerate() {
        let row_id = table.row_ids.get(pos).copied().unwrap_or(pos);
        match first_seen.get(&digest) {
            Some(&first) => {
                keep.push(false);
                record.row_ids.push(row_id);
                record.pairs.push((row_id, first));
            }
            None => {
                first_seen.insert(digest, row_id);
                keep.push(true);
            }
        }
    }
    record.count = record.row_ids.len();

    let (df, row_ids) = filter_rows(&table.df, &table.row_ids, &keep)?;
    tracing::info!(
        rows_before = table.height(),
        rows_after = df.height(),
        duplicates = record.count,
        "Duplicate removal complete"
    );
    Ok((Table::with_row_ids(df, row_ids), record))
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;
    use crate::cleaner::frame::{f64_values, float_column, string_column};
    use polars::prelude::DataFrame;

    fn table(xs: &[f64], labels: &[&str]) -> Table {
        let df = DataFrame::new(vec![
            float_column("x", xs.iter().map(|v| Some(*v)).collect()),
            string_column("label", labels.iter().map(|v| Some((*v).to_owned())).collect()),
        ])
        .unwrap();
        Table::new(df)
    }

    #[test]
    fn test_second_and_fourth_row_identical() -> Result<()> {
        // Rows are 1-based in prose: row 2 is index 1, row 4 is index 3.
        let t = table(&[1.0, 2.0, 3.0, 2.0, 5.0], &["a", "b", "c", "b", "e"]);
        let (out, record) = remove_duplicates(&t)?;

        assert_eq!(out.height(), 4);
        assert_eq!(record.count, 1);
        assert_eq!(record.row_ids, vec![3]);
        assert_eq!(record.pairs, vec![(3, 1)]);
        assert_eq!(out.row_ids, vec![0, 1, 2, 4]);
        assert_eq!(
            f64_values(&out.df, "x")?,
            vec![Some(1.0), Some(2.0), Some(3.0), Some(5.0)]
        );
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<()> {
        let t = table(&[1.0, 1.0, 1.0, 2.0], &["a", "a", "a", "a"]);
        let (once, first) = remove_duplicates(&t)?;
        let (twice, second) = remove_duplicates(&once)?;

        assert_eq!(first.count, 2);
        assert_eq!(second.count, 0);
        assert_eq!(once.row_ids, twice.row_ids);
        assert!(once.df.equals_missing(&twice.df));
        Ok(())
    }

    #[test]
    fn test_nulls_and_separators_do_not_collide() -> Result<()> {
        let df = DataFrame::new(vec![
            string_column("a", vec![Some("ab".to_owned()), Some("a".to_owned()), None]),
            string_column("b", vec![Some("c".to_owned()), Some("bc".to_owned()), Some(String::new())]),
        ])?;
        let (out, record) = remove_duplicates(&Table::new(df))?;
        assert_eq!(record.count, 0);
        assert_eq!(out.height(), 3);
        Ok(())
    }
}
