//! Column-wise z-score filtering.

use crate::cleaner::frame::{f64_chunked, filter_rows};
use crate::cleaner::stats;
use crate::cleaner::types::{ColumnOutliers, Table};
use crate::config::ZScoreKind;
use crate::error::Result;
use polars::prelude::*;

/// Scales the median absolute deviation to a standard deviation under normality.
const MAD_SCALE: f64 = 1.4826;

/// Centre and scale for one column, or `None` when it has no spread.
fn centre_and_scale(values: &Float64Chunked, kind: ZScoreKind) -> Option<(f64, f64)> {
    let classic = || {
        let sd = values.std(1)?;
        (sd > f64::EPSILON).then_some((values.mean()?, sd))
    };
    match kind {
        ZScoreKind::Robust => {
            let mad = stats::mad(values)?;
            if mad > f64::EPSILON {
                Some((values.median()?, MAD_SCALE * mad))
            } else {
                classic()
            }
        }
        ZScoreKind::Classic => classic(),
    }
}

/// Drop rows whose |z| in `column` exceeds `threshold`.
pub fn filter_column(
    table: &Table,
    column: &str,
    threshold: f64,
    kind: ZScoreKind,
) -> Result<(Table, ColumnOutliers)> {
    let values = f64_chunked(&table.df, column)?;
    let Some((centre, scale)) = centre_and_scale(&values, kind) else {
        tracing::debug!(column, "No spread; z-score filter skipped");
        return Ok((table.clone(), ColumnOutliers::default()));
    };

    let keep: Vec<bool> = values
        .into_iter()
        .map(|v| v.is_none_or(|x| ((x - centre) / scale).abs() <= threshold))
        .collect();
    let row_ids: Vec<usize> = table
        .row_ids
        .iter()
        .zip(&keep)
        .filter(|(_, k)| !**k)
        .map(|(id, _)| *id)
        .collect();

    let (df, ids) = filter_rows(&table.df, &table.row_ids, &keep)?;
    Ok((
        Table::with_row_ids(df, ids),
        ColumnOutliers {
            count: row_ids.len(),
            row_ids,
        },
    ))
}
