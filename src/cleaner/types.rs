use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column classification assigned once by type inference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Datetime,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "Numeric",
            Self::Datetime => "Datetime",
            Self::Categorical => "Categorical",
        }
    }
}

/// Column name to kind, in table column order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeMap {
    entries: Vec<(String, ColumnKind)>,
}

impl ColumnTypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<(String, ColumnKind)>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, name: impl Into<String>, kind: ColumnKind) {
        self.entries.push((name.into(), kind));
    }

    pub fn get(&self, name: &str) -> Option<ColumnKind> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.entries.iter().map(|(n, k)| (n.as_str(), *k))
    }

    /// Names of columns tagged `kind`, in column order.
    pub fn columns_of(&self, kind: ColumnKind) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the map restricted to the columns still present in `table`.
    pub fn retain_present(&self, table: &Table) -> Self {
        let names = table.column_names();
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(n, _)| names.contains(n))
                .cloned()
                .collect(),
        }
    }
}

/// In-memory dataset threaded through the stages.
///
/// `row_ids` holds the position each row had in the loaded file, so records
/// produced by later stages still point at original rows after earlier
/// stages dropped some.
#[derive(Clone, Debug)]
pub struct Table {
    pub df: DataFrame,
    pub row_ids: Vec<usize>,
}

impl Table {
    pub fn new(df: DataFrame) -> Self {
        let row_ids = (0..df.height()).collect();
        Self { df, row_ids }
    }

    pub fn with_row_ids(df: DataFrame, row_ids: Vec<usize>) -> Self {
        Self { df, row_ids }
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }

    pub fn shape(&self) -> DatasetShape {
        DatasetShape {
            rows: self.height(),
            columns: self.width(),
            column_names: self.column_names(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetShape {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
}

/// Rows dropped as exact duplicates, captured before removal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub count: usize,
    pub row_ids: Vec<usize>,
    /// `(duplicate, first occurrence)` pairs of original row ids.
    pub pairs: Vec<(usize, usize)>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingnessRecord {
    pub count: usize,
    pub ratio: f64,
    pub row_ids: Vec<usize>,
}

/// How a single column's gaps were handled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    ForwardBackFill,
    Mode,
    Mean,
    Median,
    KNearestNeighbors,
    Iterative,
}

impl ImputeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForwardBackFill => "forward/back fill",
            Self::Mode => "mode",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::KNearestNeighbors => "k-nearest neighbors",
            Self::Iterative => "iterative regression",
        }
    }
}

/// Per-column imputation result, collected instead of swallowed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ColumnDiagnostic {
    Imputed {
        column: String,
        strategy: ImputeStrategy,
        filled: usize,
    },
    Skipped {
        column: String,
        reason: String,
    },
    Failed {
        column: String,
        reason: String,
    },
}

impl ColumnDiagnostic {
    pub fn column(&self) -> &str {
        match self {
            Self::Imputed { column, .. } | Self::Skipped { column, .. } | Self::Failed { column, .. } => {
                column
            }
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOutliers {
    pub count: usize,
    pub row_ids: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutlierRecord {
    ZScore {
        threshold: f64,
        columns: BTreeMap<String, ColumnOutliers>,
        rows_before: usize,
        rows_after: usize,
    },
    Density {
        eps: f64,
        min_samples: usize,
        components: usize,
        clusters: usize,
        rows_before: usize,
        rows_after: usize,
        removed_row_ids: Vec<usize>,
    },
    Skipped {
        reason: String,
    },
}

impl OutlierRecord {
    pub fn removed(&self) -> usize {
        match self {
            Self::ZScore {
                rows_before,
                rows_after,
                ..
            }
            | Self::Density {
                rows_before,
                rows_after,
                ..
            } => rows_before - rows_after,
            Self::Skipped { .. } => 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub target: String,
    pub threshold: f64,
    /// Signed Pearson r; `None` where it is undefined (constant column, no
    /// overlap).
    pub correlations: BTreeMap<String, Option<f64>>,
    /// |r|, the quantity the z-scores are taken over.
    pub magnitudes: BTreeMap<String, Option<f64>>,
    pub z_scores: BTreeMap<String, Option<f64>>,
    pub dropped: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub removed: usize,
    pub row_ids: Vec<usize>,
}
