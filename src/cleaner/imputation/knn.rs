//! K-nearest-neighbour imputation.

#![expect(clippy::indexing_slicing)] // row/column indices come from the matrix shape

use super::MultivariateImputer;
use crate::cleaner::types::ImputeStrategy;
use crate::error::Result;
use ndarray::{Array1, Array2, Axis};

/// Fills a missing cell with the mean of the `k` closest rows that observe
/// that column.
///
/// Distances are computed on z-scored columns so large-valued columns do not
/// dominate, using only the coordinates both rows observe. Donor values are
/// averaged on the original scale.
#[derive(Clone, Debug)]
pub struct KnnImputer {
    k: usize,
}

impl KnnImputer {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Column means and population standard deviations over observed cells.
/// A column without spread gets scale 1.
fn column_moments(data: &Array2<f64>) -> (Array1<f64>, Array1<f64>) {
    let mut means = Array1::zeros(data.ncols());
    let mut scales = Array1::ones(data.ncols());
    for (j, column) in data.axis_iter(Axis(1)).enumerate() {
        let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
        if observed.is_empty() {
            continue;
        }
        let n = observed.len() as f64;
        let mean = observed.iter().sum::<f64>() / n;
        let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        means[j] = mean;
        if var.sqrt() > f64::EPSILON {
            scales[j] = var.sqrt();
        }
    }
    (means, scales)
}

/// Root mean squared difference over shared observed coordinates, or `None`
/// when the rows share none.
fn distance(a: ndarray::ArrayView1<'_, f64>, b: ndarray::ArrayView1<'_, f64>) -> Option<f64> {
    let mut shared = 0usize;
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        if x.is_nan() || y.is_nan() {
            continue;
        }
        shared += 1;
        sum += (x - y).powi(2);
    }
    (shared > 0).then(|| (sum / shared as f64).sqrt())
}

impl MultivariateImputer for KnnImputer {
    fn strategy(&self) -> ImputeStrategy {
        ImputeStrategy::KNearestNeighbors
    }

    fn impute(&self, data: &Array2<f64>, targets: &[usize]) -> Result<Array2<f64>> {
        let (means, scales) = column_moments(data);
        let scaled = (data - &means) / &scales;
        let mut out = data.clone();

        for &j in targets {
            let donors: Vec<usize> = (0..data.nrows()).filter(|&r| !data[[r, j]].is_nan()).collect();

            for row in 0..data.nrows() {
                if !data[[row, j]].is_nan() {
                    continue;
                }
                let mut nearest: Vec<(f64, usize)> = donors
                    .iter()
                    .filter_map(|&d| distance(scaled.row(row), scaled.row(d)).map(|dist| (dist, d)))
                    .collect();
                nearest.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                nearest.truncate(self.k);

                out[[row, j]] = if nearest.is_empty() {
                    means[j]
                } else {
                    nearest.iter().map(|&(_, d)| data[[d, j]]).sum::<f64>() / nearest.len() as f64
                };
            }
        }
        Ok(out)
    }
}
