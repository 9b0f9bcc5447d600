//! Principal component projection via Jacobi eigen-decomposition of the
//! covariance matrix.

#![expect(clippy::indexing_slicing)] // indices bounded by the matrix dimension

use ndarray::{Array1, Array2, Axis};

const MAX_SWEEPS: usize = 100;
const OFF_DIAGONAL_TOL: f64 = 1e-12;

/// Eigenvalues (descending) and matching eigenvectors as columns.
fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]].powi(2))
            .sum();
        if off < OFF_DIAGONAL_TOL {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                if a[[p, q]].abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + theta.mul_add(theta, 1.0).sqrt());
                let c = 1.0 / t.mul_add(t, 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));
    let values = order.iter().map(|&i| a[[i, i]]).collect();
    let vectors = v.select(Axis(1), &order);
    (values, vectors)
}

/// Project already-standardized `data` onto its first `components`
/// principal axes. `components` is capped at the column count.
pub fn project(data: &Array2<f64>, components: usize) -> Array2<f64> {
    let k = components.min(data.ncols());
    if data.nrows() < 2 || k == 0 {
        return data.clone();
    }

    let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(data.ncols()));
    let centred = data - &mean;
    let covariance = centred.t().dot(&centred) / (data.nrows() - 1) as f64;

    let (values, vectors) = symmetric_eigen(&covariance);
    tracing::debug!(
        components = k,
        leading_variance = values.first().copied().unwrap_or_default(),
        "Principal components computed"
    );
    let basis = vectors.select(Axis(1), &(0..k).collect::<Vec<_>>());
    centred.dot(&basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_eigen_of_diagonal_is_sorted() {
        let m = array![[1.0, 0.0], [0.0, 3.0]];
        let (values, vectors) = symmetric_eigen(&m);
        assert!((values[0] - 3.0).abs() < 1e-9);
        assert!((values[1] - 1.0).abs() < 1e-9);
        assert!((vectors[[1, 0]].abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_eigen_of_correlated_pair() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let (values, vectors) = symmetric_eigen(&m);
        assert!((values[0] - 3.0).abs() < 1e-9);
        assert!((vectors[[0, 0]].abs() - vectors[[1, 0]].abs()).abs() < 1e-9);
    }

    #[test]
    fn test_projection_preserves_distances_with_all_components() {
        let data = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [0.0, -1.0]];
        let projected = project(&data, 5);
        assert_eq!(projected.ncols(), 2);

        let d_orig = (&data.row(0) - &data.row(2)).mapv(|v| v * v).sum();
        let d_proj = (&projected.row(0) - &projected.row(2)).mapv(|v| v * v).sum();
        assert!((d_orig - d_proj).abs() < 1e-9);
    }

    #[test]
    fn test_zero_components_is_identity() {
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(project(&data, 0), data);
    }
}
