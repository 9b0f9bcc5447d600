//! Density-based clustering (DBSCAN).
//!
//! A point is a core point when at least `min_samples` points, itself
//! included, lie within `eps` of it. Clusters grow outward from core points;
//! points reachable from no core point are noise.

#![expect(clippy::indexing_slicing)] // point indices bounded by nrows

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

#[derive(Clone, Debug)]
pub struct Dbscan {
    pub eps: f64,
    pub min_samples: usize,
}

/// Cluster assignment per point; `None` is noise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clustering {
    pub labels: Vec<Option<usize>>,
    pub clusters: usize,
}

impl Clustering {
    pub fn noise(&self) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_none())
            .map(|(i, _)| i)
    }
}

fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    fn region_query(&self, x: &Array2<f64>, point: usize) -> Vec<usize> {
        let row = x.row(point);
        (0..x.nrows())
            .filter(|&i| euclidean(row, x.row(i)) <= self.eps)
            .collect()
    }

    pub fn fit(&self, x: &Array2<f64>) -> Clustering {
        let n = x.nrows();
        let neighbors: Vec<Vec<usize>> = (0..n)
            .into_par_iter()
            .map(|i| self.region_query(x, i))
            .collect();
        let is_core: Vec<bool> = neighbors.iter().map(|n| n.len() >= self.min_samples).collect();

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut cluster = 0;

        for start in 0..n {
            if labels[start].is_some() || !is_core[start] {
                continue;
            }
            labels[start] = Some(cluster);
            let mut queue = vec![start];

            // Every queued point is labelled before it is pushed.
            while let Some(q) = queue.pop() {
                if !is_core[q] {
                    continue;
                }
                for &next in &neighbors[q] {
                    if labels[next].is_none() {
                        labels[next] = Some(cluster);
                        queue.push(next);
                    }
                }
            }
            cluster += 1;
        }

        Clustering {
            labels,
            clusters: cluster,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_two_clusters_and_noise() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
            [20.0, 20.0],
        ];
        let result = Dbscan::new(0.5, 3).fit(&x);
        assert_eq!(result.clusters, 2);
        assert_eq!(result.noise().collect::<Vec<_>>(), vec![6]);
        assert_eq!(result.labels[0], result.labels[2]);
        assert_ne!(result.labels[0], result.labels[3]);
    }

    #[test]
    fn test_point_counts_itself() {
        let x = array![[0.0], [0.3]];
        assert_eq!(Dbscan::new(0.5, 2).fit(&x).clusters, 1);
        assert_eq!(Dbscan::new(0.5, 3).fit(&x).noise().count(), 2);
    }
}
