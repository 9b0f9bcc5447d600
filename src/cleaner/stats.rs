//! Statistics polars has no direct aggregate for, over the observed
//! (non-null) values of a `Float64` column.
//!
//! Plain aggregates (mean, std, min, max, median) are read straight off the
//! `ChunkedArray` by the callers.

use crate::error::Result;
use polars::prelude::*;

/// Linear-interpolated quantile; `None` for an empty column.
pub fn quantile(ca: &Float64Chunked, q: f64) -> Option<f64> {
    ca.quantile(q, QuantileMethod::Linear).unwrap_or(None)
}

/// Fisher-Pearson coefficient of skewness (biased estimator, m3 / m2^1.5).
///
/// Zero-variance input has no asymmetry and returns `Some(0.0)`.
pub fn skewness(ca: &Float64Chunked) -> Option<f64> {
    let mean = ca.mean()?;
    let n = (ca.len() - ca.null_count()) as f64;
    let (m2, m3) = ca.into_iter().flatten().fold((0.0, 0.0), |(m2, m3), v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    let (m2, m3) = (m2 / n, m3 / n);
    if m2 <= f64::EPSILON {
        return Some(0.0);
    }
    Some(m3 / m2.powf(1.5))
}

/// Median absolute deviation from the median.
pub fn mad(ca: &Float64Chunked) -> Option<f64> {
    let median = ca.median()?;
    ca.apply_values(|v| (v - median).abs()).median()
}

/// Pearson correlation over rows where both values are present. `None`
/// when fewer than two rows overlap or either side is constant.
pub fn pearson(x: &Float64Chunked, y: &Float64Chunked) -> Result<Option<f64>> {
    let both = &x.is_not_null() & &y.is_not_null();
    let (x, y) = (x.filter(&both)?, y.filter(&both)?);
    if x.len() < 2 {
        return Ok(None);
    }
    Ok(cov::pearson_corr(&x, &y).filter(|r| r.is_finite()))
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;

    fn chunked(values: &[Option<f64>]) -> Float64Chunked {
        Float64Chunked::from_iter_options("x".into(), values.iter().copied())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_quantiles_interpolate() {
        let ca = chunked(&[Some(4.0), Some(1.0), None, Some(3.0), Some(2.0)]);
        assert!(close(quantile(&ca, 0.5).unwrap(), 2.5));
        assert!(close(quantile(&ca, 0.25).unwrap(), 1.75));
        assert!(close(quantile(&ca, 1.0).unwrap(), 4.0));
        assert_eq!(quantile(&chunked(&[None, None]), 0.5), None);
    }

    #[test]
    fn test_skewness_matches_biased_estimator() {
        let ca = chunked(&[Some(1.0), Some(2.0), Some(3.0), None, Some(4.0), Some(6.0)]);
        let s = skewness(&ca).unwrap();
        assert!((s - 0.395_870).abs() < 1e-4, "skewness was {s}");
        assert_eq!(skewness(&chunked(&[Some(5.0); 3])), Some(0.0));
        assert_eq!(skewness(&chunked(&[None])), None);
    }

    #[test]
    fn test_mad() {
        let ca = chunked(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)]);
        assert!(close(mad(&ca).unwrap(), 1.0));
    }

    #[test]
    fn test_pearson_pairwise_complete() -> Result<()> {
        let x = chunked(&[Some(1.0), Some(2.0), None, Some(4.0)]);
        let y = chunked(&[Some(2.0), Some(4.0), Some(100.0), Some(8.0)]);
        assert!(close(pearson(&x, &y)?.unwrap(), 1.0));

        let inverse = chunked(&[Some(4.0), Some(3.0), Some(2.0), Some(1.0)]);
        let rising = chunked(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        assert!(close(pearson(&inverse, &rising)?.unwrap(), -1.0));

        let constant = chunked(&[Some(1.0); 4]);
        assert_eq!(pearson(&constant, &y)?, None);
        Ok(())
    }
}
