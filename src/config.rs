//! Tunable thresholds for a pipeline run.
//!
//! Every field has a default, so a JSON config file only needs the keys it
//! overrides:
//!
//! ```
//! use scour::config::{OutlierMethod, PipelineConfig};
//!
//! let config = PipelineConfig::from_json(r#"{ "outlierMethod": "density" }"#).unwrap();
//! assert_eq!(config.outlier_method, OutlierMethod::Density);
//! assert_eq!(config.zscore_threshold, 3.0);
//! ```

use crate::cleaner::rules::RuleSet;
use crate::error::{Result, ResultExt as _, ScourError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable consulted by the CLI for a config file path.
pub const CONFIG_ENV_VAR: &str = "SCOUR_CONFIG";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Per-column z-scores, applied column by column.
    #[default]
    ZScore,
    /// Standardize, project with PCA, drop DBSCAN noise points.
    Density,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZScore => "zscore",
            Self::Density => "density",
        }
    }
}

impl std::str::FromStr for OutlierMethod {
    type Err = ScourError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "zscore" | "z-score" => Ok(Self::ZScore),
            "density" | "dbscan" => Ok(Self::Density),
            other => Err(ScourError::Config(format!("Unknown outlier method: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZScoreKind {
    /// Median and scaled MAD; stays meaningful on small tables.
    #[default]
    Robust,
    /// Mean and sample standard deviation.
    Classic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighMissingStrategy {
    #[default]
    Knn,
    Iterative,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Missing ratio (0..=1) at which numeric columns go to the multivariate imputer.
    pub high_missing_threshold: f64,
    /// |skewness| above which low-missing numeric columns use the median.
    pub skewness_bound: f64,
    pub high_missing_strategy: HighMissingStrategy,
    pub knn_neighbors: usize,
    pub iterative_max_iter: usize,
    pub outlier_method: OutlierMethod,
    pub zscore_threshold: f64,
    pub zscore_kind: ZScoreKind,
    pub density_eps: f64,
    pub density_min_samples: usize,
    /// Principal components for the density method; 0 clusters the standardized data directly.
    pub pca_components: usize,
    pub correlation_filter: bool,
    pub correlation_threshold: f64,
    pub apply_transform: bool,
    pub rules: Option<RuleSet>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            high_missing_threshold: 0.05,
            skewness_bound: 0.5,
            high_missing_strategy: HighMissingStrategy::Knn,
            knn_neighbors: 5,
            iterative_max_iter: 10,
            outlier_method: OutlierMethod::ZScore,
            zscore_threshold: 3.0,
            zscore_kind: ZScoreKind::Robust,
            density_eps: 0.5,
            density_min_samples: 5,
            pca_components: 2,
            correlation_filter: false,
            correlation_threshold: -1.0,
            apply_transform: true,
            rules: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ScourError::Config(msg.to_owned()));

        if !(0.0..=1.0).contains(&self.high_missing_threshold) {
            return invalid("highMissingThreshold must be within 0..=1");
        }
        if !self.skewness_bound.is_finite() || self.skewness_bound < 0.0 {
            return invalid("skewnessBound must be a non-negative number");
        }
        if !self.zscore_threshold.is_finite() || self.zscore_threshold <= 0.0 {
            return invalid("zscoreThreshold must be positive");
        }
        if !self.density_eps.is_finite() || self.density_eps <= 0.0 {
            return invalid("densityEps must be positive");
        }
        if self.density_min_samples == 0 {
            return invalid("densityMinSamples must be at least 1");
        }
        if self.knn_neighbors == 0 {
            return invalid("knnNeighbors must be at least 1");
        }
        if self.iterative_max_iter == 0 {
            return invalid("iterativeMaxIter must be at least 1");
        }
        if !self.correlation_threshold.is_finite() {
            return invalid("correlationThreshold must be a finite number");
        }
        Ok(())
    }
}
