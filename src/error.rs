//! Centralized error handling for the cleaning pipeline.
//!
//! Every fallible library operation returns [`Result<T>`], an alias over
//! [`ScourError`]. The variants mirror how failures propagate through a run:
//!
//! - Loader and type-inference failures ([`ScourError::NotFound`],
//!   [`ScourError::UnsupportedFormat`], [`ScourError::Load`]) abort the run.
//! - [`ScourError::InsufficientColumns`] is raised by stages that need more
//!   columns than the table offers.
//! - [`ScourError::AllMissingColumn`] is warning-level. It is carried inside
//!   imputation diagnostics and never aborts a run on its own.
//! - [`ScourError::StageFailure`] wraps anything unexpected raised inside a
//!   stage, naming the stage.
//!
//! ```
//! use scour::error::ScourError;
//!
//! fn describe(err: &ScourError) -> &'static str {
//!     match err {
//!         ScourError::NotFound(_) => "missing input",
//!         ScourError::UnsupportedFormat(_) => "unknown extension",
//!         _ => "other",
//!     }
//! }
//! ```
//!
//! The `ResultExt` trait adds `.context()` to any `Result` whose error converts
//! into [`ScourError`]:
//!
//! ```no_run
//! use scour::error::ResultExt as _;
//!
//! fn read_rules() -> scour::error::Result<String> {
//!     std::fs::read_to_string("rules.json").context("Failed to read rule file")
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Main error type for pipeline operations.
#[derive(Debug)]
pub enum ScourError {
    /// I/O errors outside of dataset loading (artifacts, config files).
    Io(std::io::Error),

    /// Input path does not resolve.
    NotFound(PathBuf),

    /// Input extension is not a supported dataset format.
    UnsupportedFormat(String),

    /// Malformed dataset content.
    Load(String),

    /// A stage needs more columns than the table provides.
    InsufficientColumns { required: usize, found: usize },

    /// Column has no observed values; imputation skipped.
    AllMissingColumn(String),

    /// Unexpected failure inside a single stage.
    StageFailure { stage: String, message: String },

    /// Invalid configuration or rule file.
    Config(String),

    /// Dataframe-level failure (polars, casting, shape mismatch).
    DataProcessing(String),

    /// Generic error with context.
    Other(String),
}

impl ScourError {
    /// Wrap any error raised inside `stage` unless it already carries a
    /// specific kind worth surfacing as-is.
    pub fn in_stage(self, stage: &str) -> Self {
        match self {
            Self::DataProcessing(message) | Self::Other(message) => Self::StageFailure {
                stage: stage.to_owned(),
                message,
            },
            Self::Io(err) => Self::StageFailure {
                stage: stage.to_owned(),
                message: err.to_string(),
            },
            other => other,
        }
    }

    /// Whether this error only warrants a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::AllMissingColumn(_))
    }
}

impl fmt::Display for ScourError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::NotFound(path) => write!(f, "File not found: {}", path.display()),
            Self::UnsupportedFormat(ext) => write!(f, "Unsupported file format: {ext}"),
            Self::Load(msg) => write!(f, "Failed to load dataset: {msg}"),
            Self::InsufficientColumns { required, found } => write!(
                f,
                "Insufficient columns: need at least {required} numeric columns, found {found}"
            ),
            Self::AllMissingColumn(column) => {
                write!(f, "Column '{column}' has no observed values")
            }
            Self::StageFailure { stage, message } => {
                write!(f, "Stage '{stage}' failed: {message}")
            }
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ScourError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScourError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for ScourError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for ScourError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for ScourError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ScourError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::DataProcessing(format!("Matrix shape error: {err}"))
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ScourError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ScourError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: ScourError = e.into();
            ScourError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: ScourError = e.into();
            ScourError::Other(format!("{}: {}", f(), err))
        })
    }
}
