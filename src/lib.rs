//! # Scour - tabular data cleaning
//!
//! Scour takes a raw CSV or spreadsheet and produces a model-ready table plus
//! a JSON profiling report describing everything it changed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scour::cleaner::{Pipeline, RunContext};
//! use scour::config::PipelineConfig;
//!
//! # fn example() -> scour::error::Result<()> {
//! let ctx = RunContext::from_path("data.csv").with_output_dir("out");
//! let output = Pipeline::new(PipelineConfig::default()).run(&ctx)?;
//!
//! println!("{} rows left", output.table.height());
//! for warning in &output.report.warnings {
//!     println!("warning: {warning}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Stages
//!
//! 1. Load: every cell read as text
//! 2. Type inference: Numeric, then Datetime, then Categorical
//! 3. Duplicate removal (first occurrence kept)
//! 4. Optional rule filtering and correlation filtering
//! 5. Missing-value imputation
//! 6. Outlier removal (z-score or density clustering)
//! 7. Standardization and one-hot encoding
//! 8. Profiling report
//!
//! ## Core Modules
//!
//! - [`cleaner`]: the stages and the [`cleaner::Pipeline`] that runs them
//! - [`config`]: thresholds and method choices, loadable from JSON
//! - [`error`]: error type shared by every stage
//! - [`logging`]: console and rolling-file `tracing` setup

pub mod cleaner;
pub mod config;
pub mod error;
pub mod logging;
