//! The cleaning pipeline and its stages.
//!
//! Stages run in a fixed order; see [`pipeline::PipelineStage`]. Each one is
//! also usable on its own over a [`Table`] and a [`ColumnTypeMap`].

pub mod correlation;
pub mod duplicates;
pub mod frame;
pub mod imputation;
pub mod inference;
pub mod io;
pub mod outliers;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod stats;
pub mod transform;
pub mod types;

pub use pipeline::{InputSource, Ledger, Pipeline, PipelineOutput, PipelineStage, RunContext};
pub use report::ProfilingReport;
pub use transform::feature_target_split;
pub use types::{ColumnDiagnostic, ColumnKind, ColumnTypeMap, Table};
