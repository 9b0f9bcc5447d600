//! Runs the cleaning stages in order over one dataset.
//!
//! Each stage takes the current [`Table`] by reference and returns a new one,
//! so a failing stage never leaves a half-modified table behind. What each
//! stage learned is accumulated in a [`Ledger`] that is moved from stage to
//! stage and finally turned into the [`ProfilingReport`].

use super::correlation::drop_weak_correlations;
use super::duplicates::remove_duplicates;
use super::imputation::{impute_missing, ImputationSummary};
use super::inference::infer_types;
use super::io::{artifact_paths, load_table, load_table_from_bytes, save_csv, save_report};
use super::outliers::remove_outliers;
use super::report::{profile_columns, ProfilingReport};
use super::rules::apply_rules;
use super::transform::transform_features;
use super::types::{
    ColumnDiagnostic, ColumnTypeMap, CorrelationRecord, DatasetShape, DuplicateRecord, MissingnessRecord,
    OutlierRecord, RuleRecord, Table,
};
use crate::config::PipelineConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// Stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Load,
    Infer,
    Deduplicate,
    Rules,
    Correlation,
    Impute,
    Outliers,
    Transform,
    Report,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Infer => "infer",
            Self::Deduplicate => "deduplicate",
            Self::Rules => "rules",
            Self::Correlation => "correlation",
            Self::Impute => "impute",
            Self::Outliers => "outliers",
            Self::Transform => "transform",
            Self::Report => "report",
        }
    }

    pub fn next_stage(&self) -> Option<Self> {
        match self {
            Self::Load => Some(Self::Infer),
            Self::Infer => Some(Self::Deduplicate),
            Self::Deduplicate => Some(Self::Rules),
            Self::Rules => Some(Self::Correlation),
            Self::Correlation => Some(Self::Impute),
            Self::Impute => Some(Self::Outliers),
            Self::Outliers => Some(Self::Transform),
            Self::Transform => Some(Self::Report),
            Self::Report => None,
        }
    }
}

/// Where the dataset comes from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Path(PathBuf),
    /// Uploaded content; the file name only selects the format.
    Bytes { data: Vec<u8>, file_name: String },
}

impl InputSource {
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    fn load(&self) -> Result<Table> {
        match self {
            Self::Path(path) => load_table(path),
            Self::Bytes { data, file_name } => load_table_from_bytes(data.clone(), file_name),
        }
    }
}

/// Everything specific to one run. Nothing here outlives the run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub input: InputSource,
    pub output_dir: Option<PathBuf>,
    pub run_id: Uuid,
}

impl RunContext {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            input: InputSource::Path(path.into()),
            output_dir: None,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn from_bytes(data: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            input: InputSource::Bytes {
                data,
                file_name: file_name.into(),
            },
            output_dir: None,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Stage records collected during a run.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub original_shape: DatasetShape,
    pub duplicates: DuplicateRecord,
    pub rules: BTreeMap<String, RuleRecord>,
    pub correlation: Option<CorrelationRecord>,
    pub missing_values: BTreeMap<String, MissingnessRecord>,
    pub imputation: Vec<ColumnDiagnostic>,
    pub outliers: Option<OutlierRecord>,
    pub warnings: Vec<String>,
}

impl Ledger {
    pub fn new(original_shape: DatasetShape) -> Self {
        Self {
            original_shape,
            ..Self::default()
        }
    }

    pub fn with_duplicates(self, duplicates: DuplicateRecord) -> Self {
        Self { duplicates, ..self }
    }

    pub fn with_rules(self, rules: BTreeMap<String, RuleRecord>) -> Self {
        Self { rules, ..self }
    }

    pub fn with_correlation(self, correlation: CorrelationRecord) -> Self {
        Self {
            correlation: Some(correlation),
            ..self
        }
    }

    pub fn with_imputation(mut self, summary: ImputationSummary) -> Self {
        for diagnostic in &summary.diagnostics {
            match diagnostic {
                ColumnDiagnostic::Skipped { column, reason } => {
                    self.warnings.push(format!("{column}: {reason}"));
                }
                ColumnDiagnostic::Failed { column, reason } => {
                    self.warnings.push(format!("{column}: imputation failed: {reason}"));
                }
                ColumnDiagnostic::Imputed { .. } => {}
            }
        }
        Self {
            missing_values: summary.missingness,
            imputation: summary.diagnostics,
            ..self
        }
    }

    pub fn with_outliers(mut self, outliers: OutlierRecord) -> Self {
        if let OutlierRecord::Skipped { reason } = &outliers {
            self.warnings.push(format!("outlier removal skipped: {reason}"));
        }
        Self {
            outliers: Some(outliers),
            ..self
        }
    }

    fn into_report(
        self,
        run_id: Uuid,
        source: String,
        config: &PipelineConfig,
        cleaned: &Table,
        cleaned_types: &ColumnTypeMap,
        transformed_shape: Option<DatasetShape>,
    ) -> Result<ProfilingReport> {
        Ok(ProfilingReport {
            run_id: run_id.to_string(),
            generated_at: chrono::Utc::now(),
            source,
            config: config.clone(),
            original_shape: self.original_shape,
            cleaned_shape: cleaned.shape(),
            transformed_shape,
            duplicates: self.duplicates,
            rules: self.rules,
            correlation: self.correlation,
            missing_values: self.missing_values,
            imputation: self.imputation,
            outliers: self.outliers,
            columns: profile_columns(cleaned, cleaned_types)?,
            warnings: self.warnings,
        })
    }
}

/// Paths written when the run context names an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub data: PathBuf,
    pub report: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The final table: transformed when the transform is enabled, else cleaned.
    pub table: Table,
    pub types: ColumnTypeMap,
    pub report: ProfilingReport,
    pub artifacts: Option<Artifacts>,
}

/// Run `f` as `stage`, timing it and naming the stage in any unexpected error.
fn run_stage<T>(stage: PipelineStage, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let result = f().map_err(|e| e.in_stage(stage.as_str()));
    match &result {
        Ok(_) => tracing::debug!(
            stage = stage.as_str(),
            elapsed_ms = start.elapsed().as_millis(),
            "Stage finished"
        ),
        Err(err) if err.is_warning() => {
            tracing::warn!(stage = stage.as_str(), error = %err, "Stage raised a warning");
        }
        Err(err) => tracing::error!(stage = stage.as_str(), error = %err, "Stage failed"),
    }
    result
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, ctx: &RunContext) -> Result<PipelineOutput> {
        let span = tracing::info_span!("pipeline", run_id = %ctx.run_id);
        let _guard = span.enter();
        let config = &self.config;
        config.validate()?;
        tracing::info!(source = %ctx.input.name(), "Pipeline started");

        let raw = run_stage(PipelineStage::Load, || ctx.input.load())?;
        let ledger = Ledger::new(raw.shape());

        let (typed, types) = run_stage(PipelineStage::Infer, || infer_types(&raw))?;

        let (deduped, duplicates) = run_stage(PipelineStage::Deduplicate, || remove_duplicates(&typed))?;
        let ledger = ledger.with_duplicates(duplicates);

        let (filtered, ledger) = match config.rules.as_ref().filter(|r| !r.is_empty()) {
            Some(rules) => {
                let (table, records) =
                    run_stage(PipelineStage::Rules, || apply_rules(&deduped, &types, rules))?;
                (table, ledger.with_rules(records))
            }
            None => (deduped, ledger),
        };

        let (reduced, types, ledger) = if config.correlation_filter {
            let (table, kept, record) = run_stage(PipelineStage::Correlation, || {
                drop_weak_correlations(&filtered, &types, config.correlation_threshold)
            })?;
            (table, kept, ledger.with_correlation(record))
        } else {
            (filtered, types, ledger)
        };

        let (imputed, summary) =
            run_stage(PipelineStage::Impute, || impute_missing(&reduced, &types, config))?;
        let ledger = ledger.with_imputation(summary);

        let (cleaned, outliers) =
            run_stage(PipelineStage::Outliers, || remove_outliers(&imputed, &types, config))?;
        let ledger = ledger.with_outliers(outliers);

        let transformed = if config.apply_transform {
            Some(run_stage(PipelineStage::Transform, || transform_features(&cleaned, &types))?)
        } else {
            None
        };

        let report = run_stage(PipelineStage::Report, || {
            ledger.into_report(
                ctx.run_id,
                ctx.input.name(),
                config,
                &cleaned,
                &types,
                transformed.as_ref().map(|(t, _)| t.shape()),
            )
        })?;

        let (table, types) = transformed.unwrap_or((cleaned, types));
        let artifacts = match &ctx.output_dir {
            Some(dir) => Some(write_artifacts(dir, &ctx.input.name(), &table, &report, config.apply_transform)?),
            None => None,
        };

        tracing::info!(
            rows = table.height(),
            columns = table.width(),
            warnings = report.warnings.len(),
            "Pipeline finished"
        );
        Ok(PipelineOutput {
            table,
            types,
            report,
            artifacts,
        })
    }
}

fn write_artifacts(
    dir: &Path,
    source: &str,
    table: &Table,
    report: &ProfilingReport,
    transformed: bool,
) -> Result<Artifacts> {
    std::fs::create_dir_all(dir)?;
    let (data, report_path) = artifact_paths(dir, source, transformed);
    save_csv(table, &data)?;
    save_report(report, &report_path)?;
    tracing::info!(data = %data.display(), report = %report_path.display(), "Artifacts written");
    Ok(Artifacts {
        data,
        report: report_path,
    })
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;
    use crate::error::ScourError;

    #[test]
    fn test_stage_order_ends_at_report() {
        let mut stage = PipelineStage::Load;
        let mut seen = vec![stage];
        while let Some(next) = stage.next_stage() {
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen.len(), 9);
        assert_eq!(seen.last(), Some(&PipelineStage::Report));
    }

    #[test]
    fn test_run_from_bytes() -> Result<()> {
        let csv = b"a,b,label\n1,10,x\n2,20,y\n2,20,y\n3,,x\n4,40,y\n".to_vec();
        let ctx = RunContext::from_bytes(csv, "upload.csv");
        let output = Pipeline::new(PipelineConfig::default()).run(&ctx)?;

        assert_eq!(output.report.original_shape.rows, 5);
        assert_eq!(output.report.duplicates.pairs, vec![(2, 1)]);
        assert_eq!(output.report.run_id, ctx.run_id.to_string());
        assert_eq!(output.table.column_names(), vec!["a", "b", "label_y"]);
        assert!(output.artifacts.is_none());
        Ok(())
    }

    #[test]
    fn test_unexpected_errors_name_the_stage() {
        let err = run_stage(PipelineStage::Impute, || -> Result<()> {
            Err(ScourError::DataProcessing("boom".to_owned()))
        })
        .unwrap_err();
        assert!(matches!(err, ScourError::StageFailure { ref stage, .. } if stage == "impute"));

        let err = run_stage(PipelineStage::Load, || -> Result<()> {
            Err(ScourError::UnsupportedFormat(".txt".to_owned()))
        })
        .unwrap_err();
        assert!(matches!(err, ScourError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_ledger_collects_warnings() {
        let ledger = Ledger::default()
            .with_imputation(ImputationSummary {
                missingness: BTreeMap::new(),
                diagnostics: vec![ColumnDiagnostic::Skipped {
                    column: "notes".to_owned(),
                    reason: "no values".to_owned(),
                }],
            })
            .with_outliers(OutlierRecord::Skipped {
                reason: "no numeric columns".to_owned(),
            });
        assert_eq!(ledger.warnings.len(), 2);
        assert_eq!(ledger.imputation.len(), 1);
    }
}
