use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use scour::cleaner::rules::RuleSet;
use scour::cleaner::{self, Pipeline, RunContext};
use scour::config::{CONFIG_ENV_VAR, OutlierMethod, PipelineConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "scour", version, about = "Clean, profile and encode tabular datasets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full cleaning pipeline and write the cleaned data plus a JSON report
    Clean {
        /// Dataset to clean (.csv, .xlsx or .xls)
        input: PathBuf,

        /// JSON pipeline configuration; unspecified keys keep their defaults
        #[arg(long, env = CONFIG_ENV_VAR)]
        config: Option<PathBuf>,

        /// JSON row rules, e.g. {"age": {"range": [0, 120]}}
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Directory for the output CSV and report
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Outlier method: zscore or density
        #[arg(long)]
        outlier_method: Option<OutlierMethod>,

        /// Write the cleaned table without standardization and one-hot encoding
        #[arg(long)]
        no_transform: bool,
    },
    /// Print the inferred type of every column
    Infer {
        /// Dataset to inspect
        input: PathBuf,
    },
    /// Print the default configuration as JSON
    Config,
}

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Clean {
            input,
            config,
            rules,
            output_dir,
            outlier_method,
            no_transform,
        } => handle_clean(input, config, rules, output_dir, outlier_method, no_transform),
        Commands::Infer { input } => handle_infer(&input),
        Commands::Config => {
            println!("{}", PipelineConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn handle_clean(
    input: PathBuf,
    config_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    output_dir: PathBuf,
    outlier_method: Option<OutlierMethod>,
    no_transform: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = rules_path {
        config.rules = Some(RuleSet::from_file(&path)?);
    }
    if let Some(method) = outlier_method {
        config.outlier_method = method;
    }
    if no_transform {
        config.apply_transform = false;
    }

    let ctx = RunContext::from_path(input).with_output_dir(output_dir);
    let pipeline = Pipeline::new(config);
    let output = pipeline.run(&ctx)?;
    let report = &output.report;

    println!(
        "Run {} ({} outliers)",
        report.run_id,
        pipeline.config().outlier_method.as_str()
    );
    println!(
        "  rows: {} -> {}   columns: {} -> {}",
        report.original_shape.rows,
        report.cleaned_shape.rows,
        report.original_shape.columns,
        output.table.width()
    );
    println!("  duplicates removed: {}", report.duplicates.count);
    if let Some(outliers) = &report.outliers {
        println!("  outlier rows removed: {}", outliers.removed());
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    if let Some(artifacts) = &output.artifacts {
        println!("  data:   {}", artifacts.data.display());
        println!("  report: {}", artifacts.report.display());
    }
    if let Ok(log) = scour::logging::get_current_log_path() {
        println!("  log:    {}", log.display());
    }
    Ok(())
}

fn handle_infer(input: &Path) -> Result<()> {
    let raw = cleaner::io::load_table(input)?;
    let (_, types) = cleaner::inference::infer_types(&raw)?;

    let width = types.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, kind) in types.iter() {
        println!("{name:<width$}  {}", kind.as_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_clean_flags() {
        let cli = Cli::try_parse_from([
            "scour",
            "clean",
            "data.csv",
            "--outlier-method",
            "density",
            "--no-transform",
        ]);
        let Ok(Cli {
            command: Commands::Clean {
                input,
                outlier_method,
                no_transform,
                ..
            },
        }) = cli
        else {
            unreachable!("clean command should parse");
        };
        assert_eq!(input, PathBuf::from("data.csv"));
        assert_eq!(outlier_method, Some(OutlierMethod::Density));
        assert!(no_transform);
    }
}
