//! Dataset loading and artifact writing.
//!
//! Loading never infers types: every column comes back as text so the type
//! inferencer sees the literal cell values.

use super::report::ProfilingReport;
use super::types::Table;
use crate::error::{Result, ScourError};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// Detect the format from a file name's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xls" => Ok(Self::Spreadsheet),
            _ => Err(ScourError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                format!(".{ext}")
            })),
        }
    }
}

fn csv_options() -> CsvReadOptions {
    // A zero-row inference window reads every column as String.
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
}

fn load_error(err: impl std::fmt::Display) -> ScourError {
    ScourError::Load(err.to_string())
}

/// Load a dataset from disk into a text-only [`Table`].
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(ScourError::NotFound(path.to_path_buf()));
    }

    let df = match FileFormat::from_path(path)? {
        FileFormat::Csv => csv_options()
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(load_error)?
            .finish()
            .map_err(load_error)?,
        FileFormat::Spreadsheet => spreadsheet::read_path(path)?,
    };

    tracing::info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Dataset loaded"
    );
    Ok(Table::new(df))
}

/// Load an uploaded buffer; `file_name` only selects the format.
pub fn load_table_from_bytes(bytes: Vec<u8>, file_name: &str) -> Result<Table> {
    let df = match FileFormat::from_path(Path::new(file_name))? {
        FileFormat::Csv => csv_options()
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(load_error)?,
        FileFormat::Spreadsheet => spreadsheet::read_bytes(bytes)?,
    };

    tracing::info!(
        file_name,
        rows = df.height(),
        columns = df.width(),
        "Dataset loaded from buffer"
    );
    Ok(Table::new(df))
}

/// Write the table as CSV with a header row.
pub fn save_csv(table: &Table, path: &Path) -> Result<()> {
    let mut df = table.df.clone();
    let file = std::fs::File::create(path)?;
    CsvWriter::new(file).include_header(true).finish(&mut df)?;
    Ok(())
}

pub fn save_report(report: &ProfilingReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Artifact paths for a run over `source_name` written into `dir`.
pub fn artifact_paths(dir: &Path, source_name: &str, transformed: bool) -> (PathBuf, PathBuf) {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_owned());
    let suffix = if transformed { "transformed" } else { "cleaned" };
    (
        dir.join(format!("{stem}_{suffix}.csv")),
        dir.join(format!("{stem}_profiling_report.json")),
    )
}

#[cfg(feature = "excel")]
mod spreadsheet {
    use super::{load_error, Result, ScourError};
    use crate::cleaner::frame::string_column;
    use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, DataType as _, Range, Reader};
    use polars::prelude::DataFrame;
    use std::io::Cursor;
    use std::path::Path;

    pub fn read_path(path: &Path) -> Result<DataFrame> {
        let mut workbook = open_workbook_auto(path).map_err(load_error)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ScourError::Load("Workbook has no worksheets".to_owned()))?
            .map_err(load_error)?;
        range_to_frame(&range)
    }

    pub fn read_bytes(bytes: Vec<u8>) -> Result<DataFrame> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(load_error)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ScourError::Load("Workbook has no worksheets".to_owned()))?
            .map_err(load_error)?;
        range_to_frame(&range)
    }

    fn cell_text(cell: &Data) -> Option<String> {
        match cell {
            Data::Empty => None,
            Data::DateTime(_) | Data::DateTimeIso(_) => cell
                .as_datetime()
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            Data::String(s) if s.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }

    fn range_to_frame(range: &Range<Data>) -> Result<DataFrame> {
        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .ok_or_else(|| ScourError::Load("Worksheet is empty".to_owned()))?
            .iter()
            .enumerate()
            .map(|(i, cell)| cell_text(cell).unwrap_or_else(|| format!("column_{i}")))
            .collect();

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); header.len()];
        for row in rows {
            for (i, values) in columns.iter_mut().enumerate() {
                values.push(row.get(i).and_then(cell_text));
            }
        }

        let columns = header
            .iter()
            .zip(columns)
            .map(|(name, values)| string_column(name, values))
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(not(feature = "excel"))]
mod spreadsheet {
    use super::{Result, ScourError};
    use polars::prelude::DataFrame;
    use std::path::Path;

    pub fn read_path(_path: &Path) -> Result<DataFrame> {
        Err(ScourError::UnsupportedFormat(
            "spreadsheet support is disabled (enable the `excel` feature)".to_owned(),
        ))
    }

    pub fn read_bytes(_bytes: Vec<u8>) -> Result<DataFrame> {
        read_path(Path::new(""))
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;
    use crate::cleaner::frame::str_values;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            FileFormat::from_path(Path::new("data.CSV")).unwrap(),
            FileFormat::Csv
        );
        assert_eq!(
            FileFormat::from_path(Path::new("book.xlsx")).unwrap(),
            FileFormat::Spreadsheet
        );
        assert!(matches!(
            FileFormat::from_path(Path::new("data.parquet")),
            Err(ScourError::UnsupportedFormat(ext)) if ext == ".parquet"
        ));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let err = load_table(Path::new("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ScourError::NotFound(_)));
    }

    #[test]
    fn test_bytes_load_keeps_cells_textual() -> Result<()> {
        let csv = b"id,score,city\n1,2.5,Oslo\n2,,Rome\n".to_vec();
        let table = load_table_from_bytes(csv, "upload.csv")?;
        assert_eq!(table.height(), 2);
        assert_eq!(table.row_ids, vec![0, 1]);
        assert_eq!(table.df.column("score")?.dtype(), &DataType::String);
        assert_eq!(
            str_values(&table.df, "score")?,
            vec![Some("2.5".to_owned()), None]
        );
        Ok(())
    }

    #[test]
    fn test_artifact_paths() {
        let (csv, json) = artifact_paths(Path::new("/out"), "uploads/train.csv", true);
        assert_eq!(csv, PathBuf::from("/out/train_transformed.csv"));
        assert_eq!(json, PathBuf::from("/out/train_profiling_report.json"));
    }

    #[cfg(feature = "excel")]
    #[test]
    fn test_spreadsheet_header_blanks_and_dates() -> Result<()> {
        use crate::cleaner::frame::datetime_values;
        use crate::cleaner::inference::infer_types;
        use crate::cleaner::types::ColumnKind;

        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/members.xlsx");
        let table = load_table(&path)?;
        assert_eq!(table.column_names(), vec!["name", "score", "joined"]);
        assert_eq!(
            str_values(&table.df, "score")?,
            vec![Some("1".to_owned()), None, Some("3.5".to_owned())]
        );
        assert_eq!(
            str_values(&table.df, "joined")?,
            vec![
                Some("2024-01-01 00:00:00".to_owned()),
                Some("2024-01-02 00:00:00".to_owned()),
                Some("2024-01-03 00:00:00".to_owned()),
            ]
        );

        let (typed, types) = infer_types(&table)?;
        assert_eq!(types.get("score"), Some(ColumnKind::Numeric));
        assert_eq!(types.get("joined"), Some(ColumnKind::Datetime));
        assert_eq!(
            datetime_values(&typed.df, "joined")?,
            vec![Some(1_704_067_200_000), Some(1_704_153_600_000), Some(1_704_240_000_000)]
        );

        let uploaded = load_table_from_bytes(std::fs::read(&path)?, "members.xlsx")?;
        assert!(uploaded.df.equals_missing(&table.df));
        Ok(())
    }
}
