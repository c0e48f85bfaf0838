//! CSV Data Loader Module
//! Handles CSV file loading and column discovery using Polars.

use polars::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("File not found: {0}")]
    MissingFile(String),
    #[error("Column '{column}' missing from {table}")]
    MissingColumn { table: String, column: String },
    #[error("Column '{column}' in {table} is not numeric (read as {dtype})")]
    NonNumericColumn {
        table: String,
        column: String,
        dtype: String,
    },
}

/// Handles CSV file loading with Polars.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file using Polars.
    ///
    /// Rows that fail to parse are an error, not skipped: a malformed input
    /// must stop the service from starting.
    pub fn load_csv(file_path: &Path) -> Result<DataFrame, DataError> {
        if !file_path.is_file() {
            return Err(DataError::MissingFile(file_path.display().to_string()));
        }

        let df = LazyCsvReader::new(file_path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;

        debug!(
            path = %file_path.display(),
            rows = df.height(),
            columns = df.width(),
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Fail unless every column in `columns` is present in `df`.
    pub fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<(), DataError> {
        let present = Self::get_columns(df);
        for column in columns {
            if !present.iter().any(|name| name == column) {
                return Err(DataError::MissingColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Get list of column names.
    pub fn get_columns(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Get list of numeric column names, in frame order.
    pub fn get_numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| {
                matches!(
                    col.dtype(),
                    DataType::Float32
                        | DataType::Float64
                        | DataType::Int8
                        | DataType::Int16
                        | DataType::Int32
                        | DataType::Int64
                        | DataType::UInt8
                        | DataType::UInt16
                        | DataType::UInt32
                        | DataType::UInt64
                )
            })
            .map(|col| col.name().to_string())
            .collect()
    }
}
