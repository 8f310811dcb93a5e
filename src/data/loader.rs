//! CSV Measures Loader Module
//! Handles loading the quality-of-care measures file using Polars.

use polars::prelude::*;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Sentinel token the source file uses for missing rate values.
pub const DEFAULT_NA_TOKEN: &str = "Not Available";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("No data loaded")]
    NoData,
}

/// Handles CSV file loading with Polars for high performance.
///
/// The configured missing-value token is mapped to null on read so the rate
/// columns infer as numeric instead of strings.
pub struct MeasuresLoader {
    df: Option<DataFrame>,
    file_path: Option<PathBuf>,
    na_token: String,
}

impl Default for MeasuresLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasuresLoader {
    pub fn new() -> Self {
        Self {
            df: None,
            file_path: None,
            na_token: DEFAULT_NA_TOKEN.to_string(),
        }
    }

    /// Override the missing-value sentinel (default: "Not Available").
    pub fn with_na_token(mut self, token: impl Into<String>) -> Self {
        self.na_token = token.into();
        self
    }

    /// Load a CSV file using Polars.
    pub fn load_csv(&mut self, file_path: &str) -> Result<&DataFrame, LoaderError> {
        self.file_path = Some(PathBuf::from(file_path));

        // Use lazy evaluation for memory efficiency, then collect
        let df = LazyCsvReader::new(file_path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .with_null_values(Some(NullValues::AllColumnsSingle(
                self.na_token.as_str().into(),
            )))
            .finish()?
            .collect()?;

        info!(rows = df.height(), path = file_path, "loaded measures file");

        self.df = Some(df);
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Get list of column names from loaded DataFrame.
    pub fn get_columns(&self) -> Vec<String> {
        self.df
            .as_ref()
            .map(|df| {
                df.get_column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    /// Get a reference to the loaded DataFrame.
    pub fn get_dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    /// Get file path.
    pub fn get_file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }
}
