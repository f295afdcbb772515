//! Error taxonomy for the reporting pipeline.
//!
//! [`ReportError::DataUnavailable`] is fatal and aborts startup. Every other
//! variant is recoverable: the catalog turns it into a [`Diagnostic`] and
//! moves on to the next report.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    /// Source file missing, unreadable or corrupt.
    #[error("data unavailable at {}: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    /// A report referenced a column the dataset does not carry.
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    /// A filter or grouping left nothing to plot.
    #[error("empty result: {what}")]
    EmptyResult { what: String },

    /// A non-blank cell could not be read as a number.
    #[error("failed to parse '{value}' as number in column '{column}' at row {row}")]
    Parse {
        column: String,
        value: String,
        row: usize,
    },

    #[error("render error: {0}")]
    Render(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type ReportResult<T> = Result<T, ReportError>;

impl ReportError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        ReportError::MissingColumn {
            column: column.into(),
        }
    }

    pub fn empty(what: impl Into<String>) -> Self {
        ReportError::EmptyResult { what: what.into() }
    }

    /// True for errors that only cost a single report.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ReportError::DataUnavailable { .. } | ReportError::Config(_)
        )
    }
}

impl From<anyhow::Error> for ReportError {
    fn from(err: anyhow::Error) -> Self {
        ReportError::Render(format!("{err:#}"))
    }
}

/// A report that was left out of the catalog, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub key: String,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(key: impl Into<String>, err: &ReportError) -> Self {
        Self {
            key: key.into(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message() {
        let err = ReportError::missing_column("gdppercapita");
        assert_eq!(err.to_string(), "missing column 'gdppercapita'");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_data_unavailable_is_fatal() {
        let err = ReportError::DataUnavailable {
            path: PathBuf::from("data/missing.csv"),
            reason: "No such file or directory".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("data/missing.csv"));
    }

    #[test]
    fn test_diagnostic_carries_key_and_reason() {
        let err = ReportError::empty("no rows for year 2020");
        let diag = Diagnostic::new("pie_chart", &err);
        assert_eq!(diag.key, "pie_chart");
        assert!(diag.reason.contains("no rows for year 2020"));
    }
}
