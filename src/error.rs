// src/error.rs
//! Error type for the xsshound command-line front end
//!
//! Scan failures come from [`crate::xss::error::ScanError`]; this type adds
//! the failures of argument checking and of writing results out.

use crate::xss::error::ScanError;
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    /// Scan could not start or the crawl seed was unusable
    Scan(ScanError),

    /// Bad command-line input (output format, header syntax)
    Validation(String),

    /// I/O error (result file)
    Io(std::io::Error),

    /// Result serialization error (JSON, YAML, CSV)
    Serialize(String),
}

impl std::error::Error for CliError {}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CliError::Scan(e) => write!(f, "Scan error: {}", e),
            CliError::Validation(s) => write!(f, "Validation error: {}", s),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Serialize(s) => write!(f, "Serialization error: {}", s),
        }
    }
}

impl From<ScanError> for CliError {
    fn from(e: ScanError) -> Self {
        CliError::Scan(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialize(format!("JSON: {}", e))
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        CliError::Serialize(format!("YAML: {}", e))
    }
}

impl From<csv::Error> for CliError {
    fn from(e: csv::Error) -> Self {
        CliError::Serialize(format!("CSV: {}", e))
    }
}
