// src/xss/error.rs
//! Error types for the XSS scanner module
//!
//! Transport failures are non-fatal inside a scan and are swallowed at the
//! candidate, page or probe level. Validation failures stop an invocation
//! before any scan work begins. Config failures degrade to empty data.

use std::fmt;

/// Main error type for XSS scanner operations
#[derive(Debug)]
pub enum ScanError {
    /// Network, timeout, TLS or DNS failure
    Transport(String),

    /// Missing or invalid payload corpus / signature registry
    Config(String),

    /// Bad invocation: target, depth, concurrency, output format, local file
    Validation(String),

    /// I/O error (local targets, data files)
    Io(std::io::Error),

    /// URL or data parsing error
    Parse(String),
}

impl std::error::Error for ScanError {}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanError::Transport(s) => write!(f, "Transport error: {}", s),
            ScanError::Config(s) => write!(f, "Configuration error: {}", s),
            ScanError::Validation(s) => write!(f, "Validation error: {}", s),
            ScanError::Io(e) => write!(f, "I/O error: {}", e),
            ScanError::Parse(s) => write!(f, "Parse error: {}", s),
        }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        ScanError::Io(e)
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        ScanError::Transport(e.to_string())
    }
}

impl From<url::ParseError> for ScanError {
    fn from(e: url::ParseError) -> Self {
        ScanError::Parse(e.to_string())
    }
}

impl From<serde_yaml::Error> for ScanError {
    fn from(e: serde_yaml::Error) -> Self {
        ScanError::Config(format!("YAML parse error: {}", e))
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        ScanError::Config(format!("JSON parse error: {}", e))
    }
}
