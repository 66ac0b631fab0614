use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    ParseError(String),
    StoreError(String),
    ValidationError(String),
    ExportError(String),
    ConfigError(String),
    IoError(String),
}

impl AppError {
    /// Stable machine-readable code used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ParseError(_) => "PARSE_ERROR",
            AppError::StoreError(_) => "STORE_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::ExportError(_) => "EXPORT_ERROR",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::IoError(_) => "IO_ERROR",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::StoreError(msg) => write!(f, "Store error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ExportError(msg) => write!(f, "Export error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StoreError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
