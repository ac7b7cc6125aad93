use thiserror::Error;

use crate::services::response_parser::ParseError;

/// Every way a single analysis run can fail.
///
/// Stages never recover from these; the first one aborts the run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("classification error: {0}")]
    Classification(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Stable label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Configuration(_) => "configuration",
            AnalysisError::Encoding(_) => "encoding",
            AnalysisError::Gateway(_) => "gateway",
            AnalysisError::Parse(_) => "parse",
            AnalysisError::Classification(_) => "classification",
            AnalysisError::Validation(_) => "validation",
            AnalysisError::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AnalysisError::Gateway(format!("request timed out: {}", err))
        } else {
            AnalysisError::Gateway(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
