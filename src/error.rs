use thiserror::Error;

/// Exit status used when the availability precheck aborts the run.
pub const SETUP_ABORTED_EXIT_CODE: u8 = 107;

/// Errors surfaced by the load test library.
///
/// Step-level check failures are never represented here; they are tallied
/// by the metrics collector and only influence the final threshold verdict.
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Target unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Report export failed: {0}")]
    Report(String),
}

impl LoadTestError {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadTestError::Unavailable(_) => SETUP_ABORTED_EXIT_CODE,
            LoadTestError::Config(_) | LoadTestError::Client(_) | LoadTestError::Report(_) => 1,
        }
    }
}

impl From<figment::Error> for LoadTestError {
    fn from(error: figment::Error) -> Self {
        LoadTestError::Config(error.to_string())
    }
}

impl From<std::io::Error> for LoadTestError {
    fn from(error: std::io::Error) -> Self {
        LoadTestError::Report(error.to_string())
    }
}

impl From<serde_json::Error> for LoadTestError {
    fn from(error: serde_json::Error) -> Self {
        LoadTestError::Report(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LoadTestError>;
