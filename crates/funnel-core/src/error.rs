use thiserror::Error;

/// Application-wide error types for Funnel.
#[derive(Error, Debug)]
pub enum AppError {
    /// Delay or dispatch configuration is inconsistent.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Delay algorithm tag is not one of the recognised curves.
    #[error("Cannot calculate delay for unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// The item list and the delay schedule have different lengths.
    #[error("Got {items} items but {delays} delays")]
    LengthMismatch { items: usize, delays: usize },

    /// A delay in the schedule is negative or not a finite number.
    #[error("Invalid delay {value} at index {index}")]
    InvalidDelay { index: usize, value: f64 },

    /// Work was submitted to a pool that has already been shut down.
    #[error("Worker pool is shut down")]
    PoolShutDown,

    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Parsing a fetched payload failed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A fetch task panicked or was aborted before producing a result.
    #[error("Worker task failed: {0}")]
    WorkerPanicked(String),
}

impl AppError {
    /// Returns true if this error was raised by the fetch side of a dispatch.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_)
                | AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::WorkerPanicked(_)
        )
    }

    /// Returns true if the error was detected before any work was submitted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AppError::ConfigError(_)
                | AppError::UnsupportedAlgorithm(_)
                | AppError::LengthMismatch { .. }
                | AppError::InvalidDelay { .. }
                | AppError::PoolShutDown
        )
    }
}
