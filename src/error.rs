use thiserror::Error;

/// Errors caused by the caller's request rather than by the API or the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown report '{0}'")]
    UnknownReport(String),
}

pub type ReportResult<T> = Result<T, ReportError>;
