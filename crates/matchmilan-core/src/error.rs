use thiserror::Error;

/// Every failure the sync layer can surface. `Clone` so the pagination state
/// can keep the last one around for display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No response received from the server")]
    NoResponse,

    #[error("Request failed: {0}")]
    Unknown(String),

    #[error("Server returned an error with status code: {0}")]
    StatusCode(u16),

    #[error("Rate limited - please wait before retrying")]
    RateLimitExceeded,

    #[error("Failed to decode the server response")]
    DecodingError,

    #[error("No internet connection")]
    NoInternetConnection,

    #[error("No saved matches available offline")]
    NoResults,

    #[error("Failed to save matches: {0}")]
    PersistenceError(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl SyncError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a non-success HTTP status to its error kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => SyncError::RateLimitExceeded,
            code => SyncError::StatusCode(code),
        }
    }

    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::NoResponse
            | SyncError::Unknown(_)
            | SyncError::StatusCode(_)
            | SyncError::RateLimitExceeded
            | SyncError::NoInternetConnection
            | SyncError::PersistenceError(_) => true,
            SyncError::InvalidRequest(_) | SyncError::DecodingError | SyncError::NoResults => false,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            SyncError::InvalidRequest(e.to_string())
        } else if e.is_decode() {
            SyncError::DecodingError
        } else if let Some(status) = e.status() {
            SyncError::from_status(status.as_u16())
        } else {
            SyncError::Unknown(e.to_string())
        }
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
