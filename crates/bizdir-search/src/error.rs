use thiserror::Error;

/// Failure reported by a storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("store call timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`crate::SearchOrchestrator::search`].
///
/// "No matches" is never an error; an unresolved category or location yields
/// an empty result instead.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    #[error("{operation} failed: {source}")]
    StoreUnavailable {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("search cancelled by caller")]
    Cancelled,
}

impl From<bizdir_core::CoreError> for SearchError {
    fn from(err: bizdir_core::CoreError) -> Self {
        match err {
            bizdir_core::CoreError::InvalidRequest(reason) => {
                SearchError::MalformedRequest { reason }
            }
            other => SearchError::MalformedRequest {
                reason: other.to_string(),
            },
        }
    }
}
