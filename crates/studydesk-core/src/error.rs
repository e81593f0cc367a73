use studydesk_gateway::GatewayError;
use studydesk_gateway::types::UploadError;

/// Errors surfaced by the study controllers.
///
/// Gateway failures are passed through untouched so callers can still tell a
/// network outage from a backend rejection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StudyError {
    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),
    /// The same kind of request is still in flight.
    #[error("a {0} request is already in progress")]
    Busy(&'static str),
    #[error("cannot {action} while {state}")]
    InvalidState { action: &'static str, state: String },
    /// The backend answered with something that breaks the dialogue contract.
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<UploadError> for StudyError {
    fn from(e: UploadError) -> Self {
        StudyError::Validation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudyError>;
