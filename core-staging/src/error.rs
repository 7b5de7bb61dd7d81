use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Remote request failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Cannot diff song {actual} against baseline record {expected}")]
    IdMismatch { expected: String, actual: String },

    #[error("Song {0} not found")]
    SongNotFound(String),

    #[error("A commit is already in progress")]
    CommitInProgress,

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },
}

impl StagingError {
    /// Errors worth retrying: the remote was unreachable, answered with a
    /// server-side failure, or sent a body we could not read.
    pub fn is_transient(&self) -> bool {
        match self {
            StagingError::Bridge(BridgeError::NotAvailable(_))
            | StagingError::Bridge(BridgeError::OperationFailed(_))
            | StagingError::Bridge(BridgeError::Io(_)) => true,
            StagingError::Remote { status, .. } => *status == 0 || *status == 429 || *status >= 500,
            StagingError::MalformedPayload(_) => true,
            _ => false,
        }
    }

    pub(crate) fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        StagingError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StagingError {
    fn from(err: serde_json::Error) -> Self {
        StagingError::MalformedPayload(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StagingError>;
