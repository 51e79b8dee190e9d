use calc_client::ClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EstimateError>;

#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("estimate '{0}' was not found (or access was denied)")]
    NotFound(String),

    #[error("'{0}' is not an estimate id or share link")]
    InvalidId(String),

    /// Both the initial save and the stripped retry failed. Each side
    /// carries its status line and response body.
    #[error("estimate save failed twice (first: {first}; retry: {retry})")]
    SaveFailed { first: String, retry: String },

    #[error("unexpected save response: {0}")]
    ResponseShape(String),

    #[error("failed to encode estimate document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Client(#[from] ClientError),
}
