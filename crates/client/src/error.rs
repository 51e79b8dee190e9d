use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Non-2xx response. The body is preserved so callers that implement
    /// recovery (the estimate save retry) can report it.
    #[error("HTTP {status} for {url}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ClientError {
    /// Status code of the failed response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body of the failed request, when one was read.
    pub fn body(&self) -> Option<&str> {
        match self {
            ClientError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
