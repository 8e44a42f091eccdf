use thiserror::Error;

pub mod market;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("malformed market data: {0}")]
    MalformedData(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
