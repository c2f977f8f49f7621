use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP 429. `reset_at` is the epoch second from `x-rate-limit-reset`, when present.
    #[error("Rate limited (reset at {reset_at:?})")]
    RateLimited { reset_at: Option<i64> },
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
    #[error("Cannot encode/decode JSON: {0}")]
    JSONError(#[from] serde_json::Error),
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Network Error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Cannot parse URL: {0}")]
    UrlError(#[from] url::ParseError),
}
