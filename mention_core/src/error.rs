use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Remote throttling. `reset_at` is the epoch second the window reopens, when known.
    #[error("Rate limited (reset at {reset_at:?})")]
    RateLimited { reset_at: Option<i64> },
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("Reply failed: {0}")]
    Respond(String),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Cannot encode/decode JSON: {0}")]
    JSONError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
