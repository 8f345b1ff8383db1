/// Failure to turn a session record into bytes.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("unsupported value type: {0}")]
    UnsupportedType(&'static str),

    #[error("serialize: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Shared error type used across all guardian crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The identifier is not in the store, or names a session that is no
    /// longer valid.  Callers treat this as "not authenticated".
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("encode: {0}")]
    Encode(#[from] EncodeError),

    /// A stored payload could not be decoded.  Never retried.
    #[error("decode: {0}")]
    Decode(#[source] serde_json::Error),

    /// Backend failure, including backend timeouts (`ErrorKind::TimedOut`).
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("namespace already registered: {0}")]
    DuplicateNamespace(String),

    #[error("invalid session id: {0}")]
    InvalidId(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Transient backend failures may be retried with backoff; everything
    /// else is a hard failure for the record in question.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
