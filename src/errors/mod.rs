use core::fmt;
use derive_more::Display;
use std::error::Error;

/// Kind of an election failure. Callers branch on the kind, never on the message.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transient backend or network failure.
    #[display(fmt = "backend unavailable")]
    Unavailable,
    /// The lease is held by another node.
    #[display(fmt = "lease already held")]
    AlreadyHeld,
    /// The lease credential has expired.
    #[display(fmt = "lease expired")]
    Expired,
    /// The credential or the requested entry does not exist.
    #[display(fmt = "not found")]
    NotFound,
    /// The election resource has not been created yet.
    #[display(fmt = "election resource missing")]
    ResourceMissing,
    /// The resource was created concurrently by someone else.
    #[display(fmt = "resource already exists")]
    AlreadyExists,
    #[display(fmt = "invalid configuration")]
    Configuration,
    #[display(fmt = "invalid data")]
    InvalidData,
    #[display(fmt = "stop timed out")]
    StopTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionError {
    kind: ErrorKind,
    text: String,
    cause: String,
}

pub type Result<T> = std::result::Result<T, ElectionError>;

pub fn new_err<T>(kind: ErrorKind, text: String, cause: String) -> Result<T> {
    Err(ElectionError::new(kind, text, cause))
}

impl ElectionError {
    pub fn new(kind: ErrorKind, text: String, cause: String) -> ElectionError {
        ElectionError { kind, text, cause }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Transient failures are retried by the driving loop; everything else
    /// invalidates the current claim.
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Unavailable
    }
}

impl fmt::Display for ElectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cause_word = {
            if !self.cause.is_empty() {
                " Cause: ".to_string()
            } else {
                String::new()
            }
        };
        write!(f, "{} ({}).{}{}", self.text, self.kind, cause_word, self.cause)
    }
}

impl Error for ElectionError {}

impl From<serde_json::Error> for ElectionError {
    fn from(err: serde_json::Error) -> Self {
        ElectionError::new(
            ErrorKind::InvalidData,
            "Malformed leadership document".to_string(),
            err.to_string(),
        )
    }
}
