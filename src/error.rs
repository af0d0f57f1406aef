//! Error type shared by the whole crate.

/// Failures reported by instance construction, the heuristic and the I/O helpers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Processing times do not form a valid instance (empty, non-rectangular or invalid entries).
    InvalidInstance(String),
    /// An operation was called with arguments outside of its domain.
    InvalidArgument(String),
    /// The insertion phase was started on a sequence it cannot work with.
    PreconditionViolation(String),
    /// Malformed instance text or configuration.
    Parse(String),
    /// Underlying file system or CSV failure.
    Io(String),
}

/// A type alias for result type with crate's [Error].
pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInstance(msg) => write!(f, "invalid instance: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::PreconditionViolation(msg) => write!(f, "precondition violated: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Io(msg) => write!(f, "i/o error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}
