//! The `error` module defines the common error type for the refactor/reconstruct pipeline.

use std::fmt;

/// `Error` enumerates every way a refactor or reconstruct call can fail, per the
/// error kinds named by the on-disk format and the bitplane codec.
#[derive(Debug)]
pub enum Error {
    /// A caller-supplied argument is out of range or nonsensical (`K = 0`,
    /// `K_requested > K`, target level too deep, unsupported element or word type).
    InvalidArgument(String),
    /// A metadata blob or level component stream was truncated or internally
    /// inconsistent (wrong dimension count, size totals that don't add up,
    /// a stopping index greater than `K`).
    MalformedInput(String),
    /// Failure at the writer/retriever boundary.
    Io(std::io::Error),
    /// The lossless decompressor produced a size that disagrees with the
    /// size recorded at encode time.
    CodecFailure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::CodecFailure(msg) => write!(f, "codec failure: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
