//! Definition of quiver's error and result.

use std::io;

use thiserror::Error;

/// The library's error enum.
#[derive(Debug, Error)]
pub enum Error {
    /// IO Error.
    #[error("An IO error occurred: '{0}'")]
    Io(#[from] io::Error),
    /// A file did not contain what the codec expected.
    #[error("Data corruption: {0}")]
    DataCorruption(String),
    /// Invalid argument was passed by the user.
    #[error("An invalid argument was passed: '{0}'")]
    InvalidArgument(String),
}
