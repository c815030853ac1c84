//! Error types shared by the library
use std::io;
use std::path::PathBuf;

use crate::merge::MergeError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error reading or writing {file:?}: {source}")]
    FileIo { file: PathBuf, source: io::Error },

    #[error("Error reading or writing bytes: {0}")]
    BytesIo(#[from] io::Error),

    #[error("Input directory {0:?} does not exist or is not a directory")]
    MissingDirectory(PathBuf),

    #[error("Sequence store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Error parsing record in {file:?}: {reason}")]
    ParseRecord { file: PathBuf, reason: String },

    #[error("Could not open {file:?}: {source}")]
    Decompress {
        file: PathBuf,
        source: niffler::Error,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an `io::Error` with the file it happened on
    pub fn file_io<P: Into<PathBuf>>(file: P, source: io::Error) -> Self {
        Error::FileIo {
            file: file.into(),
            source,
        }
    }
}
