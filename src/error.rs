//! Error types for archive reading.
//!
//! Failures are split by blast radius: [`ZipError`] aborts a whole call,
//! [`EntryError`] is isolated to one entry and recorded in the report.

use std::io;
use std::path::PathBuf;

/// The archive itself is malformed. Nothing is listed or written.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    #[error("buffer of {0} bytes is too short to be a ZIP archive")]
    TooShort(usize),

    #[error("End of Central Directory signature not found")]
    MissingEndOfCentralDirectory,

    #[error("End of Central Directory record at offset {0} is truncated")]
    TruncatedEndOfCentralDirectory(usize),

    #[error("Central Directory entry at offset {0} runs past the end of the archive")]
    TruncatedCentralDirectory(usize),

    #[error("Central Directory declares {declared} entries but {found} were found")]
    EntryCountMismatch { declared: u16, found: usize },
}

/// A single entry could not be read, decoded or written.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("no Local File Header at offset {0}")]
    MissingLocalHeader(u64),

    #[error("entry data runs past the end of the archive")]
    Truncated,

    #[error("unsupported compression method {0}")]
    UnsupportedMethod(u16),

    #[error("decompression failed: {0}")]
    Decompress(#[source] io::Error),

    #[error("declared size {size} exceeds the limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("refusing to write outside the destination")]
    UnsafePath,

    #[error("cannot write {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An [`EntryError`] tagged with the archive name it happened to.
#[derive(Debug, thiserror::Error)]
#[error("{name}: {error}")]
pub struct EntryFailure {
    pub name: String,
    #[source]
    pub error: EntryError,
}

impl EntryFailure {
    pub fn new(name: impl Into<String>, error: EntryError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

/// Errors that fail a whole extractor call.
#[derive(Debug, thiserror::Error)]
pub enum ZipError {
    #[error("invalid archive: {0}")]
    Structural(#[from] StructuralError),

    #[error("{0} support is not available in this build")]
    UnsupportedFeature(&'static str),

    #[error("no entry matches {0:?}")]
    EntryNotFound(String),

    #[error(transparent)]
    Entry(#[from] EntryFailure),
}

pub type Result<T, E = ZipError> = std::result::Result<T, E>;
