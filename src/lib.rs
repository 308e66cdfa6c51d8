//! # memzip
//!
//! An in-memory ZIP reader and extractor.
//!
//! Given the bytes of a `.zip` file this library lists its entries, returns
//! the contents of a single entry, or extracts the whole archive below a
//! destination directory. Structural damage (a missing End of Central
//! Directory, an entry count that does not match) rejects the archive
//! outright; problems with individual entries are recorded in a report and
//! extraction carries on.
//!
//! ## Features
//!
//! - STORED, DEFLATE and BZIP2 entries
//! - Streamed entries with Data Descriptors
//! - CRC-32 verification of every entry
//! - Pluggable filesystem and directory creation
//! - A CLI that loads archives from disk or over HTTP
//!
//! ## Example
//!
//! ```no_run
//! use memzip::ZipExtractor;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let data = std::fs::read("archive.zip")?;
//!     let extractor = ZipExtractor::new(&data);
//!
//!     for entry in extractor.list()?.extracted() {
//!         println!("{} {} crc_ok={}", entry.name, entry.formatted_size, entry.crc_ok);
//!     }
//!
//!     let report = extractor.extract_all(Path::new("out"), false, None)?;
//!     println!("{} files written", report.written().count());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{EntryError, EntryFailure, StructuralError, ZipError};
pub use io::{
    ArchiveSource, Filesystem, HttpSource, LocalFileSource, SecureDirectoryCreator,
    StdDirectoryCreator, StdFilesystem,
};
pub use zip::{
    CentralDirectoryEntry, CrcPolicy, ExtractMode, ExtractedEntry, Extraction, ExtractionReport,
    ExtractionRequest, ReaderConfig, ZipExtractor,
};
