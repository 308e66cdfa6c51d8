//! ZIP archive parsing and extraction.
//!
//! This module reads ZIP archives held entirely in memory and lists or
//! extracts their entries while validating structure and CRC-32 checksums.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - `decompress`, `integrity`: method dispatch and CRC-32 checks
//! - `planner`: per-entry write decisions
//! - [`ZipExtractor`]: High-level list/extract API for end users
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Supported Features
//!
//! - STORED, DEFLATE and (with the `bzip2` feature) BZIP2 methods
//! - Streamed entries with trailing Data Descriptors
//! - Encrypted entries are detected and reported empty
//!
//! ## Limitations
//!
//! - No ZIP64
//! - No decryption
//! - No multi-disk archive support

mod config;
mod decompress;
mod extractor;
mod integrity;
pub mod parser;
mod planner;
mod report;
pub mod structures;

pub use config::{CrcPolicy, DEFAULT_PREVIEW_LEN, ReaderConfig};
pub use decompress::{decompress, ensure_backends};
pub use extractor::{Extraction, ZipExtractor};
pub use integrity::{crc32, crc32_hex, verify};
pub use parser::{ZipParser, is_plausible_zip};
pub use planner::{Disposition, ExtractMode, ExtractionRequest, SkipReason, plan, skip_reason};
pub use report::{ExtractedEntry, ExtractionReport, format_size};
pub use structures::*;
