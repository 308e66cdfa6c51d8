use crate::error::EntryFailure;

use super::planner::SkipReason;
use super::structures::CentralDirectoryEntry;

/// Outcome for one file entry that could be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub name: String,
    /// Decompressed size in bytes.
    pub size: u64,
    pub formatted_size: String,
    /// Leading bytes of the decompressed content.
    pub preview: Vec<u8>,
    /// CRC-32 of the decompressed content, as eight hex digits.
    pub content_hash: String,
    pub crc_ok: bool,
    /// The entry was flagged encrypted and its content is empty.
    pub encrypted: bool,
    pub written: bool,
    pub skip_reason: Option<SkipReason>,
}

impl ExtractedEntry {
    /// Metadata from the Central Directory alone, for an entry whose content
    /// was not decoded. The hash is the declared CRC-32.
    pub(crate) fn from_central(entry: &CentralDirectoryEntry) -> Self {
        Self {
            name: entry.file_name.clone(),
            size: entry.uncompressed_size,
            formatted_size: format_size(entry.uncompressed_size),
            preview: Vec::new(),
            content_hash: format!("{:08x}", entry.crc32),
            crc_ok: false,
            encrypted: entry.flags.is_encrypted(),
            written: false,
            skip_reason: None,
        }
    }

    pub fn skipped(&self) -> bool {
        self.skip_reason.is_some()
    }
}

/// Ordered per-entry results of a list or extract call. Directory entries
/// only appear when they could not be created, in
/// [`directory_failures`](Self::directory_failures).
#[derive(Debug, Default)]
pub struct ExtractionReport {
    entries: Vec<Result<ExtractedEntry, EntryFailure>>,
    directories: Vec<EntryFailure>,
}

impl ExtractionReport {
    pub(crate) fn push(&mut self, result: Result<ExtractedEntry, EntryFailure>) {
        self.entries.push(result);
    }

    pub(crate) fn push_directory_failure(&mut self, failure: EntryFailure) {
        self.directories.push(failure);
    }

    pub fn entries(&self) -> &[Result<ExtractedEntry, EntryFailure>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Result<ExtractedEntry, EntryFailure>> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that were read successfully, whatever happened afterwards.
    pub fn extracted(&self) -> impl Iterator<Item = &ExtractedEntry> {
        self.entries.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn written(&self) -> impl Iterator<Item = &ExtractedEntry> {
        self.extracted().filter(|e| e.written)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ExtractedEntry> {
        self.extracted().filter(|e| e.skipped())
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryFailure> {
        self.entries.iter().filter_map(|r| r.as_ref().err())
    }

    /// Directory entries that were unsafe or could not be created.
    pub fn directory_failures(&self) -> &[EntryFailure] {
        &self.directories
    }

    /// Any file or directory entry failed.
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some() || !self.directories.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ExtractedEntry> {
        self.extracted().find(|e| e.name == name)
    }
}

/// Format a byte size into a human-readable string.
///
/// ```
/// use memzip::zip::format_size;
///
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// assert_eq!(format_size(1048576), "1.00 MB");
/// ```
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
