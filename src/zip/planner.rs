//! Per-entry write decisions.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use super::config::CrcPolicy;

/// What an extractor call should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractMode {
    /// Report metadata for every file entry, touching no filesystem.
    List,
    /// Return the bytes of the entry matching this selector.
    SingleFile(String),
    /// Write every eligible entry below this root.
    FullExtract(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub mode: ExtractMode,
    pub overwrite: bool,
    /// When set, only these archive names are written.
    pub name_filter: Option<BTreeSet<String>>,
}

impl ExtractionRequest {
    pub fn new(mode: ExtractMode) -> Self {
        Self {
            mode,
            overwrite: false,
            name_filter: None,
        }
    }

    /// Build a request from caller flags: no destination lists, a
    /// destination with `single_file` is a selector, otherwise a root.
    pub fn from_flags(
        destination: Option<String>,
        single_file: bool,
        overwrite: bool,
        name_filter: Option<BTreeSet<String>>,
    ) -> Self {
        let mode = match destination {
            None => ExtractMode::List,
            Some(selector) if single_file => ExtractMode::SingleFile(selector),
            Some(root) => ExtractMode::FullExtract(PathBuf::from(root)),
        };
        Self {
            mode,
            overwrite,
            name_filter,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_name_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// Why a readable entry was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Target exists and overwriting is off.
    Exists,
    /// Not named in the name filter.
    Filtered,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists => write!(f, "file exists, use -o to overwrite"),
            Self::Filtered => write!(f, "not selected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Write,
    Skip(SkipReason),
    /// CRC mismatch under [`CrcPolicy::SuppressWrite`].
    Suppress,
}

/// Skip decision that needs no entry content. Checked before decoding, so
/// an entry that is skipped is never reported as a failure.
pub fn skip_reason(
    name: &str,
    target_exists: bool,
    overwrite: bool,
    name_filter: Option<&BTreeSet<String>>,
) -> Option<SkipReason> {
    if target_exists && !overwrite {
        Some(SkipReason::Exists)
    } else if name_filter.is_some_and(|names| !names.contains(name)) {
        Some(SkipReason::Filtered)
    } else {
        None
    }
}

/// Decide what happens to a decoded file entry during full extraction.
pub fn plan(
    name: &str,
    crc_ok: bool,
    target_exists: bool,
    overwrite: bool,
    name_filter: Option<&BTreeSet<String>>,
    crc_policy: CrcPolicy,
) -> Disposition {
    if let Some(reason) = skip_reason(name, target_exists, overwrite, name_filter) {
        return Disposition::Skip(reason);
    }
    if !crc_ok && crc_policy == CrcPolicy::SuppressWrite {
        return Disposition::Suppress;
    }
    Disposition::Write
}
