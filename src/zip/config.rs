/// Bytes of decompressed content kept in each report entry by default.
pub const DEFAULT_PREVIEW_LEN: usize = 64;

/// What to do with an entry whose CRC-32 does not match.
///
/// Either way the report carries `crc_ok` and `written` separately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrcPolicy {
    /// Keep the entry in the report but leave it off disk.
    #[default]
    SuppressWrite,
    /// Write the bytes anyway and flag the entry.
    WriteAndFlag,
}

/// Runtime-configurable reader settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Length of [`ExtractedEntry::preview`](super::ExtractedEntry::preview).
    pub preview_len: usize,
    /// Largest uncompressed entry that will be decoded. Also caps inflate
    /// output.
    pub max_entry_size: u64,
    pub crc_policy: CrcPolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            preview_len: DEFAULT_PREVIEW_LEN,
            max_entry_size: u32::MAX as u64,
            crc_policy: CrcPolicy::default(),
        }
    }
}

impl ReaderConfig {
    pub fn with_preview_len(mut self, preview_len: usize) -> Self {
        self.preview_len = preview_len;
        self
    }

    pub fn with_max_entry_size(mut self, max_entry_size: u64) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    pub fn with_crc_policy(mut self, crc_policy: CrcPolicy) -> Self {
        self.crc_policy = crc_policy;
        self
    }
}
