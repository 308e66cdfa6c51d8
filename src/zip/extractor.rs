use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{EntryError, EntryFailure, Result, StructuralError, ZipError};
use crate::io::{Filesystem, SecureDirectoryCreator, StdDirectoryCreator, StdFilesystem};

use super::config::ReaderConfig;
use super::decompress::{decompress, ensure_backends};
use super::integrity::{crc32_hex, verify};
use super::parser::{ZipParser, is_plausible_zip};
use super::planner::{Disposition, ExtractMode, ExtractionRequest, plan, skip_reason};
use super::report::{ExtractedEntry, ExtractionReport, format_size};
use super::structures::{CentralDirectoryEntry, EndOfCentralDirectory};

/// Result of [`ZipExtractor::run`], one variant per mode.
#[derive(Debug)]
pub enum Extraction {
    Listing(ExtractionReport),
    File(Vec<u8>),
    Extracted(ExtractionReport),
}

/// ZIP file extractor over an in-memory archive.
///
/// Holds no state between calls; each call re-reads the archive structure
/// from the borrowed buffer. Filesystem access goes through `F` and
/// directory creation through `D`.
pub struct ZipExtractor<'a, F = StdFilesystem, D = StdDirectoryCreator> {
    data: &'a [u8],
    parser: ZipParser<'a>,
    config: ReaderConfig,
    fs: F,
    dirs: D,
}

impl<'a> ZipExtractor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, ReaderConfig::default())
    }

    pub fn with_config(data: &'a [u8], config: ReaderConfig) -> Self {
        Self {
            data,
            parser: ZipParser::new(data),
            config,
            fs: StdFilesystem,
            dirs: StdDirectoryCreator,
        }
    }
}

impl<'a, F: Filesystem, D: SecureDirectoryCreator> ZipExtractor<'a, F, D> {
    /// Swap the filesystem collaborators.
    pub fn with_filesystem<F2, D2>(self, fs: F2, dirs: D2) -> ZipExtractor<'a, F2, D2>
    where
        F2: Filesystem,
        D2: SecureDirectoryCreator,
    {
        ZipExtractor {
            data: self.data,
            parser: self.parser,
            config: self.config,
            fs,
            dirs,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Validate preconditions and read the End of Central Directory.
    fn open(&self) -> Result<EndOfCentralDirectory> {
        ensure_backends()?;
        if !is_plausible_zip(self.data) {
            return Err(if self.data.len() < EndOfCentralDirectory::SIZE {
                StructuralError::TooShort(self.data.len()).into()
            } else {
                StructuralError::MissingEndOfCentralDirectory.into()
            });
        }
        Ok(self.parser.find_eocd()?)
    }

    /// All Central Directory entries, directories included.
    pub fn entries(&self) -> Result<Vec<CentralDirectoryEntry>> {
        let eocd = self.open()?;
        Ok(self.parser.read_central_directory(&eocd)?)
    }

    /// The archive comment.
    pub fn comment(&self) -> Result<String> {
        Ok(self.open()?.comment_lossy())
    }

    /// Dispatch on the request's mode.
    pub fn run(&self, request: &ExtractionRequest) -> Result<Extraction> {
        match &request.mode {
            ExtractMode::List => self.list().map(Extraction::Listing),
            ExtractMode::SingleFile(selector) => self.extract_file(selector).map(Extraction::File),
            ExtractMode::FullExtract(root) => self
                .extract_all(root, request.overwrite, request.name_filter.as_ref())
                .map(Extraction::Extracted),
        }
    }

    /// Decode every file entry and report on it without touching the
    /// filesystem.
    pub fn list(&self) -> Result<ExtractionReport> {
        let entries = self.entries()?;
        let mut report = ExtractionReport::default();

        for entry in entries.iter().filter(|e| !e.is_directory) {
            let result = self
                .read_entry(entry)
                .map(|(extracted, _)| extracted)
                .map_err(|error| EntryFailure::new(&entry.file_name, error));
            if let Err(failure) = &result {
                warn!("Cannot read {}", failure);
            }
            report.push(result);
        }

        Ok(report)
    }

    /// Return the decompressed bytes of the first file entry matching
    /// `selector`.
    ///
    /// A selector is either the exact archive name or `*/` followed by the
    /// entry's base name. The `*` is literal, not a glob.
    pub fn extract_file(&self, selector: &str) -> Result<Vec<u8>> {
        let entries = self.entries()?;
        let entry = entries
            .iter()
            .filter(|e| !e.is_directory)
            .find(|e| matches_selector(e, selector))
            .ok_or_else(|| ZipError::EntryNotFound(selector.to_string()))?;

        let (extracted, content) = self
            .read_entry(entry)
            .map_err(|error| EntryFailure::new(&entry.file_name, error))?;
        if !extracted.crc_ok {
            warn!(name = %entry.file_name, "CRC-32 mismatch");
        }
        Ok(content)
    }

    /// Extract all entries below `root`.
    ///
    /// Structural problems abort before anything is written. Every other
    /// failure is recorded against its entry and extraction moves on.
    /// Entries skipped for an existing target or the name filter are never
    /// failures, even when their content cannot be decoded.
    pub fn extract_all(
        &self,
        root: &Path,
        overwrite: bool,
        name_filter: Option<&BTreeSet<String>>,
    ) -> Result<ExtractionReport> {
        let entries = self.entries()?;
        let mut report = ExtractionReport::default();

        for entry in &entries {
            let Some(target) = safe_join(root, &entry.file_name) else {
                let failure = EntryFailure::new(&entry.file_name, EntryError::UnsafePath);
                warn!("Cannot extract {}", failure);
                if entry.is_directory {
                    report.push_directory_failure(failure);
                } else {
                    report.push(Err(failure));
                }
                continue;
            };

            if entry.is_directory {
                if let Err(error) = self.ensure_dir(&target) {
                    let failure = EntryFailure::new(&entry.file_name, error);
                    warn!("Cannot create directory {}", failure);
                    report.push_directory_failure(failure);
                }
                continue;
            }

            let result = self
                .extract_entry(root, entry, &target, overwrite, name_filter)
                .map_err(|error| EntryFailure::new(&entry.file_name, error));
            if let Err(failure) = &result {
                warn!("Cannot extract {}", failure);
            }
            report.push(result);
        }

        Ok(report)
    }

    fn extract_entry(
        &self,
        root: &Path,
        entry: &CentralDirectoryEntry,
        target: &Path,
        overwrite: bool,
        name_filter: Option<&BTreeSet<String>>,
    ) -> Result<ExtractedEntry, EntryError> {
        let target_exists = self.fs.exists(target);
        let skip = skip_reason(&entry.file_name, target_exists, overwrite, name_filter);
        if let Some(reason) = skip {
            debug!(name = %entry.file_name, ?reason, "Skipping entry");
            let mut extracted = match self.read_entry(entry) {
                Ok((extracted, _)) => extracted,
                Err(error) => {
                    warn!(name = %entry.file_name, %error, "Cannot read skipped entry");
                    ExtractedEntry::from_central(entry)
                }
            };
            extracted.skip_reason = Some(reason);
            return Ok(extracted);
        }

        let (mut extracted, content) = self.read_entry(entry)?;
        let disposition = plan(
            &entry.file_name,
            extracted.crc_ok,
            target_exists,
            overwrite,
            name_filter,
            self.config.crc_policy,
        );
        debug!(name = %entry.file_name, ?disposition, "Planned entry");

        match disposition {
            Disposition::Skip(reason) => extracted.skip_reason = Some(reason),
            Disposition::Suppress => {
                warn!(name = %entry.file_name, "CRC-32 mismatch, not writing");
            }
            Disposition::Write => {
                let parent = entry.target_dir(root);
                if !self.fs.exists(&parent) {
                    self.ensure_dir(&parent)?;
                }
                self.write_file(target, &content)?;
                extracted.written = true;
            }
        }

        Ok(extracted)
    }

    /// Local header, decompression and CRC check for one file entry.
    fn read_entry(
        &self,
        entry: &CentralDirectoryEntry,
    ) -> Result<(ExtractedEntry, Vec<u8>), EntryError> {
        let local = self.parser.read_local(entry)?;

        let (content, encrypted) = if local.is_encrypted() {
            debug!(name = %entry.file_name, "Encrypted entry, content not recoverable");
            (Vec::new(), true)
        } else {
            let expected = local.uncompressed_size();
            let limit = self.config.max_entry_size;
            if expected > limit {
                return Err(EntryError::TooLarge {
                    size: expected,
                    limit,
                });
            }
            let content = decompress(local.header.compression_method, local.payload, expected)?;
            (content, false)
        };

        let crc_ok = verify(&content, local.payload, local.crc32());
        if !crc_ok {
            warn!(
                name = %entry.file_name,
                declared = format_args!("{:08x}", local.crc32()),
                "CRC-32 mismatch"
            );
        }

        let size = content.len() as u64;
        let extracted = ExtractedEntry {
            name: entry.file_name.clone(),
            size,
            formatted_size: format_size(size),
            preview: content[..content.len().min(self.config.preview_len)].to_vec(),
            content_hash: crc32_hex(&content),
            crc_ok,
            encrypted,
            written: false,
            skip_reason: None,
        };
        Ok((extracted, content))
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), EntryError> {
        self.dirs
            .create(path)
            .map_err(|source| EntryError::Filesystem {
                path: path.to_path_buf(),
                source,
            })
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<(), EntryError> {
        if self.fs.exists(path) && !self.fs.is_writable(path) {
            return Err(EntryError::Filesystem {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::PermissionDenied.into(),
            });
        }
        self.fs
            .write(path, content)
            .map_err(|source| EntryError::Filesystem {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), size = content.len(), "Wrote entry");
        Ok(())
    }
}

/// Literal selector match: the exact name, or `"*/" + basename`.
fn matches_selector(entry: &CentralDirectoryEntry, selector: &str) -> bool {
    entry.file_name == selector
        || selector
            .strip_prefix("*/")
            .is_some_and(|base| base == entry.basename())
}

/// Join an archive name onto `root`, refusing absolute names and `..`.
fn safe_join(root: &Path, name: &str) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::structures::{CompressionMethod, GeneralPurposeFlags};

    fn entry(name: &str) -> CentralDirectoryEntry {
        CentralDirectoryEntry {
            file_name: name.to_string(),
            version_made_by: 20,
            flags: GeneralPurposeFlags::default(),
            compression_method: CompressionMethod::Stored,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            internal_attributes: 0,
            external_attributes: 0,
            lfh_offset: 0,
            extra_field: Vec::new(),
            comment: Vec::new(),
            is_directory: name.ends_with('/'),
        }
    }

    #[test]
    fn selector_forms() {
        let nested = entry("pkg/lib/module.py");
        assert!(matches_selector(&nested, "pkg/lib/module.py"));
        assert!(matches_selector(&nested, "*/module.py"));
        assert!(!matches_selector(&nested, "module.py"));
        assert!(!matches_selector(&nested, "*/lib/module.py"));
        assert!(!matches_selector(&nested, "*.py"));
    }

    #[test]
    fn safe_join_rejects_escapes() {
        let root = Path::new("/dest");
        assert_eq!(safe_join(root, "a/./b.txt"), Some(PathBuf::from("/dest/a/b.txt")));
        assert_eq!(safe_join(root, "dir/"), Some(PathBuf::from("/dest/dir")));
        assert_eq!(safe_join(root, "../evil"), None);
        assert_eq!(safe_join(root, "a/../../evil"), None);
        assert_eq!(safe_join(root, "/etc/passwd"), None);
    }

    #[test]
    fn garbage_is_structural() {
        let data = vec![0u8; 100];
        let err = ZipExtractor::new(&data).list().unwrap_err();
        assert!(matches!(
            err,
            ZipError::Structural(StructuralError::MissingEndOfCentralDirectory)
        ));

        let err = ZipExtractor::new(b"PK").list().unwrap_err();
        assert!(matches!(err, ZipError::Structural(StructuralError::TooShort(2))));
    }
}
