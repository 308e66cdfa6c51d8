//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures held in
//! an in-memory buffer. Every stage takes the buffer plus the value produced
//! by the previous stage, so nothing is carried between calls.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD), trusting only the last
//!    occurrence of its signature
//! 2. Walk the Central Directory and check its entry count against the EOCD
//! 3. For extraction, read each file's Local File Header, payload and
//!    optional Data Descriptor

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};
use tracing::{debug, warn};

use crate::error::{EntryError, StructuralError};

use super::structures::*;

/// Cheap check that `data` could be a ZIP archive.
///
/// Necessary but not sufficient: the buffer must be long enough to hold an
/// EOCD and must contain its signature somewhere.
pub fn is_plausible_zip(data: &[u8]) -> bool {
    data.len() >= EndOfCentralDirectory::SIZE
        && rfind(data, EndOfCentralDirectory::SIGNATURE).is_some()
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Low-level ZIP parser over a borrowed archive buffer.
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(&bytes);
/// let eocd = parser.find_eocd()?;
/// for entry in parser.read_central_directory(&eocd)? {
///     let local = parser.read_local(&entry)?;
///     // Decompress local.payload...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ZipParser<'a> {
    data: &'a [u8],
}

impl<'a> ZipParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The archive comment is free text and may itself contain the EOCD
    /// signature, so only the last occurrence in the buffer is used.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the buffer is too short, the
    /// signature is absent, or the fixed part of the record is cut short.
    pub fn find_eocd(&self) -> Result<EndOfCentralDirectory, StructuralError> {
        if self.data.len() < EndOfCentralDirectory::SIZE {
            return Err(StructuralError::TooShort(self.data.len()));
        }

        let offset = rfind(self.data, EndOfCentralDirectory::SIGNATURE)
            .ok_or(StructuralError::MissingEndOfCentralDirectory)?;
        let body_start = offset + EndOfCentralDirectory::SIGNATURE.len();

        let (mut eocd, comment_len) = EndOfCentralDirectory::from_body(&self.data[body_start..])
            .ok_or(StructuralError::TruncatedEndOfCentralDirectory(offset))?;

        let comment_start = body_start + EndOfCentralDirectory::BODY_SIZE;
        let comment_end = comment_start + comment_len as usize;
        if comment_end > self.data.len() {
            warn!(
                declared = comment_len,
                available = self.data.len() - comment_start,
                "Archive comment is truncated"
            );
        }
        eocd.comment = self.data[comment_start..comment_end.min(self.data.len())].to_vec();

        debug!(
            offset,
            total_entries = eocd.total_entries,
            cd_offset = eocd.cd_offset,
            cd_size = eocd.cd_size,
            "Found End of Central Directory"
        );
        Ok(eocd)
    }

    /// Walk the Central Directory described by `eocd`.
    ///
    /// Parsing continues for as long as a Central Directory File Header
    /// signature sits at the cursor. The number of records found must match
    /// the count declared by the EOCD; a mismatch rejects the whole archive.
    pub fn read_central_directory(
        &self,
        eocd: &EndOfCentralDirectory,
    ) -> Result<Vec<CentralDirectoryEntry>, StructuralError> {
        let mut pos = eocd.cd_offset as usize;
        let mut entries = Vec::with_capacity(eocd.total_entries as usize);

        while self.data.get(pos..pos + CDFH_SIGNATURE.len()) == Some(CDFH_SIGNATURE) {
            let (entry, next) = self.parse_cdfh(pos)?;
            entries.push(entry);
            pos = next;
        }

        if entries.len() != eocd.total_entries as usize {
            return Err(StructuralError::EntryCountMismatch {
                declared: eocd.total_entries,
                found: entries.len(),
            });
        }

        Ok(entries)
    }

    /// List all entries of the archive: EOCD plus Central Directory.
    pub fn list_files(&self) -> Result<Vec<CentralDirectoryEntry>, StructuralError> {
        let eocd = self.find_eocd()?;
        self.read_central_directory(&eocd)
    }

    /// Parse one Central Directory File Header at `pos`.
    ///
    /// Returns the entry and the offset of the next header.
    fn parse_cdfh(&self, pos: usize) -> Result<(CentralDirectoryEntry, usize), StructuralError> {
        let mut cursor = Cursor::new(&self.data[pos..]);
        let entry =
            read_cdfh(&mut cursor).map_err(|_| StructuralError::TruncatedCentralDirectory(pos))?;
        Ok((entry, pos + cursor.position() as usize))
    }

    /// Read the Local File Header of `entry` and slice out its payload.
    ///
    /// When general purpose bit 3 is set the header's sizes and CRC are
    /// placeholders: the payload length comes from the Central Directory and
    /// the Data Descriptor after the payload supplies the real values.
    ///
    /// # Errors
    ///
    /// Failures here only concern this entry; the caller carries on with the
    /// rest of the archive.
    pub fn read_local(&self, entry: &CentralDirectoryEntry) -> Result<LocalEntry<'a>, EntryError> {
        let data = self.data;
        let offset = usize::try_from(entry.lfh_offset)
            .map_err(|_| EntryError::MissingLocalHeader(entry.lfh_offset))?;

        let header = data
            .get(offset..)
            .and_then(LocalFileHeader::from_bytes)
            .ok_or(EntryError::MissingLocalHeader(entry.lfh_offset))?;

        let streamed = header.flags.has_data_descriptor();
        let compressed_size = if streamed {
            entry.compressed_size
        } else {
            header.compressed_size as u64
        };

        let data_start = offset + header.header_len();
        let data_end = usize::try_from(compressed_size)
            .ok()
            .and_then(|len| data_start.checked_add(len))
            .ok_or(EntryError::Truncated)?;
        let payload = data.get(data_start..data_end).ok_or(EntryError::Truncated)?;

        let descriptor = if streamed {
            let dd = DataDescriptor::from_bytes(&data[data_end..]).ok_or(EntryError::Truncated)?;
            if dd.compressed_size as u64 != compressed_size {
                warn!(
                    name = %entry.file_name,
                    descriptor = dd.compressed_size,
                    central = compressed_size,
                    "Data Descriptor disagrees with Central Directory on compressed size"
                );
            }
            Some(dd)
        } else {
            None
        };

        Ok(LocalEntry {
            header,
            descriptor,
            payload,
        })
    }
}

fn read_cdfh(cursor: &mut Cursor<&[u8]>) -> io::Result<CentralDirectoryEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    debug_assert_eq!(sig, CDFH_SIGNATURE);

    let version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let internal_attributes = cursor.read_u16::<LittleEndian>()?;
    let external_attributes = cursor.read_u32::<LittleEndian>()?;
    let lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Lossy so that non-UTF8 names still list
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    let mut extra_field = vec![0u8; extra_field_length as usize];
    cursor.read_exact(&mut extra_field)?;

    let mut comment = vec![0u8; file_comment_length as usize];
    cursor.read_exact(&mut comment)?;

    let is_directory = file_name.ends_with('/');

    Ok(CentralDirectoryEntry {
        file_name,
        version_made_by,
        flags: GeneralPurposeFlags(flags),
        compression_method: CompressionMethod::from_u16(compression_method),
        last_mod_time,
        last_mod_date,
        crc32,
        compressed_size,
        uncompressed_size,
        internal_attributes,
        external_attributes,
        lfh_offset,
        extra_field,
        comment,
        is_directory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eocd_bytes(total_entries: u16, cd_size: u32, cd_offset: u32, comment: &[u8]) -> Vec<u8> {
        let mut out = EndOfCentralDirectory::SIGNATURE.to_vec();
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&total_entries.to_le_bytes());
        out.extend_from_slice(&total_entries.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        out.extend_from_slice(comment);
        out
    }

    #[test]
    fn sniff_requires_signature_and_length() {
        assert!(is_plausible_zip(&eocd_bytes(0, 0, 0, b"")));
        assert!(!is_plausible_zip(b"PK\x05\x06"));
        assert!(!is_plausible_zip(&[0u8; 64]));
    }

    #[test]
    fn empty_archive() {
        let data = eocd_bytes(0, 0, 0, b"hello");
        let parser = ZipParser::new(&data);
        let eocd = parser.find_eocd().unwrap();
        assert_eq!(eocd.comment, b"hello");
        assert!(parser.read_central_directory(&eocd).unwrap().is_empty());
    }

    #[test]
    fn last_signature_wins() {
        let mut data = eocd_bytes(9, 1, 2, b"");
        data.extend_from_slice(&eocd_bytes(0, 0, 0, b"real"));
        let eocd = ZipParser::new(&data).find_eocd().unwrap();
        assert_eq!(eocd.total_entries, 0);
        assert_eq!(eocd.comment, b"real");
    }

    #[test]
    fn truncated_comment_is_kept_partially() {
        let mut data = eocd_bytes(0, 0, 0, b"abcdef");
        data.truncate(data.len() - 3);
        let eocd = ZipParser::new(&data).find_eocd().unwrap();
        assert_eq!(eocd.comment, b"abc");
    }

    #[test]
    fn structural_failures() {
        assert!(matches!(
            ZipParser::new(b"PK").find_eocd(),
            Err(StructuralError::TooShort(2))
        ));
        assert!(matches!(
            ZipParser::new(&[0u8; 40]).find_eocd(),
            Err(StructuralError::MissingEndOfCentralDirectory)
        ));

        let mut data = vec![0u8; 30];
        data.extend_from_slice(b"PK\x05\x06\x00\x00");
        assert!(matches!(
            ZipParser::new(&data).find_eocd(),
            Err(StructuralError::TruncatedEndOfCentralDirectory(30))
        ));
    }

    #[test]
    fn declared_entries_without_directory_is_rejected() {
        let data = eocd_bytes(2, 0, 0, b"");
        let parser = ZipParser::new(&data);
        let eocd = parser.find_eocd().unwrap();
        assert!(matches!(
            parser.read_central_directory(&eocd),
            Err(StructuralError::EntryCountMismatch {
                declared: 2,
                found: 0
            })
        ));
    }
}
