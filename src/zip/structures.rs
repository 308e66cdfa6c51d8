use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Bzip2,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            12 => CompressionMethod::Bzip2,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Bzip2 => 12,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// General purpose bit flag of a local or central header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeneralPurposeFlags(pub u16);

impl GeneralPurposeFlags {
    pub const ENCRYPTED: u16 = 1 << 0;
    pub const DATA_DESCRIPTOR: u16 = 1 << 3;

    pub fn is_encrypted(&self) -> bool {
        self.0 & Self::ENCRYPTED != 0
    }

    /// Sizes and CRC in the local header are placeholders; a Data Descriptor
    /// after the payload carries the real values.
    pub fn has_data_descriptor(&self) -> bool {
        self.0 & Self::DATA_DESCRIPTOR != 0
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;
    /// Fixed part following the signature.
    pub const BODY_SIZE: usize = 18;

    /// Parse the fixed body (everything after the signature). Returns the
    /// record with an empty comment and the declared comment length.
    pub fn from_body(data: &[u8]) -> Option<(Self, u16)> {
        if data.len() < Self::BODY_SIZE {
            return None;
        }
        let mut cursor = Cursor::new(data);

        let record = Self {
            disk_number: cursor.read_u16::<LittleEndian>().ok()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>().ok()?,
            disk_entries: cursor.read_u16::<LittleEndian>().ok()?,
            total_entries: cursor.read_u16::<LittleEndian>().ok()?,
            cd_size: cursor.read_u32::<LittleEndian>().ok()?,
            cd_offset: cursor.read_u32::<LittleEndian>().ok()?,
            comment: Vec::new(),
        };
        let comment_len = cursor.read_u16::<LittleEndian>().ok()?;
        Some((record, comment_len))
    }

    pub fn comment_lossy(&self) -> String {
        String::from_utf8_lossy(&self.comment).into_owned()
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Optional prefix of a Data Descriptor
pub const DATA_DESCRIPTOR_SIGNATURE: &[u8] = b"PK\x07\x08";

/// One record of the Central Directory
#[derive(Debug, Clone)]
pub struct CentralDirectoryEntry {
    pub file_name: String,
    pub version_made_by: u16,
    pub flags: GeneralPurposeFlags,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub lfh_offset: u64,
    pub extra_field: Vec<u8>,
    pub comment: Vec<u8>,
    pub is_directory: bool,
}

impl CentralDirectoryEntry {
    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    /// Last path component of the archive name.
    pub fn basename(&self) -> &str {
        let trimmed = self.file_name.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// Directory under `root` that will contain this entry.
    pub fn target_dir(&self, root: &Path) -> PathBuf {
        match Path::new(&self.file_name).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
            _ => root.to_path_buf(),
        }
    }
}

/// Fixed fields of a Local File Header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: GeneralPurposeFlags,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    /// Parse a header starting at its signature. `None` if the signature is
    /// absent or the fixed part is cut short.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < LFH_SIZE || &data[0..4] != LFH_SIGNATURE {
            return None;
        }
        let mut cursor = Cursor::new(&data[4..LFH_SIZE]);

        Some(Self {
            version_needed: cursor.read_u16::<LittleEndian>().ok()?,
            flags: GeneralPurposeFlags(cursor.read_u16::<LittleEndian>().ok()?),
            compression_method: CompressionMethod::from_u16(
                cursor.read_u16::<LittleEndian>().ok()?,
            ),
            last_mod_time: cursor.read_u16::<LittleEndian>().ok()?,
            last_mod_date: cursor.read_u16::<LittleEndian>().ok()?,
            crc32: cursor.read_u32::<LittleEndian>().ok()?,
            compressed_size: cursor.read_u32::<LittleEndian>().ok()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>().ok()?,
            file_name_length: cursor.read_u16::<LittleEndian>().ok()?,
            extra_field_length: cursor.read_u16::<LittleEndian>().ok()?,
        })
    }

    /// Bytes between the header start and the payload.
    pub fn header_len(&self) -> usize {
        LFH_SIZE + self.file_name_length as usize + self.extra_field_length as usize
    }
}

/// Trailing record written after streamed entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl DataDescriptor {
    pub const SIZE: usize = 12;

    /// Parse a descriptor starting right after the payload, skipping the
    /// optional signature.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let body = match data.get(0..4) {
            Some(sig) if sig == DATA_DESCRIPTOR_SIGNATURE => &data[4..],
            _ => data,
        };
        if body.len() < Self::SIZE {
            return None;
        }
        let mut cursor = Cursor::new(body);

        Some(Self {
            crc32: cursor.read_u32::<LittleEndian>().ok()?,
            compressed_size: cursor.read_u32::<LittleEndian>().ok()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>().ok()?,
        })
    }
}

/// A Local File Header reconciled with its Data Descriptor, plus the payload.
#[derive(Debug, Clone)]
pub struct LocalEntry<'a> {
    pub header: LocalFileHeader,
    pub descriptor: Option<DataDescriptor>,
    pub payload: &'a [u8],
}

impl LocalEntry<'_> {
    pub fn crc32(&self) -> u32 {
        self.descriptor.map_or(self.header.crc32, |dd| dd.crc32)
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.descriptor
            .map_or(self.header.uncompressed_size, |dd| dd.uncompressed_size) as u64
    }

    pub fn is_encrypted(&self) -> bool {
        self.header.flags.is_encrypted()
    }
}
