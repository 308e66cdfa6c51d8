//! Archive builder and filesystem fakes shared by the integration tests.

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use memzip::{Filesystem, SecureDirectoryCreator};

pub const STORED: u16 = 0;
pub const DEFLATE: u16 = 8;
pub const BZIP2: u16 = 12;

/// 2021-06-09 13:45:30
const DOS_TIME: u16 = (13 << 11) | (45 << 5) | 15;
const DOS_DATE: u16 = (41 << 9) | (6 << 5) | 9;

#[derive(Debug, Clone)]
pub struct EntrySpec {
    pub name: String,
    pub content: Vec<u8>,
    pub method: u16,
    pub encrypted: bool,
    /// `Some(with_signature)` writes a Data Descriptor and zeroes the local
    /// header's CRC and sizes.
    pub descriptor: Option<bool>,
    pub crc_override: Option<u32>,
    pub offset_override: Option<u32>,
}

impl EntrySpec {
    pub fn new(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_vec(),
            method: STORED,
            encrypted: false,
            descriptor: None,
            crc_override: None,
            offset_override: None,
        }
    }

    pub fn method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    pub fn streamed(mut self, with_signature: bool) -> Self {
        self.descriptor = Some(with_signature);
        self
    }

    pub fn crc(mut self, crc: u32) -> Self {
        self.crc_override = Some(crc);
        self
    }

    pub fn local_offset(mut self, offset: u32) -> Self {
        self.offset_override = Some(offset);
        self
    }

    fn flags(&self) -> u16 {
        let mut flags = 0;
        if self.encrypted {
            flags |= 1 << 0;
        }
        if self.descriptor.is_some() {
            flags |= 1 << 3;
        }
        flags
    }

    fn payload(&self) -> Vec<u8> {
        let mut payload = match self.method {
            DEFLATE => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&self.content).unwrap();
                encoder.finish().unwrap()
            }
            #[cfg(feature = "bzip2")]
            BZIP2 => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(&self.content).unwrap();
                encoder.finish().unwrap()
            }
            _ => self.content.clone(),
        };
        if self.encrypted {
            // Stand-in for real encryption: the bytes no longer match the CRC
            let mut header = vec![0xa5u8; 12];
            payload.iter_mut().for_each(|b| *b ^= 0x5a);
            header.append(&mut payload);
            payload = header;
        }
        payload
    }
}

/// Writes ZIP archives byte by byte so tests control every field.
#[derive(Debug, Clone, Default)]
pub struct ZipBuilder {
    prefix: Vec<u8>,
    entries: Vec<EntrySpec>,
    comment: Vec<u8>,
    declared_entries: Option<u16>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, content: &[u8]) -> Self {
        self.entry(EntrySpec::new(name, content))
    }

    pub fn deflated(self, name: &str, content: &[u8]) -> Self {
        self.entry(EntrySpec::new(name, content).method(DEFLATE))
    }

    pub fn directory(self, name: &str) -> Self {
        assert!(name.ends_with('/'));
        self.entry(EntrySpec::new(name, b""))
    }

    pub fn entry(mut self, entry: EntrySpec) -> Self {
        self.entries.push(entry);
        self
    }

    /// Bytes placed before the first local header.
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Entry count written into the End of Central Directory.
    pub fn declare_entries(mut self, count: u16) -> Self {
        self.declared_entries = Some(count);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.prefix.clone();
        let mut cd = Vec::new();

        for entry in &self.entries {
            let payload = entry.payload();
            let crc = entry
                .crc_override
                .unwrap_or_else(|| crc32fast::hash(&entry.content));
            let compressed_size = payload.len() as u32;
            let uncompressed_size = entry.content.len() as u32;
            let local_offset = out.len() as u32;
            let name = entry.name.as_bytes();

            let (local_crc, local_csize, local_usize) = if entry.descriptor.is_some() {
                (0, 0, 0)
            } else {
                (crc, compressed_size, uncompressed_size)
            };

            out.extend_from_slice(b"PK\x03\x04");
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(entry.flags()).unwrap();
            out.write_u16::<LittleEndian>(entry.method).unwrap();
            out.write_u16::<LittleEndian>(DOS_TIME).unwrap();
            out.write_u16::<LittleEndian>(DOS_DATE).unwrap();
            out.write_u32::<LittleEndian>(local_crc).unwrap();
            out.write_u32::<LittleEndian>(local_csize).unwrap();
            out.write_u32::<LittleEndian>(local_usize).unwrap();
            out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.extend_from_slice(name);
            out.extend_from_slice(&payload);

            if let Some(with_signature) = entry.descriptor {
                if with_signature {
                    out.extend_from_slice(b"PK\x07\x08");
                }
                out.write_u32::<LittleEndian>(crc).unwrap();
                out.write_u32::<LittleEndian>(compressed_size).unwrap();
                out.write_u32::<LittleEndian>(uncompressed_size).unwrap();
            }

            let external = if entry.name.ends_with('/') { 0x10 } else { 0 };
            cd.extend_from_slice(b"PK\x01\x02");
            cd.write_u16::<LittleEndian>(0x031e).unwrap();
            cd.write_u16::<LittleEndian>(20).unwrap();
            cd.write_u16::<LittleEndian>(entry.flags()).unwrap();
            cd.write_u16::<LittleEndian>(entry.method).unwrap();
            cd.write_u16::<LittleEndian>(DOS_TIME).unwrap();
            cd.write_u16::<LittleEndian>(DOS_DATE).unwrap();
            cd.write_u32::<LittleEndian>(crc).unwrap();
            cd.write_u32::<LittleEndian>(compressed_size).unwrap();
            cd.write_u32::<LittleEndian>(uncompressed_size).unwrap();
            cd.write_u16::<LittleEndian>(name.len() as u16).unwrap();
            cd.write_u16::<LittleEndian>(0).unwrap();
            cd.write_u16::<LittleEndian>(0).unwrap();
            cd.write_u16::<LittleEndian>(0).unwrap();
            cd.write_u16::<LittleEndian>(0).unwrap();
            cd.write_u32::<LittleEndian>(external).unwrap();
            cd.write_u32::<LittleEndian>(entry.offset_override.unwrap_or(local_offset))
                .unwrap();
            cd.extend_from_slice(name);
        }

        let cd_offset = out.len() as u32;
        let count = self
            .declared_entries
            .unwrap_or(self.entries.len() as u16);
        out.extend_from_slice(&cd);

        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(count).unwrap();
        out.write_u16::<LittleEndian>(count).unwrap();
        out.write_u32::<LittleEndian>(cd.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.extend_from_slice(&self.comment);
        out
    }
}

/// Deterministic xorshift generator for generated fixtures.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        // Small alphabet so DEFLATE has something to compress
        (0..len).map(|_| b"abcdefgh\n"[self.below(9) as usize]).collect()
    }
}

/// In-memory filesystem that records every call.
#[derive(Debug, Default)]
pub struct RecordingFs {
    pub files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    pub dirs: Mutex<BTreeSet<PathBuf>>,
    pub read_only: BTreeSet<PathBuf>,
    pub failing_dirs: BTreeSet<PathBuf>,
    pub calls: AtomicUsize,
}

impl RecordingFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.to_vec());
        self
    }

    pub fn read_only(mut self, path: impl Into<PathBuf>) -> Self {
        self.read_only.insert(path.into());
        self
    }

    /// Directory creation at `path` fails.
    pub fn failing_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing_dirs.insert(path.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.lock().unwrap().contains(path.as_ref())
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Filesystem for RecordingFs {
    fn exists(&self, path: &Path) -> bool {
        self.touch();
        self.files.lock().unwrap().contains_key(path) || self.dirs.lock().unwrap().contains(path)
    }

    fn is_writable(&self, path: &Path) -> bool {
        self.touch();
        !self.read_only.contains(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.touch();
        if self.read_only.contains(path) {
            return Err(io::ErrorKind::PermissionDenied.into());
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }
}

impl SecureDirectoryCreator for RecordingFs {
    fn create(&self, path: &Path) -> io::Result<()> {
        self.touch();
        if self.failing_dirs.contains(path) {
            return Err(io::ErrorKind::PermissionDenied.into());
        }
        let mut dirs = self.dirs.lock().unwrap();
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }
}
