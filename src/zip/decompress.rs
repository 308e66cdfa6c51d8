//! Compression method dispatch.

#[cfg(any(feature = "deflate", feature = "bzip2"))]
use std::io::Read;

use crate::error::{EntryError, ZipError};

use super::structures::CompressionMethod;

/// Fail up front when the build cannot inflate DEFLATE data, rather than
/// partway through an archive.
pub fn ensure_backends() -> Result<(), ZipError> {
    if cfg!(feature = "deflate") {
        Ok(())
    } else {
        Err(ZipError::UnsupportedFeature("DEFLATE"))
    }
}

/// Decode `payload` according to `method`.
///
/// Output never exceeds `expected_size` bytes.
pub fn decompress(
    method: CompressionMethod,
    payload: &[u8],
    expected_size: u64,
) -> Result<Vec<u8>, EntryError> {
    match method {
        CompressionMethod::Stored => Ok(payload.to_vec()),
        CompressionMethod::Deflate => inflate(payload, expected_size),
        CompressionMethod::Bzip2 => bunzip(payload, expected_size),
        CompressionMethod::Unknown(code) => Err(EntryError::UnsupportedMethod(code)),
    }
}

#[cfg(feature = "deflate")]
fn inflate(payload: &[u8], expected_size: u64) -> Result<Vec<u8>, EntryError> {
    let decoder = flate2::read::DeflateDecoder::new(payload);
    read_bounded(decoder, expected_size)
}

#[cfg(not(feature = "deflate"))]
fn inflate(_payload: &[u8], _expected_size: u64) -> Result<Vec<u8>, EntryError> {
    Err(EntryError::UnsupportedMethod(CompressionMethod::Deflate.as_u16()))
}

#[cfg(feature = "bzip2")]
fn bunzip(payload: &[u8], expected_size: u64) -> Result<Vec<u8>, EntryError> {
    let decoder = bzip2::read::BzDecoder::new(payload);
    read_bounded(decoder, expected_size)
}

#[cfg(not(feature = "bzip2"))]
fn bunzip(_payload: &[u8], _expected_size: u64) -> Result<Vec<u8>, EntryError> {
    Err(EntryError::UnsupportedMethod(CompressionMethod::Bzip2.as_u16()))
}

#[cfg(any(feature = "deflate", feature = "bzip2"))]
fn read_bounded<R: Read>(decoder: R, expected_size: u64) -> Result<Vec<u8>, EntryError> {
    let mut out = Vec::with_capacity(expected_size.min(1 << 20) as usize);
    decoder
        .take(expected_size)
        .read_to_end(&mut out)
        .map_err(EntryError::Decompress)?;
    Ok(out)
}
