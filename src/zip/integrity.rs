//! CRC-32 verification of entry contents.

pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// CRC-32 as eight lowercase hex digits.
pub fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32(data))
}

/// Check `declared` against the decompressed bytes, falling back to the raw
/// payload for entries whose stored/compressed status is ambiguous.
pub fn verify(decompressed: &[u8], compressed: &[u8], declared: u32) -> bool {
    crc32(decompressed) == declared || crc32(compressed) == declared
}
