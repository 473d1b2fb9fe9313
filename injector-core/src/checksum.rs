//! Checksums used by Generation III saves.
//!
//! Both routines mirror the game ROM exactly, including the non-standard
//! CRC seed/final inversion and the byte-swapped block footer. Do not
//! normalise them to a textbook CRC-16 variant.

use crate::save::BLOCK_SIZE;

/// Initial accumulator value used by the ROM's CRC-16 routine.
pub const CRC16_SEED: u16 = 0x1121;

/// Number of 32-bit words covered by the block footer checksum.
pub const FOOTER_WORDS: usize = 962;

/// Bytes at the start of a block covered by the footer checksum (3848).
pub const FOOTER_SPAN: usize = FOOTER_WORDS * 4;

/// Size in bytes of a serialised CRC lookup table.
pub const CRC_TABLE_LEN: usize = 512;

/// 256-entry CRC-16 lookup table, as shipped alongside the ticket data.
#[derive(Clone, PartialEq, Eq)]
pub struct CrcTable {
    entries: [u16; 256],
}

impl CrcTable {
    pub fn from_entries(entries: [u16; 256]) -> Self {
        Self { entries }
    }

    /// Parses 256 little-endian entries.
    pub fn from_array(raw: &[u8; CRC_TABLE_LEN]) -> Self {
        let mut entries = [0u16; 256];
        for (entry, pair) in entries.iter_mut().zip(raw.chunks_exact(2)) {
            *entry = u16::from_le_bytes([pair[0], pair[1]]);
        }
        Self { entries }
    }

    /// Like [`CrcTable::from_array`], but returns `None` unless `raw` is
    /// exactly 512 bytes long.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        <&[u8; CRC_TABLE_LEN]>::try_from(raw).ok().map(Self::from_array)
    }

    #[inline]
    pub fn entry(&self, index: u8) -> u16 {
        self.entries[index as usize]
    }
}

impl std::fmt::Debug for CrcTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrcTable")
            .field("first", &format_args!("{:#06x}", self.entries[0]))
            .field("last", &format_args!("{:#06x}", self.entries[255]))
            .finish()
    }
}

/// Table-driven CRC-16 over `data`.
pub fn crc16(table: &CrcTable, data: &[u8]) -> u16 {
    let mut crc = CRC16_SEED;
    for &byte in data {
        let index = (crc ^ byte as u16) as u8;
        crc = table.entry(index) ^ (crc >> 8);
    }
    !crc
}

/// Footer checksum of a block: the first 962 little-endian words are
/// summed with wrap-around, the halves folded together (the carry out of
/// the fold is dropped), and the result byte-swapped.
pub fn block_checksum(block: &[u8; BLOCK_SIZE]) -> u16 {
    let mut sum: u32 = 0;
    for word in block[..FOOTER_SPAN].chunks_exact(4) {
        sum = sum.wrapping_add(u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
    }

    let folded = ((sum >> 16) + (sum & 0xFFFF)) as u16;
    folded.swap_bytes()
}
