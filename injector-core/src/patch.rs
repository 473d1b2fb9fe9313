//! Writes ticket and script payloads into a Wonder Card block.
//!
//! All offsets below are relative to the game's Wonder Card base.

use serde::Serialize;
use tracing::debug;

use crate::checksum::{block_checksum, crc16, CrcTable, FOOTER_SPAN};
use crate::save::{BLOCK_SIZE, FOOTER_CHECKSUM_OFFSET};
use crate::tickets::Game;
use crate::InjectError;

pub const TICKET_LEN: usize = 332;
pub const SCRIPT_LEN: usize = 1000;

pub const TICKET_CRC_OFFSET: usize = 0;
pub const TICKET_OFFSET: usize = 4;
pub const TERMINATOR_OFFSET: usize = 346;
pub const SCRIPT_CRC_OFFSET: usize = 828;
pub const SCRIPT_OFFSET: usize = 832;

const REGION_LEN: usize = SCRIPT_OFFSET + SCRIPT_LEN;

// Both regions must stay inside the checksummed part of the block.
const _: () = assert!(Game::Emerald.wonder_card_base() + REGION_LEN <= FOOTER_SPAN);
const _: () = assert!(Game::FireRedLeafGreen.wonder_card_base() + REGION_LEN <= FOOTER_SPAN);

/// Stored value next to the value recomputed from the block contents.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChecksumPair {
    pub stored: u16,
    pub computed: u16,
}

impl ChecksumPair {
    pub fn is_valid(&self) -> bool {
        self.stored == self.computed
    }
}

fn read_u16_le(block: &[u8; BLOCK_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([block[offset], block[offset + 1]])
}

/// Footer checksum currently stored in the block (big-endian).
pub fn stored_footer_checksum(block: &[u8; BLOCK_SIZE]) -> u16 {
    u16::from_be_bytes([
        block[FOOTER_CHECKSUM_OFFSET],
        block[FOOTER_CHECKSUM_OFFSET + 1],
    ])
}

pub fn footer_status(block: &[u8; BLOCK_SIZE]) -> ChecksumPair {
    ChecksumPair {
        stored: stored_footer_checksum(block),
        computed: block_checksum(block),
    }
}

/// Recomputes the footer checksum and stores it big-endian, unlike the
/// little-endian payload CRCs.
pub fn write_footer_checksum(block: &mut [u8; BLOCK_SIZE]) -> u16 {
    let checksum = block_checksum(block);
    block[FOOTER_CHECKSUM_OFFSET..FOOTER_CHECKSUM_OFFSET + 2]
        .copy_from_slice(&checksum.to_be_bytes());
    checksum
}

/// Location of a game's Wonder Card region inside its block.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WonderCardRegion {
    base: usize,
}

impl WonderCardRegion {
    pub fn for_game(game: Game) -> Self {
        Self {
            base: game.wonder_card_base(),
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn ticket<'b>(&self, block: &'b [u8; BLOCK_SIZE]) -> &'b [u8] {
        let start = self.base + TICKET_OFFSET;
        &block[start..start + TICKET_LEN]
    }

    pub fn script<'b>(&self, block: &'b [u8; BLOCK_SIZE]) -> &'b [u8] {
        let start = self.base + SCRIPT_OFFSET;
        &block[start..start + SCRIPT_LEN]
    }

    pub fn stored_ticket_crc(&self, block: &[u8; BLOCK_SIZE]) -> u16 {
        read_u16_le(block, self.base + TICKET_CRC_OFFSET)
    }

    pub fn stored_script_crc(&self, block: &[u8; BLOCK_SIZE]) -> u16 {
        read_u16_le(block, self.base + SCRIPT_CRC_OFFSET)
    }

    pub fn ticket_status(&self, block: &[u8; BLOCK_SIZE], table: &CrcTable) -> ChecksumPair {
        ChecksumPair {
            stored: self.stored_ticket_crc(block),
            computed: crc16(table, self.ticket(block)),
        }
    }

    pub fn script_status(&self, block: &[u8; BLOCK_SIZE], table: &CrcTable) -> ChecksumPair {
        ChecksumPair {
            stored: self.stored_script_crc(block),
            computed: crc16(table, self.script(block)),
        }
    }

    /// Writes both payloads with their CRCs and the terminator, then
    /// refreshes the block footer. Payload lengths are checked before
    /// anything is written.
    pub fn patch(
        &self,
        block: &mut [u8; BLOCK_SIZE],
        ticket: &[u8],
        script: &[u8],
        table: &CrcTable,
    ) -> Result<(), InjectError> {
        check_len("ticket", ticket, TICKET_LEN)?;
        check_len("script", script, SCRIPT_LEN)?;

        let base = self.base;

        let ticket_crc = crc16(table, ticket);
        block[base + TICKET_OFFSET..base + TICKET_OFFSET + TICKET_LEN].copy_from_slice(ticket);
        block[base + TICKET_CRC_OFFSET..base + TICKET_CRC_OFFSET + 2]
            .copy_from_slice(&ticket_crc.to_le_bytes());
        block[base + TERMINATOR_OFFSET..base + TERMINATOR_OFFSET + 2].copy_from_slice(&[0xFF, 0xFF]);

        let script_crc = crc16(table, script);
        block[base + SCRIPT_OFFSET..base + SCRIPT_OFFSET + SCRIPT_LEN].copy_from_slice(script);
        block[base + SCRIPT_CRC_OFFSET..base + SCRIPT_CRC_OFFSET + 2]
            .copy_from_slice(&script_crc.to_le_bytes());

        let footer = write_footer_checksum(block);

        debug!(
            "Patched Wonder Card at base {base:#x}: ticket CRC {ticket_crc:#06x}, script CRC {script_crc:#06x}, footer {footer:#06x}"
        );
        Ok(())
    }
}

fn check_len(payload: &'static str, data: &[u8], expected: usize) -> Result<(), InjectError> {
    if data.len() != expected {
        return Err(InjectError::PayloadSizeMismatch {
            payload,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::tests::test_table;

    fn payloads() -> (Vec<u8>, Vec<u8>) {
        let ticket = (0..TICKET_LEN).map(|i| (i % 251) as u8).collect();
        let script = (0..SCRIPT_LEN).map(|i| (i * 7 % 256) as u8).collect();
        (ticket, script)
    }

    #[test]
    fn patch_writes_layout() {
        let table = test_table();
        let (ticket, script) = payloads();
        let region = WonderCardRegion::for_game(Game::Emerald);
        let mut block = [0u8; BLOCK_SIZE];

        region.patch(&mut block, &ticket, &script, &table).unwrap();

        let base = 0x56C;
        assert_eq!(&block[base + 4..base + 4 + TICKET_LEN], &ticket[..]);
        assert_eq!(&block[base + 832..base + 832 + SCRIPT_LEN], &script[..]);
        assert_eq!(&block[base + 346..base + 348], &[0xFF, 0xFF]);
        assert_eq!(
            u16::from_le_bytes([block[base], block[base + 1]]),
            crc16(&table, &ticket)
        );
        assert_eq!(
            u16::from_le_bytes([block[base + 828], block[base + 829]]),
            crc16(&table, &script)
        );
        // Bytes between the payload CRC and the ticket are left alone.
        assert_eq!(&block[base + 2..base + 4], &[0, 0]);
    }

    #[test]
    fn patched_block_verifies() {
        let table = test_table();
        let (ticket, script) = payloads();
        let region = WonderCardRegion::for_game(Game::FireRedLeafGreen);
        let mut block = [0x33u8; BLOCK_SIZE];

        region.patch(&mut block, &ticket, &script, &table).unwrap();

        assert!(region.ticket_status(&block, &table).is_valid());
        assert!(region.script_status(&block, &table).is_valid());
        assert!(footer_status(&block).is_valid());
        assert_eq!(region.ticket(&block), &ticket[..]);
    }

    #[test]
    fn footer_is_big_endian() {
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0x34;
        block[1] = 0x12;
        assert_eq!(write_footer_checksum(&mut block), 0x3412);
        assert_eq!(
            &block[FOOTER_CHECKSUM_OFFSET..FOOTER_CHECKSUM_OFFSET + 2],
            &[0x34, 0x12]
        );
    }

    #[test]
    fn wrong_payload_size_leaves_block_untouched() {
        let table = test_table();
        let (ticket, script) = payloads();
        let region = WonderCardRegion::for_game(Game::Emerald);
        let mut block = [0xAAu8; BLOCK_SIZE];

        let err = region
            .patch(&mut block, &ticket, &script[..999], &table)
            .unwrap_err();
        assert!(matches!(
            err,
            InjectError::PayloadSizeMismatch { payload: "script", expected: 1000, actual: 999 }
        ));

        let err = region
            .patch(&mut block, &ticket[..10], &script, &table)
            .unwrap_err();
        assert!(matches!(err, InjectError::PayloadSizeMismatch { payload: "ticket", .. }));
        assert!(block.iter().all(|&b| b == 0xAA));
    }
}
