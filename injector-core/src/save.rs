//! Read-only view over a dual-slot Generation III save image.

use serde::Serialize;

use crate::tickets::GameFamily;
use crate::InjectError;

/// Bytes examined when deciding whether a slot holds data.
pub const SLOT_SIZE: usize = 0xDFFF;
pub const SLOT_2_OFFSET: usize = 0xE000;
/// Smallest image in which slot 2 is addressable.
pub const MIN_IMAGE_LEN: usize = SLOT_2_OFFSET + SLOT_SIZE;

pub const BLOCK_SIZE: usize = 0x1000;
pub const BLOCKS_PER_SLOT: usize = 15;

// Block-relative offsets.
pub const MARKER_OFFSET: usize = 0xFF4;
pub const FOOTER_CHECKSUM_OFFSET: usize = 0xFF6;
pub const SAVE_COUNTER_OFFSET: usize = 0xFFC;
pub const GAME_CODE_OFFSET: usize = 0xAC;

pub const DETECTION_MARKER: u8 = 0x00;
pub const WONDER_CARD_MARKER: u8 = 0x04;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::One, Slot::Two];

    /// Byte offset of the slot within the image.
    pub fn offset(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => SLOT_2_OFFSET,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot {}", self.number())
    }
}

/// A slot is valid when any of its bytes differs from erased flash (0xFF).
pub fn is_slot_valid(image: &[u8], slot: Slot) -> bool {
    image
        .iter()
        .skip(slot.offset())
        .take(SLOT_SIZE)
        .any(|&b| b != 0xFF)
}

/// Sum of the four raw counter bytes. This is a "newer slot wins"
/// heuristic, not a decoded integer.
pub fn save_counter(image: &[u8], slot: Slot) -> Option<u32> {
    let start = slot.offset() + SAVE_COUNTER_OFFSET;
    let raw = image.get(start..start + 4)?;
    Some(raw.iter().map(|&b| b as u32).sum())
}

/// Picks the authoritative slot. When both are valid, slot 1 wins ties.
pub fn determine_active_slot(image: &[u8]) -> Option<Slot> {
    match (is_slot_valid(image, Slot::One), is_slot_valid(image, Slot::Two)) {
        (false, false) => None,
        (false, true) => Some(Slot::Two),
        (true, false) => Some(Slot::One),
        (true, true) => {
            let first = save_counter(image, Slot::One).unwrap_or(0);
            let second = save_counter(image, Slot::Two).unwrap_or(0);
            if first >= second {
                Some(Slot::One)
            } else {
                Some(Slot::Two)
            }
        }
    }
}

/// Slot-relative offset of the first block (index-ascending) whose marker
/// byte equals `marker`. Blocks that do not fit inside the image are
/// skipped.
pub fn find_block(image: &[u8], slot: Slot, marker: u8) -> Option<usize> {
    (0..BLOCKS_PER_SLOT)
        .map(|index| index * BLOCK_SIZE)
        .filter(|&offset| slot.offset() + offset + BLOCK_SIZE <= image.len())
        .find(|&offset| image[slot.offset() + offset + MARKER_OFFSET] == marker)
}

/// Borrowed view of a save image that has passed the length check.
#[derive(Copy, Clone, Debug)]
pub struct SaveView<'a> {
    bytes: &'a [u8],
}

impl<'a> SaveView<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, InjectError> {
        if bytes.len() < MIN_IMAGE_LEN {
            return Err(InjectError::InvalidFile { len: bytes.len() });
        }
        Ok(Self { bytes })
    }

    pub fn active_slot(&self) -> Option<Slot> {
        determine_active_slot(self.bytes)
    }

    pub fn save_counter(&self, slot: Slot) -> u32 {
        save_counter(self.bytes, slot).unwrap_or(0)
    }

    pub fn find_block(&self, slot: Slot, marker: u8) -> Option<usize> {
        find_block(self.bytes, slot, marker)
    }

    /// The block at a slot-relative offset returned by [`Self::find_block`].
    pub fn block(&self, slot: Slot, offset: usize) -> Option<&'a [u8; BLOCK_SIZE]> {
        let start = slot.offset() + offset;
        self.bytes.get(start..start + BLOCK_SIZE)?.try_into().ok()
    }

    /// Game family recorded in a detection block.
    pub fn game_family(&self, slot: Slot, detection_offset: usize) -> Option<GameFamily> {
        let block = self.block(slot, detection_offset)?;
        Some(GameFamily::from_game_code(read_game_code(block)))
    }
}

pub fn read_game_code(block: &[u8; BLOCK_SIZE]) -> u32 {
    let raw = &block[GAME_CODE_OFFSET..GAME_CODE_OFFSET + 4];
    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const IMAGE_LEN: usize = 2 * SLOT_2_OFFSET;

    pub(crate) fn erased_image() -> Vec<u8> {
        vec![0xFF; IMAGE_LEN]
    }

    pub(crate) fn set_marker(image: &mut [u8], slot: Slot, index: usize, marker: u8) {
        image[slot.offset() + index * BLOCK_SIZE + MARKER_OFFSET] = marker;
    }

    pub(crate) fn set_counter(image: &mut [u8], slot: Slot, raw: [u8; 4]) {
        let start = slot.offset() + SAVE_COUNTER_OFFSET;
        image[start..start + 4].copy_from_slice(&raw);
    }

    #[test]
    fn both_slots_erased_is_none() {
        assert_eq!(determine_active_slot(&erased_image()), None);
    }

    #[test]
    fn only_second_slot_valid() {
        let mut image = erased_image();
        image[SLOT_2_OFFSET + 10] = 0x00;
        assert_eq!(determine_active_slot(&image), Some(Slot::Two));
    }

    #[test]
    fn only_first_slot_valid() {
        let mut image = erased_image();
        image[10] = 0x00;
        assert_eq!(determine_active_slot(&image), Some(Slot::One));
    }

    #[test]
    fn higher_counter_wins() {
        let mut image = erased_image();
        set_counter(&mut image, Slot::One, [10, 0, 0, 0]);
        set_counter(&mut image, Slot::Two, [5, 5, 5, 5]);
        assert_eq!(determine_active_slot(&image), Some(Slot::Two));

        set_counter(&mut image, Slot::One, [0, 0, 0, 21]);
        assert_eq!(determine_active_slot(&image), Some(Slot::One));
    }

    #[test]
    fn counter_tie_prefers_first_slot() {
        let mut image = erased_image();
        set_counter(&mut image, Slot::One, [0, 0, 0, 20]);
        set_counter(&mut image, Slot::Two, [20, 0, 0, 0]);
        assert_eq!(determine_active_slot(&image), Some(Slot::One));
    }

    #[test]
    fn counter_is_byte_sum() {
        let mut image = erased_image();
        set_counter(&mut image, Slot::One, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(save_counter(&image, Slot::One), Some(10));
        // Erased counter bytes still sum.
        assert_eq!(save_counter(&image, Slot::Two), Some(4 * 0xFF));
    }

    #[test]
    fn find_block_returns_first_match() {
        let mut image = erased_image();
        set_marker(&mut image, Slot::Two, 3, WONDER_CARD_MARKER);
        set_marker(&mut image, Slot::Two, 7, WONDER_CARD_MARKER);
        assert_eq!(
            find_block(&image, Slot::Two, WONDER_CARD_MARKER),
            Some(3 * BLOCK_SIZE)
        );
        assert_eq!(find_block(&image, Slot::One, WONDER_CARD_MARKER), None);
    }

    #[test]
    fn find_block_skips_blocks_past_image_end() {
        let mut image = erased_image();
        // Slot 2 index 14 would start exactly at the end of the image.
        assert_eq!(find_block(&image, Slot::Two, 0xFF), Some(0));
        for index in 0..14 {
            set_marker(&mut image, Slot::Two, index, 0x01);
        }
        assert_eq!(find_block(&image, Slot::Two, 0xFF), None);
    }

    #[test]
    fn view_rejects_short_image() {
        let short = vec![0u8; MIN_IMAGE_LEN - 1];
        assert!(matches!(
            SaveView::new(&short),
            Err(InjectError::InvalidFile { len }) if len == MIN_IMAGE_LEN - 1
        ));
        assert!(SaveView::new(&vec![0u8; MIN_IMAGE_LEN]).is_ok());
    }

    #[test]
    fn view_reads_game_family() {
        let mut image = vec![0u8; IMAGE_LEN];
        let start = SLOT_2_OFFSET + 2 * BLOCK_SIZE + GAME_CODE_OFFSET;
        image[start..start + 4].copy_from_slice(&1u32.to_le_bytes());
        let view = SaveView::new(&image).unwrap();
        assert_eq!(
            view.game_family(Slot::Two, 2 * BLOCK_SIZE),
            Some(GameFamily::FireRedLeafGreen)
        );
        assert_eq!(view.game_family(Slot::Two, 0), Some(GameFamily::RubySapphire));
    }
}
