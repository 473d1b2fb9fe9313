use tracing::{debug, info};

use crate::checksum::CrcTable;
use crate::patch::WonderCardRegion;
use crate::save::{SaveView, Slot, BLOCK_SIZE, DETECTION_MARKER, WONDER_CARD_MARKER};
use crate::tickets::{Game, GameFamily};
use crate::InjectError;

/// Blocks of the active slot that an injection touches or consults.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Located<'a> {
    pub slot: Slot,
    pub wonder_card_offset: usize,
    pub wonder_card: &'a [u8; BLOCK_SIZE],
    pub detection_offset: usize,
    pub family: GameFamily,
}

/// Validates the image, picks the active slot and finds both blocks.
pub(crate) fn locate(view: SaveView<'_>) -> Result<Located<'_>, InjectError> {
    let slot = view.active_slot().ok_or(InjectError::NoValidSave)?;
    debug!("Active save is {slot}");

    let wonder_card_offset = view
        .find_block(slot, WONDER_CARD_MARKER)
        .ok_or(InjectError::WonderCardBlockMissing)?;
    let detection_offset = view
        .find_block(slot, DETECTION_MARKER)
        .ok_or(InjectError::DetectionBlockMissing)?;

    // find_block only returns offsets of blocks that fit in the image.
    let wonder_card = view
        .block(slot, wonder_card_offset)
        .ok_or(InjectError::WonderCardBlockMissing)?;
    let family = view
        .game_family(slot, detection_offset)
        .ok_or(InjectError::DetectionBlockMissing)?;

    debug!(
        "Wonder Card block at {wonder_card_offset:#x}, detection block at {detection_offset:#x}, family {family}"
    );

    Ok(Located {
        slot,
        wonder_card_offset,
        wonder_card,
        detection_offset,
        family,
    })
}

/// Writes a ticket and its script into the active slot of `save` and
/// returns the patched image. `save` itself is never modified; on error
/// nothing is written anywhere.
pub fn inject(
    save: &[u8],
    selected: Game,
    ticket: &[u8],
    script: &[u8],
    table: &CrcTable,
) -> Result<Vec<u8>, InjectError> {
    let view = SaveView::new(save)?;
    let located = locate(view)?;

    let detected = located.family.game().ok_or(InjectError::UnsupportedGame)?;
    if detected != selected {
        return Err(InjectError::GameMismatch { selected, detected });
    }

    let mut block = *located.wonder_card;
    WonderCardRegion::for_game(selected).patch(&mut block, ticket, script, table)?;

    let start = located.slot.offset() + located.wonder_card_offset;
    let mut patched = save.to_vec();
    patched[start..start + BLOCK_SIZE].copy_from_slice(&block);

    info!(
        "Injected {selected} Wonder Card into {} (block at {start:#x})",
        located.slot
    );
    Ok(patched)
}
