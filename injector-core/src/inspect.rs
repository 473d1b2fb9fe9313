//! Read-only report on a save image, without modifying it.

use serde::Serialize;

use crate::checksum::CrcTable;
use crate::inject::locate;
use crate::patch::{footer_status, ChecksumPair, WonderCardRegion};
use crate::save::{SaveView, Slot};
use crate::tickets::GameFamily;
use crate::InjectError;

#[derive(Clone, Debug, Serialize)]
pub struct WonderCardStatus {
    pub base: usize,
    pub ticket_crc: ChecksumPair,
    pub script_crc: ChecksumPair,
}

#[derive(Clone, Debug, Serialize)]
pub struct SaveReport {
    pub active_slot: Slot,
    pub counters: [u32; 2],
    pub family: GameFamily,
    pub wonder_card_offset: usize,
    pub detection_offset: usize,
    pub footer: ChecksumPair,
    /// Only present for supported families when a CRC table was given.
    pub wonder_card: Option<WonderCardStatus>,
}

impl SaveReport {
    pub fn is_consistent(&self) -> bool {
        self.footer.is_valid()
            && self
                .wonder_card
                .as_ref()
                .map_or(true, |wc| wc.ticket_crc.is_valid() && wc.script_crc.is_valid())
    }
}

pub fn inspect(save: &[u8], table: Option<&CrcTable>) -> Result<SaveReport, InjectError> {
    let view = SaveView::new(save)?;
    let located = locate(view)?;

    let wonder_card = match (located.family.game(), table) {
        (Some(game), Some(table)) => {
            let region = WonderCardRegion::for_game(game);
            Some(WonderCardStatus {
                base: region.base(),
                ticket_crc: region.ticket_status(located.wonder_card, table),
                script_crc: region.script_status(located.wonder_card, table),
            })
        }
        _ => None,
    };

    Ok(SaveReport {
        active_slot: located.slot,
        counters: [view.save_counter(Slot::One), view.save_counter(Slot::Two)],
        family: located.family,
        wonder_card_offset: located.wonder_card_offset,
        detection_offset: located.detection_offset,
        footer: footer_status(located.wonder_card),
        wonder_card,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::tests::test_table;
    use crate::inject::inject;
    use crate::inject::tests::{build_save, payloads};
    use crate::tickets::Game;

    #[test]
    fn reports_layout_without_table() {
        let save = build_save(Slot::Two, 1);
        let report = inspect(&save, None).unwrap();
        assert_eq!(report.active_slot, Slot::Two);
        assert_eq!(report.counters, [10, 20]);
        assert_eq!(report.family, GameFamily::FireRedLeafGreen);
        assert_eq!(report.wonder_card_offset, 4 * 0x1000);
        assert_eq!(report.detection_offset, 0);
        assert!(report.wonder_card.is_none());
    }

    #[test]
    fn injected_save_is_consistent() {
        let table = test_table();
        let (ticket, script) = payloads();
        let save = build_save(Slot::One, 99);

        let before = inspect(&save, Some(&table)).unwrap();
        assert!(!before.is_consistent());

        let patched = inject(&save, Game::Emerald, &ticket, &script, &table).unwrap();
        let after = inspect(&patched, Some(&table)).unwrap();
        assert!(after.is_consistent());
        assert_eq!(after.wonder_card.unwrap().base, 1388);
    }

    #[test]
    fn ruby_sapphire_reports_without_wonder_card() {
        let table = test_table();
        let save = build_save(Slot::One, 0);
        let report = inspect(&save, Some(&table)).unwrap();
        assert_eq!(report.family, GameFamily::RubySapphire);
        assert!(report.wonder_card.is_none());
    }

    #[test]
    fn shares_failures_with_injection() {
        assert!(matches!(inspect(&[], None), Err(InjectError::InvalidFile { len: 0 })));
        let erased = vec![0xFF; 2 * 0xE000];
        assert!(matches!(inspect(&erased, None), Err(InjectError::NoValidSave)));
    }
}
