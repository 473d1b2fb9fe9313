//! Loads the CRC table and ticket payloads from a resources directory.
//!
//! Layout:
//!
//! ```text
//! <root>/crc16_table.bin
//! <root>/<game>/<ticket>/wondercard.bin
//! <root>/<game>/<ticket>/script.bin
//! ```
//!
//! `<game>` and `<ticket>` are the slugs from [`crate::tickets`]. Every blob
//! is checked for its exact size here so the injector never sees a short
//! payload from disk.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::checksum::{CrcTable, CRC_TABLE_LEN};
use crate::patch::{SCRIPT_LEN, TICKET_LEN};
use crate::tickets::{Game, Ticket};
use crate::{InjectorError, Result};

pub const CRC_TABLE_FILE: &str = "crc16_table.bin";
pub const TICKET_FILE: &str = "wondercard.bin";
pub const SCRIPT_FILE: &str = "script.bin";

pub struct TicketPayloads {
    pub ticket: [u8; TICKET_LEN],
    pub script: [u8; SCRIPT_LEN],
}

pub struct ResourcePack {
    root: PathBuf,
    crc_table: CrcTable,
}

fn read_blob<const N: usize>(path: &Path) -> Result<[u8; N]> {
    let raw = fs::read(path).map_err(|e| InjectorError::Resource {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let len = raw.len();
    <[u8; N]>::try_from(raw).map_err(|_| InjectorError::Resource {
        path: path.to_path_buf(),
        message: format!("expected {N} bytes, found {len}"),
    })
}

pub fn ticket_dir(root: &Path, game: Game, ticket: Ticket) -> PathBuf {
    root.join(game.slug()).join(ticket.slug())
}

impl ResourcePack {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let raw: [u8; CRC_TABLE_LEN] = read_blob(&root.join(CRC_TABLE_FILE))?;
        let crc_table = CrcTable::from_array(&raw);
        debug!("Loaded CRC table from {}", root.display());
        Ok(Self { root, crc_table })
    }

    pub fn crc_table(&self) -> &CrcTable {
        &self.crc_table
    }

    pub fn load(&self, game: Game, ticket: Ticket) -> Result<TicketPayloads> {
        if !ticket.available_for(game) {
            return Err(InjectorError::Config(format!(
                "{ticket} is not available for {game}"
            )));
        }

        let dir = ticket_dir(&self.root, game, ticket);
        let payloads = TicketPayloads {
            ticket: read_blob(&dir.join(TICKET_FILE))?,
            script: read_blob(&dir.join(SCRIPT_FILE))?,
        };
        debug!("Loaded {ticket} for {game} from {}", dir.display());
        Ok(payloads)
    }
}

/// Lists the ticket directories under `root` that contain both blobs.
/// Presence is checked, sizes are not.
pub fn discover(root: &Path) -> Vec<(Game, Ticket)> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let dir = entry.path();
        let game_name = dir
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let ticket_name = entry.file_name().to_str().unwrap_or_default();

        let (Ok(game), Ok(ticket)) = (game_name.parse::<Game>(), ticket_name.parse::<Ticket>())
        else {
            warn!("Skipping unrecognised resource directory {}", dir.display());
            continue;
        };

        if !ticket.available_for(game) {
            warn!("Skipping {ticket} under {game}: not offered for that game");
            continue;
        }

        if dir.join(TICKET_FILE).is_file() && dir.join(SCRIPT_FILE).is_file() {
            found.push((game, ticket));
        }
    }

    found.sort();
    found
}
