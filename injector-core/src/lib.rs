use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub mod checksum;
pub mod inject;
pub mod inspect;
pub mod patch;
pub mod resources;
pub mod save;
pub mod tickets;

pub use checksum::{block_checksum, crc16, CrcTable};
pub use inject::inject;
pub use inspect::{inspect, SaveReport};
pub use resources::{discover, ResourcePack, TicketPayloads};
pub use save::{determine_active_slot, find_block, Slot};
pub use tickets::{Game, GameFamily, Ticket};

/// Why a save could not be patched. The messages are shown to users as-is.
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("Not a valid save file ({len} bytes, expected at least {min})", min = save::MIN_IMAGE_LEN)]
    InvalidFile { len: usize },
    #[error("No valid save data found in either slot")]
    NoValidSave,
    #[error("Could not find the Wonder Card block in the active save")]
    WonderCardBlockMissing,
    #[error("Could not find the game detection block in the active save")]
    DetectionBlockMissing,
    #[error("This save is from Ruby or Sapphire, which have no Mystery Gift support")]
    UnsupportedGame,
    #[error("{selected} ticket selected, but this save is from {detected}")]
    GameMismatch { selected: Game, detected: Game },
    #[error("The {payload} payload is {actual} bytes, expected {expected}")]
    PayloadSizeMismatch {
        payload: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum InjectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Inject(#[from] InjectError),
    #[error("resource {}: {message}", .path.display())]
    Resource { path: PathBuf, message: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InjectorError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectorSettings {
    pub game: Game,
    pub ticket: Ticket,
    pub save_path: PathBuf,
    /// Defaults to [`default_output_path`] when unset.
    pub output_path: Option<PathBuf>,
    pub resources_path: PathBuf,
    pub backup: bool,
}

impl InjectorSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// `<dir>/<stem>_<ticket>.sav` next to the input save.
pub fn default_output_path(save_path: &Path, ticket: Ticket) -> PathBuf {
    let stem = save_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("save");
    save_path.with_file_name(format!("{stem}_{}.sav", ticket.slug()))
}

/// `<save>.bak`, keeping the original extension.
pub fn backup_path(save_path: &Path) -> PathBuf {
    let mut name = save_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    save_path.with_file_name(name)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Reads the save, injects the selected ticket and writes the result.
/// Returns the path that was written.
pub fn run(settings: InjectorSettings) -> Result<PathBuf> {
    if !settings.save_path.is_file() {
        return Err(InjectorError::Config(format!(
            "Save file does not exist: {}",
            settings.save_path.display()
        )));
    }

    if !settings.ticket.available_for(settings.game) {
        return Err(InjectorError::Config(format!(
            "{} is not available for {}",
            settings.ticket, settings.game
        )));
    }

    let output = settings
        .output_path
        .clone()
        .unwrap_or_else(|| default_output_path(&settings.save_path, settings.ticket));

    if same_file(&output, &settings.save_path) && !settings.backup {
        return Err(InjectorError::Config(
            "Refusing to overwrite the input save without a backup".to_string(),
        ));
    }

    // An existing backup may be the only untouched copy of the save.
    let backup = settings.backup.then(|| backup_path(&settings.save_path));
    if let Some(backup) = backup.as_ref().filter(|b| b.exists()) {
        return Err(InjectorError::Config(format!(
            "Backup {} already exists; move it away before injecting again",
            backup.display()
        )));
    }

    let pack = ResourcePack::open(&settings.resources_path)?;
    let payloads = pack.load(settings.game, settings.ticket)?;

    let original = fs::read(&settings.save_path)?;
    let patched = inject(
        &original,
        settings.game,
        &payloads.ticket,
        &payloads.script,
        pack.crc_table(),
    )?;

    if let Some(backup) = backup {
        fs::write(&backup, &original)?;
        info!("Backed up original save to {}", backup.display());
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&output, &patched)?;
    info!(
        "Wrote {} with {} to {}",
        settings.game,
        settings.ticket,
        output.display()
    );

    Ok(output)
}
