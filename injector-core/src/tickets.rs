use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Games with a Mystery Gift Wonder Card layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Game {
    Emerald,
    #[serde(rename = "frlg", alias = "fire_red_leaf_green")]
    FireRedLeafGreen,
}

impl Game {
    pub const ALL: [Game; 2] = [Game::Emerald, Game::FireRedLeafGreen];

    /// Offset of the Wonder Card region inside the Wonder Card block.
    pub const fn wonder_card_base(self) -> usize {
        match self {
            Game::Emerald => 0x56C,
            Game::FireRedLeafGreen => 0x460,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Game::Emerald => "Emerald",
            Game::FireRedLeafGreen => "FireRed/LeafGreen",
        }
    }

    /// Directory and command-line name.
    pub fn slug(self) -> &'static str {
        match self {
            Game::Emerald => "emerald",
            Game::FireRedLeafGreen => "frlg",
        }
    }

    pub fn tickets(self) -> Vec<Ticket> {
        Ticket::ALL
            .into_iter()
            .filter(|t| t.available_for(self))
            .collect()
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ticket {
    EonTicket,
    AuroraTicket,
    MysticTicket,
    OldSeaMap,
}

impl Ticket {
    pub const ALL: [Ticket; 4] = [
        Ticket::EonTicket,
        Ticket::AuroraTicket,
        Ticket::MysticTicket,
        Ticket::OldSeaMap,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Ticket::EonTicket => "Eon Ticket",
            Ticket::AuroraTicket => "Aurora Ticket",
            Ticket::MysticTicket => "Mystic Ticket",
            Ticket::OldSeaMap => "Old Sea Map",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Ticket::EonTicket => "eon_ticket",
            Ticket::AuroraTicket => "aurora_ticket",
            Ticket::MysticTicket => "mystic_ticket",
            Ticket::OldSeaMap => "old_sea_map",
        }
    }

    pub fn available_for(self, game: Game) -> bool {
        match game {
            Game::Emerald => true,
            Game::FireRedLeafGreen => {
                matches!(self, Ticket::AuroraTicket | Ticket::MysticTicket)
            }
        }
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseSlugError {
    kind: &'static str,
    value: String,
    expected: String,
}

fn parse_slug<T: Copy>(
    kind: &'static str,
    value: &str,
    all: &[T],
    slug: fn(T) -> &'static str,
) -> Result<T, ParseSlugError> {
    let wanted = value.trim().to_ascii_lowercase().replace('-', "_");
    all.iter()
        .copied()
        .find(|&item| slug(item) == wanted)
        .ok_or_else(|| ParseSlugError {
            kind,
            value: value.to_string(),
            expected: all.iter().map(|&item| slug(item)).collect::<Vec<_>>().join(", "),
        })
}

impl FromStr for Game {
    type Err = ParseSlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_slug("game", s, &Game::ALL, Game::slug)
    }
}

impl FromStr for Ticket {
    type Err = ParseSlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_slug("ticket", s, &Ticket::ALL, Ticket::slug)
    }
}

/// Game family as recorded in a save's detection block.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum GameFamily {
    RubySapphire,
    FireRedLeafGreen,
    Emerald,
}

impl GameFamily {
    /// `0` is Ruby/Sapphire and `1` is FireRed/LeafGreen. Every other value
    /// is Emerald, whose saves store a per-file security key there.
    pub fn from_game_code(code: u32) -> Self {
        match code {
            0 => GameFamily::RubySapphire,
            1 => GameFamily::FireRedLeafGreen,
            _ => GameFamily::Emerald,
        }
    }

    /// The Mystery Gift capable game for this family, if any.
    pub fn game(self) -> Option<Game> {
        match self {
            GameFamily::RubySapphire => None,
            GameFamily::FireRedLeafGreen => Some(Game::FireRedLeafGreen),
            GameFamily::Emerald => Some(Game::Emerald),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GameFamily::RubySapphire => "Ruby/Sapphire",
            GameFamily::FireRedLeafGreen => Game::FireRedLeafGreen.display_name(),
            GameFamily::Emerald => Game::Emerald.display_name(),
        }
    }
}

impl fmt::Display for GameFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
