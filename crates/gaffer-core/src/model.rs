// Snapshot data model: players, teams, fixtures and the user's entry.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PlayerId = u32;
pub type TeamId = u32;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Squad positions. The numeric element type follows the FPL API (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Parse a position abbreviation ("GK", "GKP", "DEF", "MID", "FWD").
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GK" | "GKP" | "G" => Some(Position::Goalkeeper),
            "DEF" | "D" => Some(Position::Defender),
            "MID" | "M" => Some(Position::Midfielder),
            "FWD" | "F" => Some(Position::Forward),
            _ => None,
        }
    }

    /// Map an FPL `element_type` to a position.
    pub fn from_element_type(element_type: u8) -> Option<Self> {
        match element_type {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    /// Dense index used by per-position count arrays.
    pub fn index(&self) -> usize {
        match self {
            Position::Goalkeeper => 0,
            Position::Defender => 1,
            Position::Midfielder => 2,
            Position::Forward => 3,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Availability flag as published by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Available,
    Doubtful,
    Injured,
    Suspended,
    Unavailable,
    NotInSquad,
}

impl PlayerStatus {
    /// Decode the single-letter FPL status code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "a" => PlayerStatus::Available,
            "d" => PlayerStatus::Doubtful,
            "i" => PlayerStatus::Injured,
            "s" => PlayerStatus::Suspended,
            "n" => PlayerStatus::NotInSquad,
            _ => PlayerStatus::Unavailable,
        }
    }
}

/// Minimum chance-of-playing percentage for a flagged player to stay selectable.
pub const MIN_CHANCE_OF_PLAYING: u8 = 75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub team: TeamId,
    /// Price in tenths of a currency unit (e.g. 105 = 10.5m).
    pub cost: u32,
    #[serde(default)]
    pub form: f64,
    #[serde(default)]
    pub points_per_round: f64,
    /// External forecast for the next round (FPL `ep_next`).
    #[serde(default)]
    pub forecast: f64,
    /// Fraction of possible minutes played, in [0, 1].
    #[serde(default)]
    pub availability: f64,
    #[serde(default)]
    pub ownership: f64,
    #[serde(default)]
    pub status: PlayerStatus,
    #[serde(default)]
    pub chance_of_playing: Option<u8>,
    #[serde(default)]
    pub total_points: i32,
}

impl Player {
    /// Whether the player may be brought into a squad.
    pub fn is_selectable(&self) -> bool {
        self.status == PlayerStatus::Available
            && self
                .chance_of_playing
                .map_or(true, |c| c >= MIN_CHANCE_OF_PLAYING)
    }

    /// Cost in currency units (millions).
    pub fn price(&self) -> f64 {
        f64::from(self.cost) / 10.0
    }
}

// ---------------------------------------------------------------------------
// Team & fixture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    /// Aggregate strength rating on the 1..=5 scale.
    #[serde(default = "neutral_strength")]
    pub strength: u8,
}

fn neutral_strength() -> u8 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u32,
    /// Round the fixture is scheduled in; `None` while unscheduled.
    pub round: Option<u32>,
    pub home_team: TeamId,
    pub away_team: TeamId,
    /// Difficulty faced by the home side, 1 (easy) to 5 (hard).
    pub home_difficulty: u8,
    /// Difficulty faced by the away side.
    pub away_difficulty: u8,
}

impl Fixture {
    /// Difficulty from `team`'s point of view, if it plays in this fixture.
    pub fn difficulty_for(&self, team: TeamId) -> Option<u8> {
        if self.home_team == team {
            Some(self.home_difficulty)
        } else if self.away_team == team {
            Some(self.away_difficulty)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An immutable, timestamped view of the game data at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    players: Vec<Player>,
    teams: Vec<Team>,
    fixtures: Vec<Fixture>,
    current_round: u32,
    fetched_at: DateTime<Utc>,
    player_index: HashMap<PlayerId, usize>,
}

/// Serialized form of a snapshot (used by the file provider and for export).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub current_round: u32,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub fixtures: Vec<Fixture>,
}

impl Snapshot {
    /// Build a snapshot. Later duplicates of a player id replace earlier ones.
    pub fn new(
        players: Vec<Player>,
        teams: Vec<Team>,
        fixtures: Vec<Fixture>,
        current_round: u32,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let mut deduped: Vec<Player> = Vec::with_capacity(players.len());
        let mut player_index = HashMap::with_capacity(players.len());
        for player in players {
            match player_index.get(&player.id) {
                Some(&idx) => {
                    tracing::warn!("duplicate player id {}, using latest record", player.id);
                    deduped[idx] = player;
                }
                None => {
                    player_index.insert(player.id, deduped.len());
                    deduped.push(player);
                }
            }
        }
        Snapshot {
            players: deduped,
            teams,
            fixtures,
            current_round,
            fetched_at,
            player_index,
        }
    }

    pub fn from_document(doc: SnapshotDocument) -> Self {
        Snapshot::new(
            doc.players,
            doc.teams,
            doc.fixtures,
            doc.current_round,
            doc.fetched_at,
        )
    }

    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            current_round: self.current_round,
            fetched_at: self.fetched_at,
            players: self.players.clone(),
            teams: self.teams.clone(),
            fixtures: self.fixtures.clone(),
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.player_index.get(&id).map(|&idx| &self.players[idx])
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }
}

// ---------------------------------------------------------------------------
// Entry (a user's squad)
// ---------------------------------------------------------------------------

/// One-time strategic modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chip {
    Wildcard,
    FreeHit,
    BenchBoost,
    TripleCaptain,
}

impl Chip {
    /// Decode the chip name used by the FPL history endpoint.
    pub fn from_api_name(name: &str) -> Option<Self> {
        match name {
            "wildcard" => Some(Chip::Wildcard),
            "freehit" => Some(Chip::FreeHit),
            "bboost" => Some(Chip::BenchBoost),
            "3xc" => Some(Chip::TripleCaptain),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Chip::Wildcard => "Wildcard",
            Chip::FreeHit => "Free Hit",
            Chip::BenchBoost => "Bench Boost",
            Chip::TripleCaptain => "Triple Captain",
        }
    }
}

/// A user's current squad as reported by the data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySquad {
    pub entry_id: u64,
    pub round: u32,
    pub player_ids: Vec<PlayerId>,
    /// Money in the bank, in tenths.
    #[serde(default)]
    pub bank: u32,
    #[serde(default)]
    pub chips_used: Vec<Chip>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
