// Fantasy Premier League HTTP API client.
//
// Fetches `bootstrap-static/` and `fixtures/` concurrently and normalizes the
// raw JSON into a `Snapshot`. Numeric fields the API publishes as strings
// ("5.3") are parsed leniently: anything unparsable becomes 0.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use super::{ProviderError, SnapshotProvider};
use crate::model::{
    Chip, EntrySquad, Fixture, Player, PlayerStatus, Position, Snapshot, Team, TeamId,
};

// ---------------------------------------------------------------------------
// Raw API structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawBootstrap {
    elements: Vec<RawElement>,
    teams: Vec<RawTeam>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    id: u32,
    #[serde(default)]
    web_name: String,
    element_type: u8,
    team: u32,
    now_cost: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    form: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    points_per_game: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    ep_next: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    minutes: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    starts: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    selected_by_percent: f64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    chance_of_playing_next_round: Option<u8>,
    #[serde(default)]
    total_points: i32,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: u32,
    name: String,
    #[serde(default)]
    short_name: String,
    #[serde(default)]
    strength: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: u32,
    #[serde(default)]
    is_current: bool,
    #[serde(default)]
    is_next: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFixture {
    id: u32,
    event: Option<u32>,
    team_h: u32,
    team_a: u32,
    #[serde(default)]
    team_h_difficulty: Option<u8>,
    #[serde(default)]
    team_a_difficulty: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPicks {
    picks: Vec<RawPick>,
    #[serde(default)]
    entry_history: Option<RawEntryHistory>,
}

#[derive(Debug, Deserialize)]
struct RawPick {
    element: u32,
}

#[derive(Debug, Deserialize)]
struct RawEntryHistory {
    #[serde(default)]
    bank: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHistory {
    #[serde(default)]
    chips: Vec<RawChip>,
}

#[derive(Debug, Deserialize)]
struct RawChip {
    name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value: Option<NumberOrString> = Option::deserialize(deserializer)?;
    let parsed = match value {
        Some(NumberOrString::Number(n)) => n,
        Some(NumberOrString::Text(s)) => s.trim().parse().unwrap_or(0.0),
        None => 0.0,
    };
    Ok(if parsed.is_finite() { parsed } else { 0.0 })
}

// ---------------------------------------------------------------------------
// Normalization (pure, unit-tested)
// ---------------------------------------------------------------------------

/// Fraction of possible minutes played. Players without a start count as one
/// start so a cameo still yields a ratio.
pub fn availability_ratio(minutes: f64, starts: f64) -> f64 {
    let starts = if starts > 0.0 { starts } else { 1.0 };
    (minutes / (90.0 * starts)).clamp(0.0, 1.0)
}

/// The current round: the event flagged current, else next, else 1.
fn current_round(events: &[RawEvent]) -> u32 {
    events
        .iter()
        .find(|e| e.is_current)
        .or_else(|| events.iter().find(|e| e.is_next))
        .map(|e| e.id)
        .unwrap_or(1)
}

pub(crate) fn snapshot_from_raw(bootstrap: RawBootstrap, raw_fixtures: Vec<RawFixture>) -> Snapshot {
    let teams: Vec<Team> = bootstrap
        .teams
        .into_iter()
        .map(|t| Team {
            id: t.id,
            name: t.name,
            short_name: t.short_name,
            strength: t.strength.unwrap_or(3).clamp(1, 5),
        })
        .collect();

    let strength_of = |team: TeamId| -> u8 {
        teams
            .iter()
            .find(|t| t.id == team)
            .map(|t| t.strength)
            .unwrap_or(3)
    };

    let fixtures: Vec<Fixture> = raw_fixtures
        .into_iter()
        .map(|f| Fixture {
            id: f.id,
            round: f.event,
            home_team: f.team_h,
            away_team: f.team_a,
            home_difficulty: f
                .team_h_difficulty
                .unwrap_or_else(|| strength_of(f.team_a))
                .clamp(1, 5),
            away_difficulty: f
                .team_a_difficulty
                .unwrap_or_else(|| strength_of(f.team_h))
                .clamp(1, 5),
        })
        .collect();

    let mut players = Vec::with_capacity(bootstrap.elements.len());
    for raw in bootstrap.elements {
        let Some(position) = Position::from_element_type(raw.element_type) else {
            warn!(
                "skipping player '{}': unknown element_type {}",
                raw.web_name, raw.element_type
            );
            continue;
        };
        players.push(Player {
            id: raw.id,
            name: raw.web_name.trim().to_string(),
            position,
            team: raw.team,
            cost: raw.now_cost,
            form: raw.form,
            points_per_round: raw.points_per_game,
            forecast: raw.ep_next,
            availability: availability_ratio(raw.minutes, raw.starts),
            ownership: raw.selected_by_percent,
            status: PlayerStatus::from_code(raw.status.trim()),
            chance_of_playing: raw.chance_of_playing_next_round,
            total_points: raw.total_points,
        });
    }

    let round = current_round(&bootstrap.events);
    Snapshot::new(players, teams, fixtures, round, Utc::now())
}

pub(crate) fn entry_from_raw(entry_id: u64, round: u32, picks: RawPicks, history: RawHistory) -> EntrySquad {
    let chips_used = history
        .chips
        .iter()
        .filter_map(|c| Chip::from_api_name(&c.name))
        .collect();
    EntrySquad {
        entry_id,
        round,
        player_ids: picks.picks.iter().map(|p| p.element).collect(),
        bank: picks.entry_history.map(|h| h.bank).unwrap_or(0),
        chips_used,
    }
}

// ---------------------------------------------------------------------------
// FplClient
// ---------------------------------------------------------------------------

/// HTTP client for the public FPL API.
pub struct FplClient {
    http: reqwest::Client,
    base_url: String,
}

impl FplClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "GET");
        let http_err = |source| ProviderError::Http {
            url: url.clone(),
            source,
        };
        let body = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?
            .text()
            .await
            .map_err(http_err)?;
        serde_json::from_str(&body).map_err(|source| ProviderError::Parse {
            what: url.clone(),
            source,
        })
    }
}

#[async_trait]
impl SnapshotProvider for FplClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot, ProviderError> {
        let (bootstrap, fixtures) = futures_util::future::try_join(
            self.get_json::<RawBootstrap>("bootstrap-static/"),
            self.get_json::<Vec<RawFixture>>("fixtures/"),
        )
        .await?;

        if bootstrap.elements.is_empty() {
            return Err(ProviderError::MissingData(
                "bootstrap-static returned no players".into(),
            ));
        }

        let snapshot = snapshot_from_raw(bootstrap, fixtures);
        info!(
            "Fetched snapshot: {} players, {} fixtures, round {}",
            snapshot.players().len(),
            snapshot.fixtures().len(),
            snapshot.current_round()
        );
        Ok(snapshot)
    }

    async fn fetch_entry(&self, entry_id: u64, round: u32) -> Result<EntrySquad, ProviderError> {
        let picks_path = format!("entry/{entry_id}/event/{round}/picks/");
        let history_path = format!("entry/{entry_id}/history/");
        let (picks, history) = futures_util::future::try_join(
            self.get_json::<RawPicks>(&picks_path),
            self.get_json::<RawHistory>(&history_path),
        )
        .await?;
        Ok(entry_from_raw(entry_id, round, picks, history))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
