// Value rankings and head-to-head player comparison.

use std::cmp::Ordering;

use serde::Serialize;

use gaffer_core::model::{Player, PlayerId, Position, TeamId};

use crate::error::{invalid, Result};
use crate::points::ScoreTable;

const SCORE_WEIGHT: f64 = 0.5;
const VALUE_WEIGHT: f64 = 0.3;
const FORM_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueEntry {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub team: TeamId,
    pub cost: u32,
    /// Expected points for the current round.
    pub score: f64,
    /// Expected points per million for the current round.
    pub value: f64,
    pub ownership: f64,
}

/// Selectable players by single-round value per million, best first.
pub fn value_players(
    table: &ScoreTable<'_>,
    position: Option<Position>,
    limit: usize,
) -> Vec<ValueEntry> {
    let mut entries: Vec<ValueEntry> = table
        .snapshot()
        .players()
        .iter()
        .filter(|p| p.is_selectable())
        .filter(|p| position.map_or(true, |pos| p.position == pos))
        .map(|p| ValueEntry {
            id: p.id,
            name: p.name.clone(),
            position: p.position,
            team: p.team,
            cost: p.cost,
            score: table.score(p, 1),
            value: table.value(p, 1),
            ownership: p.ownership,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    entries.truncate(limit);
    entries
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparedPlayer {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub cost: u32,
    pub score: f64,
    pub value: f64,
    pub form: f64,
    /// Blend of score, value and form the comparison is decided on.
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerComparison {
    pub first: ComparedPlayer,
    pub second: ComparedPlayer,
    /// Id of the higher-rated player; the second player wins ties.
    pub better: PlayerId,
    pub difference: f64,
    pub horizon: u32,
}

fn compared(table: &ScoreTable<'_>, player: &Player, horizon: u32) -> ComparedPlayer {
    let score = table.score(player, horizon);
    let value = table.value(player, horizon);
    ComparedPlayer {
        id: player.id,
        name: player.name.clone(),
        position: player.position,
        cost: player.cost,
        score,
        value,
        form: player.form,
        rating: SCORE_WEIGHT * score + VALUE_WEIGHT * value + FORM_WEIGHT * player.form,
    }
}

pub fn compare_players(
    table: &ScoreTable<'_>,
    a: PlayerId,
    b: PlayerId,
    horizon: u32,
) -> Result<PlayerComparison> {
    let snapshot = table.snapshot();
    let lookup = |id: PlayerId| {
        snapshot
            .player(id)
            .ok_or_else(|| invalid(format!("unknown player id {id}")))
    };
    let first = compared(table, lookup(a)?, horizon);
    let second = compared(table, lookup(b)?, horizon);

    let better = if first.rating > second.rating {
        first.id
    } else {
        second.id
    };
    let difference = (first.rating - second.rating).abs();

    Ok(PlayerComparison {
        first,
        second,
        better,
        difference,
        horizon,
    })
}
