// Squad selection: the best legal 15 under a budget, and squad input checks.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use gaffer_core::config::EngineConfig;
use gaffer_core::model::{Player, PlayerId, Position, Snapshot, TeamId};

use crate::error::{invalid, EngineError, Result};
use crate::points::ScoreTable;
use crate::solver::{self, Bounds, Item, Problem};

pub const SQUAD_SIZE: usize = 15;

/// Exact squad composition per position.
pub fn required_count(position: Position) -> usize {
    match position {
        Position::Goalkeeper => 2,
        Position::Defender => 5,
        Position::Midfielder => 5,
        Position::Forward => 3,
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A player as presented in a recommendation, with the score it was chosen on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPlayer {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub team: TeamId,
    pub cost: u32,
    pub score: f64,
}

impl ScoredPlayer {
    pub fn new(player: &Player, score: f64) -> Self {
        ScoredPlayer {
            id: player.id,
            name: player.name.clone(),
            position: player.position,
            team: player.team,
            cost: player.cost,
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Squad {
    /// Ordered by position, then score descending.
    pub players: Vec<ScoredPlayer>,
    pub total_cost: u32,
    pub total_score: f64,
    pub remaining_budget: u32,
    pub horizon: u32,
    /// False when the solver ran out of time and this is its best effort.
    pub optimal: bool,
}

impl Squad {
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }
}

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

/// Select the 15 selectable players maximizing expected points over
/// `horizon`, with exact position counts, total cost within `budget` and at
/// most `squad.max_per_team` per team.
pub fn optimize_squad(
    table: &ScoreTable<'_>,
    config: &EngineConfig,
    budget: u32,
    horizon: u32,
) -> Result<Squad> {
    let snapshot = table.snapshot();
    let candidates: Vec<&Player> = snapshot
        .players()
        .iter()
        .filter(|p| p.is_selectable())
        .collect();

    for position in Position::ALL {
        let available = candidates.iter().filter(|p| p.position == position).count();
        let required = required_count(position);
        if available < required {
            return Err(EngineError::Infeasible(format!(
                "need {required} {position} but only {available} are selectable"
            )));
        }
    }

    let problem = Problem {
        items: candidates
            .iter()
            .map(|p| Item {
                id: p.id,
                category: p.position.index(),
                group: p.team,
                cost: p.cost,
                score: table.score(p, horizon),
            })
            .collect(),
        count: SQUAD_SIZE,
        budget: Some(budget),
        bounds: Position::ALL
            .iter()
            .map(|&pos| Bounds::exact(required_count(pos)))
            .collect(),
        group_cap: Some(config.squad.max_per_team),
    };

    let solution = solver::solve(
        &problem,
        Duration::from_millis(config.solver.time_budget_ms),
    )?;

    let mut players: Vec<ScoredPlayer> = solution
        .ids
        .iter()
        .filter_map(|&id| snapshot.player(id))
        .map(|p| ScoredPlayer::new(p, table.score(p, horizon)))
        .collect();
    sort_for_display(&mut players);

    info!(
        "Optimized squad: {:.2} points over {} rounds, cost {}/{}",
        solution.total_score, horizon, solution.total_cost, budget
    );

    Ok(Squad {
        players,
        total_cost: solution.total_cost,
        total_score: solution.total_score,
        remaining_budget: budget.saturating_sub(solution.total_cost),
        horizon,
        optimal: solution.optimal,
    })
}

/// Position order, then score descending, then id.
pub fn sort_for_display(players: &mut [ScoredPlayer]) {
    players.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.id.cmp(&b.id))
    });
}

// ---------------------------------------------------------------------------
// Squad input checks
// ---------------------------------------------------------------------------

/// Resolve a caller-supplied squad: exactly 15 distinct ids, all known.
pub fn resolve_squad<'s>(snapshot: &'s Snapshot, ids: &[PlayerId]) -> Result<Vec<&'s Player>> {
    if ids.len() != SQUAD_SIZE {
        return Err(invalid(format!(
            "a squad has {SQUAD_SIZE} players, got {}",
            ids.len()
        )));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    let mut players = Vec::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            return Err(invalid(format!("player {id} appears more than once")));
        }
        let player = snapshot
            .player(id)
            .ok_or_else(|| invalid(format!("unknown player id {id}")))?;
        players.push(player);
    }
    Ok(players)
}

pub fn total_cost(players: &[&Player]) -> u32 {
    players.iter().map(|p| p.cost).sum()
}

pub fn team_counts(players: &[&Player]) -> HashMap<TeamId, usize> {
    let mut counts = HashMap::new();
    for p in players {
        *counts.entry(p.team).or_insert(0) += 1;
    }
    counts
}
