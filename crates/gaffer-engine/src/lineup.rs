// Lineup selection: the best legal starting eleven from a 15-player squad.
//
// Bench order: outfield players by score descending (ties by id ascending),
// then goalkeepers.

use std::cmp::Ordering;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use gaffer_core::config::EngineConfig;
use gaffer_core::model::{PlayerId, Position};

use crate::error::{invalid, Result};
use crate::points::ScoreTable;
use crate::solver::{self, Bounds, Item, Problem};
use crate::squad::{resolve_squad, sort_for_display, ScoredPlayer};

pub const STARTERS: usize = 11;

/// Allowed number of starters per position.
pub fn formation_bounds(position: Position) -> Bounds {
    match position {
        Position::Goalkeeper => Bounds::exact(1),
        Position::Defender => Bounds::range(3, 5),
        Position::Midfielder => Bounds::range(2, 5),
        Position::Forward => Bounds::range(1, 3),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lineup {
    pub starters: Vec<ScoredPlayer>,
    /// Substitutes in bench order.
    pub bench: Vec<ScoredPlayer>,
    /// Starter counts as "DEF-MID-FWD", e.g. "4-4-2".
    pub formation: String,
    pub starting_score: f64,
    pub bench_score: f64,
    pub horizon: u32,
    pub optimal: bool,
}

impl Lineup {
    pub fn starter_ids(&self) -> Vec<PlayerId> {
        self.starters.iter().map(|p| p.id).collect()
    }

    pub fn bench_ids(&self) -> Vec<PlayerId> {
        self.bench.iter().map(|p| p.id).collect()
    }
}

/// Pick the eleven starters maximizing expected points over `horizon`.
pub fn optimize_lineup(
    table: &ScoreTable<'_>,
    config: &EngineConfig,
    squad_ids: &[PlayerId],
    horizon: u32,
) -> Result<Lineup> {
    let players = resolve_squad(table.snapshot(), squad_ids)?;

    let mut fielded = 0;
    for position in Position::ALL {
        let have = players.iter().filter(|p| p.position == position).count();
        let bounds = formation_bounds(position);
        if have < bounds.min {
            return Err(invalid(format!(
                "squad has {have} {position}, a lineup needs at least {}",
                bounds.min
            )));
        }
        fielded += have.min(bounds.max);
    }
    if fielded < STARTERS {
        return Err(invalid(format!(
            "squad can field at most {fielded} starters within the formation limits"
        )));
    }

    let scored: Vec<ScoredPlayer> = players
        .iter()
        .map(|p| ScoredPlayer::new(p, table.score(p, horizon)))
        .collect();

    let problem = Problem {
        items: scored
            .iter()
            .map(|p| Item {
                id: p.id,
                category: p.position.index(),
                group: p.team,
                cost: p.cost,
                score: p.score,
            })
            .collect(),
        count: STARTERS,
        budget: None,
        bounds: Position::ALL.iter().map(|&pos| formation_bounds(pos)).collect(),
        group_cap: None,
    };
    let solution = solver::solve(
        &problem,
        Duration::from_millis(config.solver.time_budget_ms),
    )?;

    let (mut starters, mut bench): (Vec<ScoredPlayer>, Vec<ScoredPlayer>) = scored
        .into_iter()
        .partition(|p| solution.ids.contains(&p.id));
    sort_for_display(&mut starters);
    order_bench(&mut bench);

    let formation = formation_string(&starters);
    let bench_score: f64 = bench.iter().map(|p| p.score).sum();
    debug!("lineup {formation}: {:.2} starting points", solution.total_score);

    Ok(Lineup {
        starters,
        bench,
        formation,
        starting_score: solution.total_score,
        bench_score,
        horizon,
        optimal: solution.optimal,
    })
}

/// Outfield players by score descending (ties by id), goalkeepers last.
pub fn order_bench(bench: &mut [ScoredPlayer]) {
    bench.sort_by(|a, b| {
        let a_gk = a.position == Position::Goalkeeper;
        let b_gk = b.position == Position::Goalkeeper;
        a_gk.cmp(&b_gk)
            .then(b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then(a.id.cmp(&b.id))
    });
}

fn formation_string(starters: &[ScoredPlayer]) -> String {
    let count = |pos: Position| starters.iter().filter(|p| p.position == pos).count();
    format!(
        "{}-{}-{}",
        count(Position::Defender),
        count(Position::Midfielder),
        count(Position::Forward)
    )
}
