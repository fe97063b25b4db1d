// Transfer recommendations and wildcard evaluation.
//
// Transfers are searched greedily: each step swaps one squad player for a
// same-position selectable player outside the squad, picking the largest
// positive gain after any point penalty. Multi-transfer plans are a fold over
// immutable squad states and are not guaranteed globally optimal.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use gaffer_core::config::EngineConfig;
use gaffer_core::model::{Player, PlayerId, TeamId};

use crate::error::Result;
use crate::lineup::optimize_lineup;
use crate::points::ScoreTable;
use crate::squad::{optimize_squad, resolve_squad, total_cost, ScoredPlayer};

const EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub squad: Vec<PlayerId>,
    /// Squad value the plan may spend, in tenths. `None` uses the current
    /// squad cost.
    pub budget: Option<u32>,
    /// Money in the bank, in tenths.
    pub bank: u32,
    pub horizon: u32,
    pub num_transfers: u32,
    pub free_transfers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub out: ScoredPlayer,
    #[serde(rename = "in")]
    pub incoming: ScoredPlayer,
    /// Change in squad cost, in tenths.
    pub cost_change: i64,
    /// Points deducted for this transfer.
    pub penalty: u32,
    /// Score gain net of the penalty.
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferPlan {
    pub transfers: Vec<Transfer>,
    pub expected_improvement: f64,
    pub penalty_points: u32,
    /// Squad ids after every transfer is applied, ascending.
    pub resulting_squad: Vec<PlayerId>,
    pub resulting_cost: u32,
    pub horizon: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Recommended(TransferPlan),
    /// Not an error: nothing currently beats keeping the squad.
    NoImprovementFound { reason: String },
}

impl TransferOutcome {
    pub fn expected_improvement(&self) -> f64 {
        match self {
            TransferOutcome::Recommended(plan) => plan.expected_improvement,
            TransferOutcome::NoImprovementFound { .. } => 0.0,
        }
    }

    pub fn plan(&self) -> Option<&TransferPlan> {
        match self {
            TransferOutcome::Recommended(plan) => Some(plan),
            TransferOutcome::NoImprovementFound { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Working squad state
// ---------------------------------------------------------------------------

/// One immutable step of the search: the squad after the transfers so far.
#[derive(Debug, Clone)]
struct SquadState<'s> {
    players: Vec<&'s Player>,
    /// Everyone moved in or out so far; never moved again.
    moved: HashSet<PlayerId>,
    cost: u32,
    team_counts: HashMap<TeamId, usize>,
}

impl<'s> SquadState<'s> {
    fn new(players: Vec<&'s Player>) -> Self {
        let cost = total_cost(&players);
        let team_counts = crate::squad::team_counts(&players);
        SquadState {
            players,
            moved: HashSet::new(),
            cost,
            team_counts,
        }
    }

    fn contains(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// The state after swapping `out` for `incoming`.
    fn apply(&self, out: &'s Player, incoming: &'s Player) -> Self {
        let mut next = self.clone();
        next.players.retain(|p| p.id != out.id);
        next.players.push(incoming);
        next.cost = next.cost - out.cost + incoming.cost;
        if let Some(n) = next.team_counts.get_mut(&out.team) {
            *n -= 1;
        }
        *next.team_counts.entry(incoming.team).or_insert(0) += 1;
        next.moved.insert(out.id);
        next.moved.insert(incoming.id);
        next
    }
}

struct StepSearch<'a, 's> {
    table: &'a ScoreTable<'s>,
    candidates: &'a [&'s Player],
    horizon: u32,
    cost_cap: u32,
    max_per_team: usize,
}

struct Step<'s> {
    out: &'s Player,
    incoming: &'s Player,
    penalty: u32,
    delta: f64,
}

impl<'a, 's> StepSearch<'a, 's> {
    /// Best positive single swap from `state` paying `penalty`. Ties go to the
    /// lowest outgoing id, then the lowest incoming id.
    fn best(&self, state: &SquadState<'s>, penalty: u32) -> Option<Step<'s>> {
        let mut outgoing: Vec<&'s Player> = state
            .players
            .iter()
            .copied()
            .filter(|p| !state.moved.contains(&p.id))
            .collect();
        outgoing.sort_by_key(|p| p.id);

        let mut best: Option<Step<'s>> = None;
        for out in outgoing {
            let out_score = self.table.score(out, self.horizon);
            for &incoming in self.candidates {
                if incoming.position != out.position
                    || state.contains(incoming.id)
                    || state.moved.contains(&incoming.id)
                {
                    continue;
                }
                if state.cost - out.cost + incoming.cost > self.cost_cap {
                    continue;
                }
                let same_team = usize::from(incoming.team == out.team);
                let at_club = state.team_counts.get(&incoming.team).copied().unwrap_or(0);
                if at_club - same_team >= self.max_per_team {
                    continue;
                }

                let delta =
                    self.table.score(incoming, self.horizon) - out_score - f64::from(penalty);
                let better = match &best {
                    Some(b) => delta > b.delta + EPS,
                    None => delta > EPS,
                };
                if better {
                    best = Some(Step {
                        out,
                        incoming,
                        penalty,
                        delta,
                    });
                }
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Transfer search
// ---------------------------------------------------------------------------

/// Recommend up to `num_transfers` swaps. Transfer `k` (1-based) pays
/// `transfers.penalty_points` when `k` exceeds the free transfers.
pub fn suggest_transfers(
    table: &ScoreTable<'_>,
    config: &EngineConfig,
    request: &TransferRequest,
) -> Result<TransferOutcome> {
    let current = resolve_squad(table.snapshot(), &request.squad)?;
    if request.num_transfers == 0 {
        return Ok(TransferOutcome::NoImprovementFound {
            reason: "No transfers requested".into(),
        });
    }

    let initial = SquadState::new(current);
    let cost_cap = request.budget.unwrap_or(initial.cost) + request.bank;

    let mut candidates: Vec<&Player> = table
        .snapshot()
        .players()
        .iter()
        .filter(|p| p.is_selectable() && !initial.contains(p.id))
        .collect();
    candidates.sort_by_key(|p| p.id);

    let search = StepSearch {
        table,
        candidates: &candidates,
        horizon: request.horizon,
        cost_cap,
        max_per_team: config.squad.max_per_team,
    };

    let (final_state, steps, _) = (1..=request.num_transfers).fold(
        (initial, Vec::<Step>::new(), false),
        |(state, mut steps, stopped), k| {
            if stopped {
                return (state, steps, true);
            }
            let penalty = if k > request.free_transfers {
                config.transfers.penalty_points
            } else {
                0
            };
            match search.best(&state, penalty) {
                Some(step) => {
                    debug!(
                        "transfer {k}: {} -> {} ({:+.2})",
                        step.out.name, step.incoming.name, step.delta
                    );
                    let next = state.apply(step.out, step.incoming);
                    steps.push(step);
                    (next, steps, false)
                }
                None => (state, steps, true),
            }
        },
    );

    if steps.is_empty() {
        return Ok(TransferOutcome::NoImprovementFound {
            reason: "No beneficial transfers found".into(),
        });
    }

    let transfers: Vec<Transfer> = steps
        .iter()
        .map(|s| Transfer {
            out: ScoredPlayer::new(s.out, table.score(s.out, request.horizon)),
            incoming: ScoredPlayer::new(s.incoming, table.score(s.incoming, request.horizon)),
            cost_change: i64::from(s.incoming.cost) - i64::from(s.out.cost),
            penalty: s.penalty,
            delta: s.delta,
        })
        .collect();
    let expected_improvement: f64 = transfers.iter().map(|t| t.delta).sum();
    let penalty_points: u32 = transfers.iter().map(|t| t.penalty).sum();

    let mut resulting_squad: Vec<PlayerId> = final_state.players.iter().map(|p| p.id).collect();
    resulting_squad.sort_unstable();

    info!(
        "Recommending {} transfer(s) for {:+.2} points",
        transfers.len(),
        expected_improvement
    );

    Ok(TransferOutcome::Recommended(TransferPlan {
        transfers,
        expected_improvement,
        penalty_points,
        resulting_squad,
        resulting_cost: final_state.cost,
        horizon: request.horizon,
    }))
}

// ---------------------------------------------------------------------------
// Wildcard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WildcardEvaluation {
    pub recommended: bool,
    /// Optimized lineup score of the current squad.
    pub current_score: f64,
    /// Total score of the best 15 affordable with the same money.
    pub optimal_score: f64,
    pub improvement: f64,
    pub threshold: f64,
    pub reasoning: String,
    pub optimal_squad: Vec<PlayerId>,
    pub horizon: u32,
}

/// Compare the best squad buildable from the current squad's value plus the
/// bank against the current squad's optimized lineup, both over `horizon`.
/// The optimal side counts all 15 players, so the threshold carries the bar.
pub fn evaluate_wildcard(
    table: &ScoreTable<'_>,
    config: &EngineConfig,
    squad_ids: &[PlayerId],
    bank: u32,
    horizon: u32,
) -> Result<WildcardEvaluation> {
    let current = resolve_squad(table.snapshot(), squad_ids)?;
    let budget = total_cost(&current) + bank;

    let current_score = optimize_lineup(table, config, squad_ids, horizon)?.starting_score;
    let optimal = optimize_squad(table, config, budget, horizon)?;
    let optimal_squad = optimal.ids();
    let optimal_score = optimal.total_score;

    let improvement = optimal_score - current_score;
    let threshold = wildcard_threshold(config, horizon);

    Ok(WildcardEvaluation {
        recommended: improvement > threshold,
        current_score,
        optimal_score,
        improvement,
        threshold,
        reasoning: wildcard_reasoning(improvement, threshold),
        optimal_squad,
        horizon,
    })
}

pub fn wildcard_threshold(config: &EngineConfig, horizon: u32) -> f64 {
    if horizon < 5 {
        config.chips.wildcard_short_horizon_threshold
    } else {
        config.chips.wildcard_threshold
    }
}

fn wildcard_reasoning(improvement: f64, threshold: f64) -> String {
    if improvement > threshold * 1.5 {
        format!("Strong case for the wildcard: a rebuilt squad gains {improvement:.1} points.")
    } else if improvement > threshold {
        format!("Wildcard recommended: a rebuilt squad gains {improvement:.1} points.")
    } else if improvement > threshold * 0.7 {
        format!(
            "Marginal: a rebuilt squad gains {improvement:.1} points, just short of the \
             {threshold:.0}-point bar. Weigh injuries and remaining chips."
        )
    } else {
        format!("Hold the wildcard: a rebuilt squad gains only {improvement:.1} points.")
    }
}
