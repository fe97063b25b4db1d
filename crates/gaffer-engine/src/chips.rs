// Chip strategy.
//
// Signals about the current round are gathered from the squad, each chip
// rule is evaluated independently, then a fixed precedence (wildcard, free
// hit, bench boost, triple captain) picks at most one primary chip.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use gaffer_core::config::{ChipConfig, EngineConfig};
use gaffer_core::model::{Chip, PlayerId};

use crate::captain::{evaluate_triple_captain, TripleCaptainEvaluation};
use crate::error::Result;
use crate::lineup::optimize_lineup;
use crate::points::ScoreTable;
use crate::squad::resolve_squad;
use crate::transfers::{evaluate_wildcard, WildcardEvaluation};

/// Chips in precedence order.
pub const PRECEDENCE: [Chip; 4] = [
    Chip::Wildcard,
    Chip::FreeHit,
    Chip::BenchBoost,
    Chip::TripleCaptain,
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the caller knows about the round beyond the squad itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundContext {
    /// Money in the bank, in tenths.
    pub bank: u32,
    pub chips_used: Vec<Chip>,
}

/// Aggregates the chip rules are evaluated on, all for the current round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChipSignals {
    /// Optimized starting eleven score.
    pub lineup_score: f64,
    pub bench_score: f64,
    /// Squad players whose fixture difficulty is at or above the difficult rating.
    pub difficult_fixtures: usize,
    /// Squad players expected to score below the near-zero threshold.
    pub near_zero_players: usize,
    pub double_round_teams: usize,
    pub squad_double_fixtures: usize,
    pub bench_double_fixtures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChipEvaluation {
    pub chip: Chip,
    pub recommended: bool,
    pub primary: bool,
    pub reasoning: String,
}

impl ChipEvaluation {
    fn new(chip: Chip, recommended: bool, reasoning: impl Into<String>) -> Self {
        ChipEvaluation {
            chip,
            recommended,
            primary: false,
            reasoning: reasoning.into(),
        }
    }

    fn already_used(chip: Chip) -> Self {
        ChipEvaluation::new(chip, false, format!("{} already used", chip.label()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChipRecommendations {
    pub round: u32,
    pub wildcard: ChipEvaluation,
    pub free_hit: ChipEvaluation,
    pub bench_boost: ChipEvaluation,
    pub triple_captain: ChipEvaluation,
    pub primary: Option<Chip>,
    pub signals: ChipSignals,
}

impl ChipRecommendations {
    pub fn evaluations(&self) -> [&ChipEvaluation; 4] {
        [
            &self.wildcard,
            &self.free_hit,
            &self.bench_boost,
            &self.triple_captain,
        ]
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Collect the current-round signals for a 15-player squad.
pub fn gather_signals(
    table: &ScoreTable<'_>,
    config: &EngineConfig,
    squad_ids: &[PlayerId],
) -> Result<ChipSignals> {
    let players = resolve_squad(table.snapshot(), squad_ids)?;
    let lineup = optimize_lineup(table, config, squad_ids, 1)?;
    let round = table.current_round();
    let fixtures = table.fixtures();

    let double_teams: HashSet<_> = fixtures.double_round_teams(round).into_iter().collect();
    let chips = &config.chips;

    Ok(ChipSignals {
        lineup_score: lineup.starting_score,
        bench_score: lineup.bench_score,
        difficult_fixtures: players
            .iter()
            .filter(|p| {
                fixtures.average_difficulty(p.team, round, 1) >= chips.difficult_fixture_rating
            })
            .count(),
        near_zero_players: players
            .iter()
            .filter(|p| table.score(p, 1) < chips.near_zero_score)
            .count(),
        double_round_teams: double_teams.len(),
        squad_double_fixtures: players
            .iter()
            .filter(|p| double_teams.contains(&p.team))
            .count(),
        bench_double_fixtures: lineup
            .bench
            .iter()
            .filter(|p| double_teams.contains(&p.team))
            .count(),
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

pub fn free_hit_rule(signals: &ChipSignals, chips: &ChipConfig) -> ChipEvaluation {
    let s = signals;
    let (recommended, reasoning) = if s.double_round_teams >= chips.big_double_round_teams
        && s.squad_double_fixtures < chips.big_double_round_teams
    {
        (
            true,
            format!(
                "{} teams play twice but only {} of your players do",
                s.double_round_teams, s.squad_double_fixtures
            ),
        )
    } else if s.difficult_fixtures >= chips.difficult_fixture_count {
        (
            true,
            format!("{} players face very difficult fixtures", s.difficult_fixtures),
        )
    } else if s.near_zero_players >= chips.near_zero_count {
        (
            true,
            format!("{} players are expected to blank", s.near_zero_players),
        )
    } else if s.lineup_score < chips.low_lineup_score {
        (
            true,
            format!("Low expected lineup score ({:.1}) this round", s.lineup_score),
        )
    } else {
        (
            false,
            "Current squad is strong enough for this round".to_string(),
        )
    };
    ChipEvaluation::new(Chip::FreeHit, recommended, reasoning)
}

pub fn bench_boost_rule(signals: &ChipSignals, chips: &ChipConfig) -> ChipEvaluation {
    let s = signals;
    let (recommended, reasoning) = if s.bench_double_fixtures >= 2
        && s.bench_score > chips.double_round_bench_score
    {
        (
            true,
            format!(
                "{} bench players play twice ({:.1} bench points)",
                s.bench_double_fixtures, s.bench_score
            ),
        )
    } else if s.bench_score > chips.strong_bench_score {
        (
            true,
            format!("Strong bench with {:.1} expected points", s.bench_score),
        )
    } else if s.double_round_teams > 0 && s.bench_score > chips.decent_bench_score {
        (
            true,
            format!(
                "Double round with a decent bench ({:.1} points)",
                s.bench_score
            ),
        )
    } else {
        (
            false,
            format!(
                "Bench too weak ({:.1} expected points) or no double round",
                s.bench_score
            ),
        )
    };
    ChipEvaluation::new(Chip::BenchBoost, recommended, reasoning)
}

/// Combine the four evaluations and mark the primary chip. Chips in
/// `chips_used` are never recommended.
pub fn decide(
    round: u32,
    signals: ChipSignals,
    wildcard: Option<&WildcardEvaluation>,
    triple_captain: Option<&TripleCaptainEvaluation>,
    chips_used: &[Chip],
    chips: &ChipConfig,
) -> ChipRecommendations {
    let used = |chip: Chip| chips_used.contains(&chip);

    let wildcard = match wildcard {
        _ if used(Chip::Wildcard) => ChipEvaluation::already_used(Chip::Wildcard),
        Some(w) => ChipEvaluation::new(Chip::Wildcard, w.recommended, w.reasoning.clone()),
        None => ChipEvaluation::new(Chip::Wildcard, false, "Wildcard not evaluated"),
    };
    let free_hit = if used(Chip::FreeHit) {
        ChipEvaluation::already_used(Chip::FreeHit)
    } else {
        free_hit_rule(&signals, chips)
    };
    let bench_boost = if used(Chip::BenchBoost) {
        ChipEvaluation::already_used(Chip::BenchBoost)
    } else {
        bench_boost_rule(&signals, chips)
    };
    let triple_captain = match triple_captain {
        _ if used(Chip::TripleCaptain) => ChipEvaluation::already_used(Chip::TripleCaptain),
        Some(t) => ChipEvaluation::new(Chip::TripleCaptain, t.recommended, t.reason.clone()),
        None => ChipEvaluation::new(Chip::TripleCaptain, false, "Triple captain not evaluated"),
    };

    let mut recs = ChipRecommendations {
        round,
        wildcard,
        free_hit,
        bench_boost,
        triple_captain,
        primary: None,
        signals,
    };

    let primary = PRECEDENCE.into_iter().find(|&chip| {
        recs.evaluations()
            .iter()
            .any(|e| e.chip == chip && e.recommended)
    });
    if let Some(chip) = primary {
        let slot = match chip {
            Chip::Wildcard => &mut recs.wildcard,
            Chip::FreeHit => &mut recs.free_hit,
            Chip::BenchBoost => &mut recs.bench_boost,
            Chip::TripleCaptain => &mut recs.triple_captain,
        };
        slot.primary = true;
    }
    recs.primary = primary;
    recs
}

/// Evaluate every chip for the current round. The wildcard is measured over
/// `chips.wildcard_horizon` rounds; unused chips only are evaluated.
pub fn chip_recommendations(
    table: &ScoreTable<'_>,
    config: &EngineConfig,
    squad_ids: &[PlayerId],
    context: &RoundContext,
) -> Result<ChipRecommendations> {
    let signals = gather_signals(table, config, squad_ids)?;
    debug!("chip signals: {:?}", signals);

    // A failed rebuild only rules out the wildcard; the other chips still run.
    let mut wildcard_failure = None;
    let wildcard = if context.chips_used.contains(&Chip::Wildcard) {
        None
    } else {
        match evaluate_wildcard(
            table,
            config,
            squad_ids,
            context.bank,
            config.chips.wildcard_horizon,
        ) {
            Ok(evaluation) => Some(evaluation),
            Err(err) => {
                warn!("wildcard evaluation failed: {err}");
                wildcard_failure = Some(err);
                None
            }
        }
    };
    let triple_captain = if context.chips_used.contains(&Chip::TripleCaptain) {
        None
    } else {
        Some(evaluate_triple_captain(table, config, squad_ids)?)
    };

    let mut recs = decide(
        table.current_round(),
        signals,
        wildcard.as_ref(),
        triple_captain.as_ref(),
        &context.chips_used,
        &config.chips,
    );
    if let Some(err) = wildcard_failure {
        recs.wildcard.reasoning = format!("Wildcard could not be evaluated: {err}");
    }
    Ok(recs)
}
