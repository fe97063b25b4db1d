// Captaincy: captain, vice-captain and differential picks, plus the triple
// captain decision for the current round.

use std::cmp::Ordering;

use serde::Serialize;

use gaffer_core::config::EngineConfig;
use gaffer_core::model::{Player, PlayerId, Position, TeamId};

use crate::error::Result;
use crate::points::ScoreTable;
use crate::squad::resolve_squad;

const TOP_OPTIONS: usize = 5;

// ---------------------------------------------------------------------------
// Ceiling / floor
// ---------------------------------------------------------------------------

/// Upside multiplier; attackers get more room above their expected score.
pub fn upside(position: Position) -> f64 {
    match position {
        Position::Goalkeeper => 1.2,
        Position::Defender => 1.3,
        Position::Midfielder => 1.5,
        Position::Forward => 1.6,
    }
}

pub fn ceiling(player: &Player, score: f64) -> f64 {
    score * upside(player.position) + 0.2 * player.form.max(0.0)
}

pub fn floor(player: &Player, score: f64) -> f64 {
    let variance = 0.4 * score + 2.0 * (1.0 - player.availability.clamp(0.0, 1.0));
    (score - variance).max(0.0)
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptainOption {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub team: TeamId,
    pub score: f64,
    pub ceiling: f64,
    pub floor: f64,
    pub ownership: f64,
    /// Mean fixture difficulty over the horizon.
    pub fixture_difficulty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptainRecommendation {
    pub captain: CaptainOption,
    pub vice_captain: CaptainOption,
    pub differential: Option<CaptainOption>,
    /// Best five by score, captain first.
    pub top_options: Vec<CaptainOption>,
    pub reasoning: String,
    pub horizon: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripleCaptainEvaluation {
    pub recommended: bool,
    pub reason: String,
    pub player: Option<CaptainOption>,
    pub round: u32,
    /// Fixtures the top-ceiling player has in the round.
    pub fixtures: usize,
}

fn option_for(table: &ScoreTable<'_>, player: &Player, horizon: u32) -> CaptainOption {
    let score = table.score(player, horizon);
    CaptainOption {
        id: player.id,
        name: player.name.clone(),
        position: player.position,
        team: player.team,
        score,
        ceiling: ceiling(player, score),
        floor: floor(player, score),
        ownership: player.ownership,
        fixture_difficulty: table.fixtures().average_difficulty(
            player.team,
            table.current_round(),
            horizon,
        ),
    }
}

fn by_score(a: &CaptainOption, b: &CaptainOption) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.id.cmp(&b.id))
}

fn by_ceiling(a: &CaptainOption, b: &CaptainOption) -> Ordering {
    b.ceiling
        .partial_cmp(&a.ceiling)
        .unwrap_or(Ordering::Equal)
        .then(a.id.cmp(&b.id))
}

// ---------------------------------------------------------------------------
// Captain
// ---------------------------------------------------------------------------

/// Captain is the highest score, vice the second highest (ties by id). The
/// differential is the highest-ceiling remaining player owned by fewer than
/// `captain.differential_ownership` percent of managers.
pub fn suggest_captain(
    table: &ScoreTable<'_>,
    config: &EngineConfig,
    squad_ids: &[PlayerId],
    horizon: u32,
) -> Result<CaptainRecommendation> {
    let players = resolve_squad(table.snapshot(), squad_ids)?;
    let mut options: Vec<CaptainOption> = players
        .iter()
        .map(|p| option_for(table, p, horizon))
        .collect();
    options.sort_by(by_score);

    let captain = options[0].clone();
    let vice_captain = options[1].clone();
    let threshold = config.captain.differential_ownership;
    let differential = options[2..]
        .iter()
        .filter(|o| o.ownership < threshold)
        .min_by(|a, b| by_ceiling(a, b))
        .cloned();

    let form = players
        .iter()
        .find(|p| p.id == captain.id)
        .map_or(0.0, |p| p.form);
    let reasoning = captain_reasoning(&captain, form);

    Ok(CaptainRecommendation {
        top_options: options.iter().take(TOP_OPTIONS).cloned().collect(),
        captain,
        vice_captain,
        differential,
        reasoning,
        horizon,
    })
}

fn captain_reasoning(captain: &CaptainOption, form: f64) -> String {
    let mut reasons = vec![format!("Highest expected points ({:.1})", captain.score)];
    if form > 6.0 {
        reasons.push(format!("excellent form ({form:.1})"));
    } else if form > 4.0 {
        reasons.push(format!("good form ({form:.1})"));
    }
    if captain.fixture_difficulty < 2.5 {
        reasons.push("favourable fixtures".into());
    } else if captain.fixture_difficulty > 3.5 {
        reasons.push("tough fixtures, so keep the vice-captain in mind".into());
    }
    match captain.position {
        Position::Forward => reasons.push("forward with a high ceiling".into()),
        Position::Midfielder => reasons.push("attacking midfielder".into()),
        _ => {}
    }
    reasons.join(", ")
}

// ---------------------------------------------------------------------------
// Triple captain
// ---------------------------------------------------------------------------

/// Recommend the triple captain when the top-ceiling player plays twice this
/// round, or once with difficulty below `captain.triple_captain_difficulty`
/// and a ceiling above `captain.triple_captain_ceiling`.
pub fn evaluate_triple_captain(
    table: &ScoreTable<'_>,
    config: &EngineConfig,
    squad_ids: &[PlayerId],
) -> Result<TripleCaptainEvaluation> {
    let players = resolve_squad(table.snapshot(), squad_ids)?;
    let round = table.current_round();

    let mut options: Vec<CaptainOption> =
        players.iter().map(|p| option_for(table, p, 1)).collect();
    options.sort_by(by_ceiling);
    let top = options.swap_remove(0);

    let fixtures = table.fixtures().fixture_count(top.team, round);
    let difficulty = table.fixtures().round_difficulty(top.team, round);

    let (recommended, reason) = if fixtures >= 2 {
        (
            true,
            format!("{} plays {fixtures} times in round {round}", top.name),
        )
    } else if fixtures == 1
        && difficulty.is_some_and(|d| d < config.captain.triple_captain_difficulty)
        && top.ceiling > config.captain.triple_captain_ceiling
    {
        (
            true,
            format!(
                "{} has an exceptional fixture (ceiling {:.1})",
                top.name, top.ceiling
            ),
        )
    } else {
        (false, "Save for better opportunity".to_string())
    };

    Ok(TripleCaptainEvaluation {
        recommended,
        reason,
        player: recommended.then_some(top),
        round,
        fixtures,
    })
}
