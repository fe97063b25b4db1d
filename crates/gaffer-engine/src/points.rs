// Expected points model.
//
// Per round r in [current_round, current_round + horizon):
//   base(p) * (1.4 - 0.12 * d(r)) * availability
// where base = 0.5 * form + 0.3 * points_per_round + 0.2 * forecast and d(r)
// is the team's difficulty that round (window average for blank rounds).
// The sum is floored at zero.

use std::cell::RefCell;
use std::collections::HashMap;

use gaffer_core::model::{Player, PlayerId, Snapshot};

use crate::fixtures::FixtureDifficulty;

// ---------------------------------------------------------------------------
// Model weights
// ---------------------------------------------------------------------------

const FORM_WEIGHT: f64 = 0.5;
const PPR_WEIGHT: f64 = 0.3;
const FORECAST_WEIGHT: f64 = 0.2;

const DIFFICULTY_INTERCEPT: f64 = 1.4;
const DIFFICULTY_SLOPE: f64 = 0.12;

/// Blend of recent form, season average and the external forecast.
pub fn base_rate(player: &Player) -> f64 {
    FORM_WEIGHT * finite_or_zero(player.form)
        + PPR_WEIGHT * finite_or_zero(player.points_per_round)
        + FORECAST_WEIGHT * finite_or_zero(player.forecast)
}

/// Scaling applied for a fixture of difficulty `d` (1 easy, 5 hard).
pub fn difficulty_multiplier(d: f64) -> f64 {
    DIFFICULTY_INTERCEPT - DIFFICULTY_SLOPE * d
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Expected points for `player` over `horizon` rounds starting at `start_round`.
pub fn expected_points(
    player: &Player,
    fixtures: &FixtureDifficulty,
    start_round: u32,
    horizon: u32,
) -> f64 {
    let availability = finite_or_zero(player.availability).clamp(0.0, 1.0);
    let base = base_rate(player);
    if horizon == 0 || availability == 0.0 || base == 0.0 {
        return 0.0;
    }

    let window_avg = fixtures.average_difficulty(player.team, start_round, horizon);
    let total: f64 = (start_round..start_round.saturating_add(horizon))
        .map(|round| {
            let d = fixtures
                .round_difficulty(player.team, round)
                .unwrap_or(window_avg);
            base * difficulty_multiplier(d) * availability
        })
        .sum();
    total.max(0.0)
}

// ---------------------------------------------------------------------------
// ScoreTable
// ---------------------------------------------------------------------------

/// Per-call memo of expected points keyed by `(player, horizon, start round)`.
///
/// Built fresh for every engine call; never shared across snapshots.
pub struct ScoreTable<'a> {
    snapshot: &'a Snapshot,
    fixtures: FixtureDifficulty,
    memo: RefCell<HashMap<(PlayerId, u32, u32), f64>>,
}

impl<'a> ScoreTable<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        ScoreTable {
            snapshot,
            fixtures: FixtureDifficulty::new(snapshot),
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    pub fn fixtures(&self) -> &FixtureDifficulty {
        &self.fixtures
    }

    pub fn current_round(&self) -> u32 {
        self.snapshot.current_round()
    }

    /// Expected points from the current round over `horizon` rounds.
    pub fn score(&self, player: &Player, horizon: u32) -> f64 {
        self.score_from(player, self.current_round(), horizon)
    }

    pub fn score_from(&self, player: &Player, start_round: u32, horizon: u32) -> f64 {
        let key = (player.id, horizon, start_round);
        if let Some(&cached) = self.memo.borrow().get(&key) {
            return cached;
        }
        let value = expected_points(player, &self.fixtures, start_round, horizon);
        self.memo.borrow_mut().insert(key, value);
        value
    }

    /// Score by id; `None` for an id missing from the snapshot.
    pub fn score_id(&self, id: PlayerId, horizon: u32) -> Option<f64> {
        self.snapshot.player(id).map(|p| self.score(p, horizon))
    }

    /// Expected points per million over `horizon`.
    pub fn value(&self, player: &Player, horizon: u32) -> f64 {
        if player.cost == 0 {
            return 0.0;
        }
        self.score(player, horizon) / player.price()
    }

    pub fn memo_len(&self) -> usize {
        self.memo.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gaffer_core::model::{Fixture, PlayerStatus, Position};

    fn player(form: f64, ppr: f64, forecast: f64, availability: f64) -> Player {
        Player {
            id: 1,
            name: "Saka".into(),
            position: Position::Midfielder,
            team: 1,
            cost: 100,
            form,
            points_per_round: ppr,
            forecast,
            availability,
            ownership: 30.0,
            status: PlayerStatus::Available,
            chance_of_playing: None,
            total_points: 0,
        }
    }

    fn fixture(round: u32, difficulty: u8) -> Fixture {
        Fixture {
            id: round,
            round: Some(round),
            home_team: 1,
            away_team: 2,
            home_difficulty: difficulty,
            away_difficulty: 3,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn single_round_matches_formula() {
        let p = player(6.0, 5.0, 4.0, 1.0);
        let cal = FixtureDifficulty::from_fixtures(&[fixture(1, 2)]);
        // base = 3.0 + 1.5 + 0.8 = 5.3; multiplier = 1.4 - 0.24 = 1.16
        assert!(approx(expected_points(&p, &cal, 1, 1), 5.3 * 1.16));
    }

    #[test]
    fn blank_round_uses_window_average() {
        let p = player(10.0, 0.0, 0.0, 1.0);
        // Rounds 1 and 3 have fixtures (difficulty 2 and 4); round 2 is blank.
        let cal = FixtureDifficulty::from_fixtures(&[fixture(1, 2), fixture(3, 4)]);
        let expected = 5.0 * (1.4 - 0.24) + 5.0 * (1.4 - 0.36) + 5.0 * (1.4 - 0.48);
        assert!(approx(expected_points(&p, &cal, 1, 3), expected));
    }

    #[test]
    fn no_fixtures_uses_neutral_difficulty() {
        let p = player(10.0, 0.0, 0.0, 1.0);
        let cal = FixtureDifficulty::default();
        assert!(approx(expected_points(&p, &cal, 1, 2), 2.0 * 5.0 * (1.4 - 0.36)));
    }

    #[test]
    fn availability_scales_and_zero_availability_scores_zero() {
        let cal = FixtureDifficulty::from_fixtures(&[fixture(1, 3)]);
        let full = expected_points(&player(4.0, 4.0, 4.0, 1.0), &cal, 1, 1);
        let half = expected_points(&player(4.0, 4.0, 4.0, 0.5), &cal, 1, 1);
        assert!(approx(half * 2.0, full));
        assert_eq!(expected_points(&player(4.0, 4.0, 4.0, 0.0), &cal, 1, 1), 0.0);
    }

    #[test]
    fn negative_inputs_floor_at_zero() {
        let cal = FixtureDifficulty::from_fixtures(&[fixture(1, 3)]);
        assert_eq!(expected_points(&player(-4.0, 0.0, 0.0, 1.0), &cal, 1, 1), 0.0);
    }

    #[test]
    fn missing_numerics_are_zero_not_errors() {
        let cal = FixtureDifficulty::from_fixtures(&[fixture(1, 3)]);
        let p = player(f64::NAN, 5.0, 0.0, 1.0);
        assert!(approx(expected_points(&p, &cal, 1, 1), 1.5 * (1.4 - 0.36)));
    }

    #[test]
    fn monotone_in_inputs_and_difficulty() {
        let easy = FixtureDifficulty::from_fixtures(&[fixture(1, 2)]);
        let hard = FixtureDifficulty::from_fixtures(&[fixture(1, 4)]);
        let base = player(3.0, 3.0, 3.0, 0.9);

        let s = expected_points(&base, &easy, 1, 1);
        assert!(expected_points(&player(4.0, 3.0, 3.0, 0.9), &easy, 1, 1) >= s);
        assert!(expected_points(&player(3.0, 4.0, 3.0, 0.9), &easy, 1, 1) >= s);
        assert!(expected_points(&player(3.0, 3.0, 4.0, 0.9), &easy, 1, 1) >= s);
        assert!(expected_points(&base, &hard, 1, 1) <= s);
    }

    #[test]
    fn score_table_memoizes_per_key() {
        let snapshot = Snapshot::new(
            vec![player(5.0, 5.0, 5.0, 1.0)],
            vec![],
            vec![fixture(1, 2), fixture(2, 3)],
            1,
            Utc::now(),
        );
        let table = ScoreTable::new(&snapshot);
        let a = table.score_id(1, 2).unwrap();
        let b = table.score_id(1, 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(table.memo_len(), 1);
        table.score_id(1, 1).unwrap();
        assert_eq!(table.memo_len(), 2);
        assert!(table.score_id(42, 1).is_none());
    }

    #[test]
    fn value_is_score_per_million() {
        let snapshot = Snapshot::new(
            vec![player(5.0, 5.0, 5.0, 1.0)],
            vec![],
            vec![fixture(1, 3)],
            1,
            Utc::now(),
        );
        let table = ScoreTable::new(&snapshot);
        let p = snapshot.player(1).unwrap();
        assert!(approx(table.value(p, 1), table.score(p, 1) / 10.0));
    }
}
