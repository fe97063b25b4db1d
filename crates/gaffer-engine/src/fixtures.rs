// Fixture difficulty estimation.
//
// Difficulties are per side (home/away) on the 1..=5 scale. Unscheduled
// fixtures (no round) are ignored. Blank rounds are never zero-filled.

use std::collections::{BTreeSet, HashMap};

use gaffer_core::model::{Fixture, Snapshot, TeamId};

/// Difficulty assumed when a team has no fixture in the window.
pub const NEUTRAL_DIFFICULTY: f64 = 3.0;

const MIN_DIFFICULTY: f64 = 1.0;
const MAX_DIFFICULTY: f64 = 5.0;

fn clamp(d: f64) -> f64 {
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Per-team index of scheduled fixtures: `(round, difficulty)` pairs.
#[derive(Debug, Clone, Default)]
pub struct FixtureDifficulty {
    by_team: HashMap<TeamId, Vec<(u32, u8)>>,
}

impl FixtureDifficulty {
    pub fn new(snapshot: &Snapshot) -> Self {
        Self::from_fixtures(snapshot.fixtures())
    }

    pub fn from_fixtures(fixtures: &[Fixture]) -> Self {
        let mut by_team: HashMap<TeamId, Vec<(u32, u8)>> = HashMap::new();
        for f in fixtures {
            let Some(round) = f.round else {
                continue;
            };
            for team in [f.home_team, f.away_team] {
                if let Some(d) = f.difficulty_for(team) {
                    by_team.entry(team).or_default().push((round, d));
                }
            }
        }
        FixtureDifficulty { by_team }
    }

    fn in_rounds(&self, team: TeamId, start: u32, end: u32) -> impl Iterator<Item = u8> + '_ {
        self.by_team
            .get(&team)
            .into_iter()
            .flatten()
            .filter(move |(r, _)| *r >= start && *r < end)
            .map(|(_, d)| *d)
    }

    /// Mean difficulty over `start_round <= round < start_round + window`,
    /// or `NEUTRAL_DIFFICULTY` when the team has no fixture in the window.
    pub fn average_difficulty(&self, team: TeamId, start_round: u32, window: u32) -> f64 {
        let end = start_round.saturating_add(window);
        let (sum, n) = self
            .in_rounds(team, start_round, end)
            .fold((0.0, 0u32), |(s, n), d| (s + f64::from(d), n + 1));
        if n == 0 {
            NEUTRAL_DIFFICULTY
        } else {
            clamp(sum / f64::from(n))
        }
    }

    /// Mean difficulty of the team's fixtures in `round`; `None` for a blank.
    pub fn round_difficulty(&self, team: TeamId, round: u32) -> Option<f64> {
        let (sum, n) = self
            .in_rounds(team, round, round + 1)
            .fold((0.0, 0u32), |(s, n), d| (s + f64::from(d), n + 1));
        (n > 0).then(|| clamp(sum / f64::from(n)))
    }

    pub fn fixture_count(&self, team: TeamId, round: u32) -> usize {
        self.in_rounds(team, round, round + 1).count()
    }

    /// Teams playing at least twice in `round`, ascending by id.
    pub fn double_round_teams(&self, round: u32) -> Vec<TeamId> {
        let teams: BTreeSet<TeamId> = self
            .by_team
            .keys()
            .copied()
            .filter(|&t| self.fixture_count(t, round) >= 2)
            .collect();
        teams.into_iter().collect()
    }
}
