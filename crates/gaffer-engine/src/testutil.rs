// Builders shared by the unit tests.

use chrono::{TimeZone, Utc};

use gaffer_core::model::{Fixture, Player, PlayerId, PlayerStatus, Position, Snapshot, TeamId};

use crate::squad::required_count;

/// A fully available player whose form, season average and forecast all equal `base`.
pub fn player(id: PlayerId, position: Position, team: TeamId, cost: u32, base: f64) -> Player {
    Player {
        id,
        name: format!("P{id}"),
        position,
        team,
        cost,
        form: base,
        points_per_round: base,
        forecast: base,
        availability: 1.0,
        ownership: 5.0,
        status: PlayerStatus::Available,
        chance_of_playing: None,
        total_points: 0,
    }
}

pub fn fixture(id: u32, round: u32, home: TeamId, away: TeamId, hd: u8, ad: u8) -> Fixture {
    Fixture {
        id,
        round: Some(round),
        home_team: home,
        away_team: away,
        home_difficulty: hd,
        away_difficulty: ad,
    }
}

pub fn snapshot_with(players: Vec<Player>, fixtures: Vec<Fixture>) -> Snapshot {
    let fetched_at = Utc
        .with_ymd_and_hms(2024, 8, 16, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    Snapshot::new(players, vec![], fixtures, 1, fetched_at)
}

pub fn snapshot_of(players: Vec<Player>) -> Snapshot {
    snapshot_with(players, vec![])
}

/// A legal 2/5/5/3 squad with ids 1..=15 in position order, one player per
/// team (team = id) and cost 50 each. `base(position, k)` sets the k-th
/// player of each position.
pub fn standard_squad(base: impl Fn(Position, usize) -> f64) -> Vec<Player> {
    let mut players = Vec::with_capacity(15);
    let mut id = 1;
    for position in Position::ALL {
        for k in 0..required_count(position) {
            players.push(player(id, position, id, 50, base(position, k)));
            id += 1;
        }
    }
    players
}
