// Engine facade: one entry point per decision, each a pure function of the
// snapshot and the engine configuration.
//
// Every call builds its own ScoreTable, so memoized scores never outlive the
// call that computed them.

use tracing::debug;

use gaffer_core::config::EngineConfig;
use gaffer_core::model::{PlayerId, Position, Snapshot};

use crate::captain::{self, CaptainRecommendation, TripleCaptainEvaluation};
use crate::chips::{self, ChipRecommendations, RoundContext};
use crate::error::{invalid, Result};
use crate::lineup::{self, Lineup};
use crate::points::ScoreTable;
use crate::squad::{self, resolve_squad, Squad};
use crate::transfers::{self, TransferOutcome, TransferRequest, WildcardEvaluation};
use crate::value::{self, PlayerComparison, ValueEntry};

#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    snapshot: &'a Snapshot,
    config: &'a EngineConfig,
}

impl<'a> Engine<'a> {
    pub fn new(snapshot: &'a Snapshot, config: &'a EngineConfig) -> Self {
        Engine { snapshot, config }
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    fn table(&self) -> ScoreTable<'a> {
        ScoreTable::new(self.snapshot)
    }

    fn check_squad(&self, squad: &[PlayerId]) -> Result<()> {
        resolve_squad(self.snapshot, squad).map(|_| ())
    }

    pub fn optimize_squad(&self, budget: u32, horizon: u32) -> Result<Squad> {
        check_horizon(horizon)?;
        debug!("optimize_squad budget={budget} horizon={horizon}");
        squad::optimize_squad(&self.table(), self.config, budget, horizon)
    }

    pub fn optimize_lineup(&self, squad: &[PlayerId], horizon: u32) -> Result<Lineup> {
        check_horizon(horizon)?;
        self.check_squad(squad)?;
        lineup::optimize_lineup(&self.table(), self.config, squad, horizon)
    }

    pub fn suggest_transfers(&self, request: &TransferRequest) -> Result<TransferOutcome> {
        check_horizon(request.horizon)?;
        self.check_squad(&request.squad)?;
        debug!(
            "suggest_transfers n={} free={} horizon={}",
            request.num_transfers, request.free_transfers, request.horizon
        );
        transfers::suggest_transfers(&self.table(), self.config, request)
    }

    pub fn evaluate_wildcard(
        &self,
        squad: &[PlayerId],
        bank: u32,
        horizon: u32,
    ) -> Result<WildcardEvaluation> {
        check_horizon(horizon)?;
        self.check_squad(squad)?;
        transfers::evaluate_wildcard(&self.table(), self.config, squad, bank, horizon)
    }

    pub fn suggest_captain(
        &self,
        squad: &[PlayerId],
        horizon: u32,
    ) -> Result<CaptainRecommendation> {
        check_horizon(horizon)?;
        self.check_squad(squad)?;
        captain::suggest_captain(&self.table(), self.config, squad, horizon)
    }

    pub fn evaluate_triple_captain(&self, squad: &[PlayerId]) -> Result<TripleCaptainEvaluation> {
        self.check_squad(squad)?;
        captain::evaluate_triple_captain(&self.table(), self.config, squad)
    }

    pub fn chip_recommendations(
        &self,
        squad: &[PlayerId],
        context: &RoundContext,
    ) -> Result<ChipRecommendations> {
        self.check_squad(squad)?;
        chips::chip_recommendations(&self.table(), self.config, squad, context)
    }

    pub fn value_players(&self, position: Option<Position>, limit: usize) -> Vec<ValueEntry> {
        value::value_players(&self.table(), position, limit)
    }

    pub fn compare_players(
        &self,
        a: PlayerId,
        b: PlayerId,
        horizon: u32,
    ) -> Result<PlayerComparison> {
        check_horizon(horizon)?;
        value::compare_players(&self.table(), a, b, horizon)
    }
}

fn check_horizon(horizon: u32) -> Result<()> {
    if horizon == 0 {
        return Err(invalid("horizon must be at least 1 round"));
    }
    Ok(())
}
