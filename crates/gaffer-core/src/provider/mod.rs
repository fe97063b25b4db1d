// Data acquisition: the seam between the engine and wherever snapshots come from.

pub mod file;
pub mod fpl;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ProviderKind, SourceConfig};
use crate::model::{EntrySquad, Snapshot};

pub use file::FileProvider;
pub use fpl::FplClient;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        source: serde_json::Error,
    },

    #[error("missing data: {0}")]
    MissingData(String),
}

/// Supplies snapshots and user squads. Implementations own their retry and
/// transport policy; the engine never calls them directly.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Fetch a fresh snapshot of players, teams, fixtures and the current round.
    async fn fetch_snapshot(&self) -> Result<Snapshot, ProviderError>;

    /// Fetch a user's squad, bank and used chips as of `round`.
    async fn fetch_entry(&self, entry_id: u64, round: u32) -> Result<EntrySquad, ProviderError>;
}

/// Build the provider selected by `source.toml`.
pub fn from_config(source: &SourceConfig) -> Box<dyn SnapshotProvider> {
    match source.provider {
        ProviderKind::Fpl => Box::new(FplClient::new(source.base_url.clone())),
        ProviderKind::File => Box::new(FileProvider::new(
            source.snapshot_path.clone(),
            source.entry_dir.clone(),
        )),
    }
}
