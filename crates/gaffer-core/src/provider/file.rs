// Snapshot provider backed by JSON files on disk (offline use and testing).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{ProviderError, SnapshotProvider};
use crate::model::{EntrySquad, Snapshot, SnapshotDocument};

/// Reads a `SnapshotDocument` from `snapshot_path` and entries from
/// `<entry_dir>/entry_<id>.json`.
pub struct FileProvider {
    snapshot_path: PathBuf,
    entry_dir: PathBuf,
}

impl FileProvider {
    pub fn new(snapshot_path: impl Into<PathBuf>, entry_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            entry_dir: entry_dir.into(),
        }
    }

    fn entry_path(&self, entry_id: u64) -> PathBuf {
        self.entry_dir.join(format!("entry_{entry_id}.json"))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProviderError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ProviderError::Io {
            path: path.display().to_string(),
            source,
        })?;
    serde_json::from_str(&text).map_err(|source| ProviderError::Parse {
        what: path.display().to_string(),
        source,
    })
}

#[async_trait]
impl SnapshotProvider for FileProvider {
    async fn fetch_snapshot(&self) -> Result<Snapshot, ProviderError> {
        let doc: SnapshotDocument = read_json(&self.snapshot_path).await?;
        if doc.players.is_empty() {
            return Err(ProviderError::MissingData(format!(
                "{} contains no players",
                self.snapshot_path.display()
            )));
        }
        info!(
            "Loaded snapshot from {} ({} players)",
            self.snapshot_path.display(),
            doc.players.len()
        );
        Ok(Snapshot::from_document(doc))
    }

    async fn fetch_entry(&self, entry_id: u64, round: u32) -> Result<EntrySquad, ProviderError> {
        let mut entry: EntrySquad = read_json(&self.entry_path(entry_id)).await?;
        if entry.entry_id != entry_id {
            return Err(ProviderError::MissingData(format!(
                "entry file for {entry_id} describes entry {}",
                entry.entry_id
            )));
        }
        entry.round = round;
        Ok(entry)
    }
}
