// Per-save spell records, one JSON file per save directory.

use crate::domain::{PlayerId, PlayerSpellState};
use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SAVE_FILE_NAME: &str = "magic0.2.json";

pub type SaveRecords = BTreeMap<PlayerId, PlayerSpellState>;

#[derive(Debug)]
pub enum PersistError {
    Io(std::io::Error),
    Malformed(serde_json::Error),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io(err) => write!(f, "save file i/o failed: {err}"),
            PersistError::Malformed(err) => write!(f, "save file is malformed: {err}"),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        PersistError::Io(e)
    }
}

#[derive(Debug, Clone)]
pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SAVE_FILE_NAME)
    }

    /// All records in the save. A save without the file yet is empty, not an error.
    pub async fn load(&self) -> Result<SaveRecords, PersistError> {
        let path = self.path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no spell save yet");
                return Ok(SaveRecords::new());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(PersistError::Malformed)
    }

    pub async fn save(&self, records: &SaveRecords) -> Result<(), PersistError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(records).map_err(PersistError::Malformed)?;
        write_replacing(&self.path(), &bytes).await?;
        info!(path = %self.path().display(), players = records.len(), "spell save written");
        Ok(())
    }

    /// Replaces one player's record and keeps everyone else's.
    pub async fn save_player(
        &self,
        player_id: PlayerId,
        state: &PlayerSpellState,
    ) -> Result<(), PersistError> {
        let mut records = self.load().await?;
        records.insert(player_id, state.clone());
        self.save(&records).await
    }
}

// Write to a sibling file first so a crash never leaves a half-written save.
async fn write_replacing(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
