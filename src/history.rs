use crate::session::SessionRecord;
use anyhow::Context;
use std::io;
use std::path::{Path, PathBuf};

/// Finished sessions, oldest first, backed by a JSON file.
#[derive(Debug)]
pub struct History {
    path: PathBuf,
    records: Vec<SessionRecord>,
}

impl History {
    /// Loads the history at `path`. A missing file is an empty history.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Malformed history file {}", path.display()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no history file yet");
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        Ok(Self { path, records })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let contents = serde_json::to_string(&self.records)?;
        write_atomically(&self.path, contents.as_bytes())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), records = self.records.len(), "saved history");

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn get(&self, id: u64) -> Option<&SessionRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: SessionRecord) {
        self.records.push(record);
    }

    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        self.records.len() != before
    }

    pub fn rename(&mut self, id: u64, name: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                record.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn rename_lap(&mut self, id: u64, lap_id: u64, name: impl Into<String>) -> bool {
        let lap = self
            .get_mut(id)
            .and_then(|record| record.laps.iter_mut().find(|lap| lap.id == lap_id));

        match lap {
            Some(lap) => {
                lap.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, id: u64) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                record.expanded = !record.expanded;
                true
            }
            None => false,
        }
    }

    /// Replaces every record, e.g. with a list downloaded from the remote.
    pub fn adopt(&mut self, records: Vec<SessionRecord>) {
        tracing::info!(before = self.records.len(), after = records.len(), "adopting history");
        self.records = records;
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut SessionRecord> {
        self.records.iter_mut().find(|record| record.id == id)
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");

    std::fs::write(&temporary, contents)?;
    std::fs::rename(&temporary, path)
}
