//! Backing up and restoring the session history through a remote store.
//!
//! The history is always exchanged as one flat list. A download either yields
//! that list, reports that nothing is stored, or hands back two competing
//! copies that the caller must choose between before anything is adopted.

use crate::history::History;
use crate::session::SessionRecord;
use anyhow::Context;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub trait Remote {
    /// Creates the remote copy or replaces the existing one.
    fn upload(&mut self, records: &[SessionRecord]) -> anyhow::Result<()>;

    fn download(&mut self) -> anyhow::Result<Download>;
}

#[derive(Debug)]
pub enum Download {
    Success(Vec<SessionRecord>),
    Conflict(Candidate, Candidate),
    NotFound,
}

/// One of two competing remote copies, still unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub modified: Option<String>,
    pub content: String,
}

impl Candidate {
    pub fn records(&self) -> anyhow::Result<Vec<SessionRecord>> {
        serde_json::from_str(&self.content)
            .with_context(|| format!("Remote history {} is not a valid session list", self.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    First,
    Second,
}

#[derive(Debug)]
pub struct ChoiceParseError;

impl Display for ChoiceParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected 1, 2, first or second")
    }
}

impl Error for ChoiceParseError {}

impl FromStr for Choice {
    type Err = ChoiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "first" => Ok(Choice::First),
            "2" | "second" => Ok(Choice::Second),
            _ => Err(ChoiceParseError),
        }
    }
}

/// Picks one side of a conflict and parses it.
pub fn resolve(first: Candidate, second: Candidate, choice: Choice) -> anyhow::Result<Vec<SessionRecord>> {
    let chosen = match choice {
        Choice::First => first,
        Choice::Second => second,
    };

    tracing::debug!(id = %chosen.id, ?choice, "resolved history conflict");

    chosen.records()
}

#[derive(Debug)]
pub enum Outcome {
    /// The local history was replaced with this many records.
    Adopted(usize),
    NotFound,
    /// Two remote copies exist and no choice was made; nothing changed.
    Unresolved(Candidate, Candidate),
}

pub fn upload(remote: &mut impl Remote, history: &History) -> anyhow::Result<()> {
    remote.upload(history.records())
}

/// Downloads the remote history and adopts it wholesale, saving it locally.
pub fn download(
    remote: &mut impl Remote,
    history: &mut History,
    choice: Option<Choice>,
) -> anyhow::Result<Outcome> {
    let records = match remote.download()? {
        Download::Success(records) => records,
        Download::NotFound => return Ok(Outcome::NotFound),
        Download::Conflict(first, second) => match choice {
            Some(choice) => resolve(first, second, choice)?,
            None => return Ok(Outcome::Unresolved(first, second)),
        },
    };

    let adopted = records.len();
    history.adopt(records);
    history.save()?;

    Ok(Outcome::Adopted(adopted))
}
