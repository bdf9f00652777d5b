//! Event Log
//!
//! Durable, append-only record of every successful store mutation, one
//! JSON-encoded event per line. Replaying the log in order rebuilds the
//! store; the in-memory store stays the source of truth while the process
//! runs.

mod error;

pub use error::EventLogError;

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::domain::VisitEvent;
use crate::store::VisitStore;

/// Append-only JSONL event log
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl EventLog {
    /// Open the log for appending, creating it if absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EventLogError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event and flush it to the OS
    pub fn append(&self, event: &VisitEvent) -> Result<(), EventLogError> {
        let mut line = serde_json::to_string(event).map_err(EventLogError::Encode)?;
        line.push('\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Read every event from a log file, in order
    ///
    /// A missing file is an empty log. A malformed line fails the whole
    /// replay; a truncated log must be repaired by the operator, not
    /// silently half-loaded.
    pub fn replay(path: impl AsRef<Path>) -> Result<Vec<VisitEvent>, EventLogError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut events = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line).map_err(|source| {
                EventLogError::Malformed {
                    line: index + 1,
                    source,
                }
            })?;
            events.push(event);
        }
        Ok(events)
    }

    /// Replay a log file into a store
    pub fn replay_into(path: impl AsRef<Path>, store: &VisitStore) -> Result<usize, EventLogError> {
        let events = Self::replay(path)?;
        let count = events.len();
        for event in events {
            store.apply_replayed(event);
        }
        Ok(count)
    }
}
