// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable activity record store.
//!
//! Records are persisted as JSON Lines (one activity per line) so the file
//! can be inspected or repaired with a text editor. Saves write to a
//! temporary sibling file and atomically rename over the original, so a
//! crash mid-save never truncates previously stored records.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::ActivityRecord;

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The record's id was unseen and the record was inserted.
    Inserted,
    /// An existing record was merged and changed.
    Updated,
    /// An existing record was merged with no observable change.
    Unchanged,
}

/// In-memory view of the persisted activity collection, keyed by activity id.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    records: BTreeMap<u64, ActivityRecord>,
}

impl RecordStore {
    /// Load the store from `path`, or start empty if the file does not exist.
    ///
    /// Any unparseable line is a [`Error::CorruptStore`]; the store never
    /// silently drops data. Duplicate ids within the file are merged.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path: path.clone(),
            records: BTreeMap::new(),
        };

        if !path.is_file() {
            tracing::info!(path = %path.display(), "No existing activity store, starting empty");
            return Ok(store);
        }

        let file = File::open(&path)?;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ActivityRecord =
                serde_json::from_str(&line).map_err(|e| Error::CorruptStore {
                    path: path.clone(),
                    reason: format!("line {}: {}", index + 1, e),
                })?;
            store.upsert(record);
        }

        tracing::info!(
            path = %path.display(),
            count = store.records.len(),
            "Loaded activity store"
        );
        Ok(store)
    }

    /// Insert or merge a record. See [`ActivityRecord::merge_from`] for the
    /// field-level merge rules.
    pub fn upsert(&mut self, record: ActivityRecord) -> Upsert {
        match self.records.get_mut(&record.id) {
            None => {
                self.records.insert(record.id, record);
                Upsert::Inserted
            }
            Some(existing) => {
                let before = existing.clone();
                existing.merge_from(record);
                if *existing == before {
                    Upsert::Unchanged
                } else {
                    Upsert::Updated
                }
            }
        }
    }

    /// Persist all records, replacing the store file atomically.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = tmp_sibling(&self.path);
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for record in self.records.values() {
                let line = serde_json::to_string(record).map_err(|e| {
                    Error::Io(std::io::Error::other(format!(
                        "failed to encode activity {}: {}",
                        record.id, e
                    )))
                })?;
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::info!(
            path = %self.path.display(),
            count = self.records.len(),
            "Saved activity store"
        );
        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<&ActivityRecord> {
        self.records.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.records.values()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start time of the most recent stored activity, used to bound
    /// incremental fetches.
    pub fn last_start_date(&self) -> Option<DateTime<Utc>> {
        self.records.values().map(|r| r.start_date).max()
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
