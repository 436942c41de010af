//! Sparse per-record edits layered over immutable base data.
//!
//! The overlay maps a record's base index to the fields the user changed. Entries are
//! persisted as one blob (`{"<index>": {field: value}}`) and never removed by a flush; a
//! dirty set tracks which indices changed since the last successful write.

use std::collections::{BTreeMap, BTreeSet};
use tabula_model::{FieldValue, Record};
use tabula_storage::{PersistenceStore, SaveOutcome, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Number of dirty records included in the write.
    pub entries_flushed: usize,
    /// Whether the store accepted the write (or already held identical data).
    pub persisted: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOverlay {
    entries: BTreeMap<usize, Record>,
    dirty: BTreeSet<usize>,
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the overlay persisted under `key`. Missing or unreadable data yields an empty
    /// overlay.
    pub fn load(store: &PersistenceStore, key: &str) -> Self {
        let entries: BTreeMap<usize, Record> = store.load(key).unwrap_or_default();
        log::debug!("restored {} overlay entries from `{key}`", entries.len());
        Self {
            entries,
            dirty: BTreeSet::new(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.entries.get(&index)
    }

    pub fn entries(&self) -> &BTreeMap<usize, Record> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// A copy of this overlay with `column_id` of record `index` set to `value`.
    ///
    /// An empty text value is an explicit edit and is kept, unlike a never-edited field.
    pub fn set_cell(
        &self,
        index: usize,
        column_id: &str,
        value: impl Into<FieldValue>,
    ) -> EditOverlay {
        let mut next = self.clone();
        next.entries
            .entry(index)
            .or_default()
            .set(column_id, value);
        next.dirty.insert(index);
        next
    }

    /// A copy of this overlay without the edit to `column_id` of record `index`.
    pub fn revert_cell(&self, index: usize, column_id: &str) -> EditOverlay {
        let mut next = self.clone();
        let Some(entry) = next.entries.get_mut(&index) else {
            return next;
        };
        if entry.remove(column_id).is_none() {
            return next;
        }
        if entry.is_empty() {
            next.entries.remove(&index);
        }
        next.dirty.insert(index);
        next
    }

    /// Persist every entry under `key` if anything changed since the last flush.
    ///
    /// On failure the dirty set is kept so a later flush retries the same write.
    pub fn flush(
        &mut self,
        store: &PersistenceStore,
        key: &str,
    ) -> Result<FlushOutcome, StorageError> {
        if self.dirty.is_empty() {
            return Ok(FlushOutcome {
                entries_flushed: 0,
                persisted: false,
            });
        }

        let entries_flushed = self.dirty.len();
        match store.save(key, &self.entries)? {
            SaveOutcome::Written { bytes } => {
                log::debug!("flushed {entries_flushed} overlay entries ({bytes} bytes)");
            }
            SaveOutcome::Unchanged => {
                log::debug!("overlay under `{key}` already up to date");
            }
        }
        self.dirty.clear();
        Ok(FlushOutcome {
            entries_flushed,
            persisted: true,
        })
    }
}

/// Base records with each overlay entry shallow-merged over the record at the same index.
///
/// Entries for indices past the end of `base` are ignored.
pub fn apply_overlay(base: &[Record], overlay: &EditOverlay) -> Vec<Record> {
    base.iter()
        .enumerate()
        .map(|(index, record)| match overlay.get(index) {
            Some(patch) => record.merged(patch),
            None => record.clone(),
        })
        .collect()
}
