//! Bucket: the ordered collision chain for one hash index.
//!
//! Entries are kept sorted by key under the table's key comparator.
//! Equal keys are allowed; a new key goes after every existing equal key
//! and lookups return the first equal key, so lookups see the oldest
//! insertion.

use crate::hash_table::EntryId;
use core::cmp::Ordering;

#[derive(Debug)]
pub(crate) struct Bucket {
    entries: Vec<EntryId>,
}

impl Bucket {
    pub(crate) fn new() -> Self {
        Bucket {
            entries: Vec::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn head(&self) -> Option<EntryId> {
        self.entries.first().copied()
    }

    pub(crate) fn tail(&self) -> Option<EntryId> {
        self.entries.last().copied()
    }

    pub(crate) fn get(&self, pos: usize) -> Option<EntryId> {
        self.entries.get(pos).copied()
    }

    /// Position a new key takes: after every entry not greater than it.
    /// `cmp(id)` orders the stored key of `id` against the new key.
    pub(crate) fn insert_position(&self, cmp: impl Fn(EntryId) -> Ordering) -> usize {
        self.entries
            .partition_point(|&id| cmp(id) != Ordering::Greater)
    }

    pub(crate) fn insert_at(&mut self, pos: usize, id: EntryId) {
        self.entries.insert(pos, id);
    }

    /// Position of the first entry equal to the probe.
    pub(crate) fn find(&self, cmp: impl Fn(EntryId) -> Ordering) -> Option<usize> {
        let pos = self
            .entries
            .partition_point(|&id| cmp(id) == Ordering::Less);
        match self.entries.get(pos) {
            Some(&id) if cmp(id) == Ordering::Equal => Some(pos),
            _ => None,
        }
    }

    pub(crate) fn position_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|&e| e == id)
    }

    pub(crate) fn remove_at(&mut self, pos: usize) -> EntryId {
        self.entries.remove(pos)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.entries.iter().copied()
    }
}
