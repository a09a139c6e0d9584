use std::collections::HashSet;

use chrono::{DateTime, Local};

use crate::error::{CalorieError, Result};
use crate::models::{Entry, EntryId, EntryStatus, parse_calories};

/// Session-scoped source of entry ids.
///
/// Ids are handed out from a counter, so two submissions in the same
/// millisecond still get distinct ids. The counter is seeded from the wall
/// clock so ids from separate sessions rarely overlap on the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    #[must_use]
    pub fn starting_at(next: u64) -> Self {
        Self { next: next.max(1) }
    }

    #[must_use]
    pub fn from_clock() -> Self {
        let millis = Local::now().timestamp_millis();
        Self::starting_at(u64::try_from(millis).unwrap_or(1))
    }

    /// The id the next call to [`IdSequence::issue`] returns.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next
    }

    pub fn issue(&mut self) -> EntryId {
        let id = EntryId(self.next);
        self.next += 1;
        id
    }

    /// Make sure `id` is never issued again.
    pub fn observe(&mut self, id: EntryId) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}

/// Today's entries, in the order they were added.
#[derive(Debug, Clone)]
pub struct EntryStore {
    entries: Vec<Entry>,
    ids: IdSequence,
}

impl EntryStore {
    #[must_use]
    pub fn new(ids: IdSequence) -> Self {
        Self {
            entries: Vec::new(),
            ids,
        }
    }

    /// Rebuild a store from saved entries. Only active entries are accepted
    /// and ids must be unique.
    pub fn restore(entries: Vec<Entry>, mut ids: IdSequence) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id()) {
                return Err(CalorieError::Validation(format!(
                    "Duplicate entry id {} in saved session",
                    entry.id()
                )));
            }
            if entry.status() != EntryStatus::Active {
                return Err(CalorieError::Validation(format!(
                    "Saved entry {} is not active",
                    entry.id()
                )));
            }
            ids.observe(entry.id());
        }
        Ok(Self { entries, ids })
    }

    pub fn add(&mut self, raw_calories: &str, is_junk: bool) -> Result<Entry> {
        self.add_at(raw_calories, is_junk, Local::now())
    }

    /// Validate and append a new active entry stamped with `now`.
    ///
    /// On a validation error the store is left untouched and no id is used up.
    pub fn add_at(
        &mut self,
        raw_calories: &str,
        is_junk: bool,
        now: DateTime<Local>,
    ) -> Result<Entry> {
        let calories = parse_calories(raw_calories)?;
        let entry = Entry::create(self.ids.issue(), calories, is_junk, now);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Remove the entry with `id`, handing it back marked `deleted`.
    pub fn remove(&mut self, id: EntryId) -> Result<Entry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or(CalorieError::NotFound(id))?;
        let mut entry = self.entries.remove(idx);
        entry.mark(EntryStatus::Deleted)?;
        Ok(entry)
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn id_sequence(&self) -> IdSequence {
        self.ids
    }
}
