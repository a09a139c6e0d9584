use chrono::{DateTime, Local, NaiveDate};

use crate::error::Result;
use crate::models::{DailyTarget, Entry, EntryId, EntryStatus, SessionSnapshot};
use crate::store::{EntryStore, IdSequence};
use crate::summary::DailySummary;
use crate::sync::{MirrorSink, SyncClient};

/// Today's calorie log.
///
/// Every mutation runs to completion before returning: the store changes,
/// the summary is re-derived from the new contents, then the mirror is
/// notified. Mirror delivery is never waited on and never undoes a local
/// change.
pub struct Tracker<S> {
    day: NaiveDate,
    store: EntryStore,
    target: DailyTarget,
    sync: SyncClient<S>,
    summary: DailySummary,
}

impl<S: MirrorSink> Tracker<S> {
    pub fn from_snapshot(snapshot: SessionSnapshot, sink: S) -> Result<Self> {
        let store = restore_store(snapshot.entries, snapshot.next_id)?;
        let summary = DailySummary::derive(store.entries(), snapshot.target);
        Ok(Self {
            day: snapshot.day,
            store,
            target: snapshot.target,
            sync: SyncClient::new(sink),
            summary,
        })
    }

    /// Replace the local state with a freshly loaded `snapshot`, keeping the
    /// mirror. Used when another process may have changed the stored session
    /// since this tracker last saw it. Nothing is dispatched.
    ///
    /// On error the tracker is left unchanged.
    pub fn reload(&mut self, snapshot: SessionSnapshot) -> Result<()> {
        self.store = restore_store(snapshot.entries, snapshot.next_id)?;
        self.day = snapshot.day;
        self.target = snapshot.target;
        self.on_store_changed();
        Ok(())
    }

    pub fn submit(&mut self, raw_calories: &str, is_junk: bool) -> Result<Entry> {
        self.submit_at(raw_calories, is_junk, Local::now())
    }

    pub fn submit_at(
        &mut self,
        raw_calories: &str,
        is_junk: bool,
        now: DateTime<Local>,
    ) -> Result<Entry> {
        let entry = self.store.add_at(raw_calories, is_junk, now)?;
        self.on_store_changed();
        self.sync.notify_create(&entry, self.target);
        Ok(entry)
    }

    /// Remove an entry locally and tell the mirror it is deleted.
    ///
    /// An unknown id returns `NotFound` and dispatches nothing.
    pub fn delete(&mut self, id: EntryId) -> Result<Entry> {
        let entry = self.store.remove(id)?;
        self.on_store_changed();
        self.sync.notify_status_change(entry.id(), EntryStatus::Deleted);
        Ok(entry)
    }

    /// Empty today's log. Local only: the mirror keeps these rows as active.
    pub fn clear_today(&mut self) -> usize {
        let cleared = self.store.clear();
        self.on_store_changed();
        if cleared > 0 {
            tracing::info!(cleared, "cleared today's entries locally, mirror not updated");
        }
        cleared
    }

    pub fn set_target(&mut self, target: DailyTarget) {
        self.target = target;
        self.on_store_changed();
    }

    fn on_store_changed(&mut self) {
        self.summary = DailySummary::derive(self.store.entries(), self.target);
    }

    #[must_use]
    pub fn summary(&self) -> &DailySummary {
        &self.summary
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        self.store.entries()
    }

    #[must_use]
    pub fn target(&self) -> DailyTarget {
        self.target
    }

    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        self.sync.sink()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            day: self.day,
            target: self.target,
            entries: self.store.entries().to_vec(),
            next_id: self.store.id_sequence().peek(),
        }
    }
}

fn restore_store(entries: Vec<Entry>, next_id: u64) -> Result<EntryStore> {
    EntryStore::restore(entries, IdSequence::starting_at(next_id))
}
