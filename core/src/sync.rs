//! One-way mirroring of local changes to a remote log.
//!
//! Notifications are handed to a [`MirrorSink`] and forgotten. A sink never
//! reports back, so the caller cannot wait on delivery or react to a
//! failure. A lost notification is accepted; there is no queue and no retry.

use std::sync::Mutex;

use crate::models::{DailyTarget, Entry, EntryId, EntryStatus};

pub const ACTION_ADD: &str = "add";
pub const ACTION_UPDATE_STATUS: &str = "updateStatus";

/// A single self-contained notification for the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    Add {
        id: EntryId,
        date: String,
        time: String,
        calories: u32,
        category: &'static str,
        target: u32,
        status: EntryStatus,
    },
    UpdateStatus {
        id: EntryId,
        status: EntryStatus,
    },
}

impl SyncRequest {
    #[must_use]
    pub fn add(entry: &Entry, target: DailyTarget) -> Self {
        Self::Add {
            id: entry.id(),
            date: entry.date().to_string(),
            time: entry.time().to_string(),
            calories: entry.calories(),
            category: entry.category().as_str(),
            target: target.calories(),
            status: entry.status(),
        }
    }

    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Add { .. } => ACTION_ADD,
            Self::UpdateStatus { .. } => ACTION_UPDATE_STATUS,
        }
    }

    #[must_use]
    pub fn entry_id(&self) -> EntryId {
        match self {
            Self::Add { id, .. } | Self::UpdateStatus { id, .. } => *id,
        }
    }

    /// Query parameters in the order the mirror endpoint lists them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Add {
                id,
                date,
                time,
                calories,
                category,
                target,
                status,
            } => vec![
                ("action", ACTION_ADD.to_string()),
                ("id", id.to_string()),
                ("date", date.clone()),
                ("time", time.clone()),
                ("calories", calories.to_string()),
                ("category", (*category).to_string()),
                ("target", target.to_string()),
                ("status", status.to_string()),
            ],
            Self::UpdateStatus { id, status } => vec![
                ("action", ACTION_UPDATE_STATUS.to_string()),
                ("id", id.to_string()),
                ("status", status.to_string()),
            ],
        }
    }
}

/// Where notifications go.
///
/// The CLI implements this with reqwest on a background task. `dispatch`
/// must return without waiting on the network and must swallow its own
/// failures.
pub trait MirrorSink: Send + Sync {
    fn dispatch(&self, request: SyncRequest);
}

impl<S: MirrorSink + ?Sized> MirrorSink for std::sync::Arc<S> {
    fn dispatch(&self, request: SyncRequest) {
        (**self).dispatch(request);
    }
}

impl<S: MirrorSink + ?Sized> MirrorSink for Box<S> {
    fn dispatch(&self, request: SyncRequest) {
        (**self).dispatch(request);
    }
}

/// Sink used when no mirror endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSink;

impl MirrorSink for DisabledSink {
    fn dispatch(&self, request: SyncRequest) {
        tracing::debug!(
            action = request.action(),
            id = %request.entry_id(),
            "mirror disabled, dropping notification"
        );
    }
}

/// Keeps every dispatched request in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SyncRequest>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<SyncRequest> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl MirrorSink for RecordingSink {
    fn dispatch(&self, request: SyncRequest) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request);
        }
    }
}

/// Turns store mutations into mirror notifications.
#[derive(Debug)]
pub struct SyncClient<S> {
    sink: S,
}

impl<S: MirrorSink> SyncClient<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn notify_create(&self, entry: &Entry, target: DailyTarget) {
        tracing::debug!(id = %entry.id(), calories = entry.calories(), "mirroring new entry");
        self.sink.dispatch(SyncRequest::add(entry, target));
    }

    pub fn notify_status_change(&self, id: EntryId, status: EntryStatus) {
        tracing::debug!(%id, %status, "mirroring status change");
        self.sink.dispatch(SyncRequest::UpdateStatus { id, status });
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntryStore, IdSequence};
    use chrono::{Local, TimeZone};

    fn sample_entry(is_junk: bool) -> Entry {
        let mut store = EntryStore::new(IdSequence::starting_at(1_700_000_000_000));
        let now = Local.with_ymd_and_hms(2025, 1, 15, 12, 30, 0).unwrap();
        store.add_at("450", is_junk, now).unwrap()
    }

    #[test]
    fn test_add_query_pairs() {
        let entry = sample_entry(true);
        let req = SyncRequest::add(&entry, DailyTarget::default());
        let pairs = req.query_pairs();

        let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            ["action", "id", "date", "time", "calories", "category", "target", "status"]
        );
        assert_eq!(pairs[0].1, "add");
        assert_eq!(pairs[1].1, "1700000000000");
        assert_eq!(pairs[2].1, "1/15/2025");
        assert_eq!(pairs[3].1, "12:30");
        assert_eq!(pairs[4].1, "450");
        assert_eq!(pairs[5].1, "Junk");
        assert_eq!(pairs[6].1, "2000");
        assert_eq!(pairs[7].1, "active");
    }

    #[test]
    fn test_healthy_category() {
        let entry = sample_entry(false);
        let req = SyncRequest::add(&entry, DailyTarget::default());
        assert!(req.query_pairs().contains(&("category", "Healthy".to_string())));
    }

    #[test]
    fn test_update_status_query_pairs() {
        let req = SyncRequest::UpdateStatus {
            id: EntryId(42),
            status: EntryStatus::Deleted,
        };
        assert_eq!(req.action(), "updateStatus");
        assert_eq!(req.entry_id(), EntryId(42));
        assert_eq!(
            req.query_pairs(),
            vec![
                ("action", "updateStatus".to_string()),
                ("id", "42".to_string()),
                ("status", "deleted".to_string()),
            ]
        );
    }

    #[test]
    fn test_client_dispatches_once_per_call() {
        let client = SyncClient::new(RecordingSink::new());
        let entry = sample_entry(false);
        client.notify_create(&entry, DailyTarget::preset(1750).unwrap());
        client.notify_status_change(entry.id(), EntryStatus::Deleted);

        let sent = client.sink().sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].action(), "add");
        assert_eq!(sent[1].action(), "updateStatus");
        assert_eq!(sent[1].entry_id(), entry.id());
    }

    #[test]
    fn test_disabled_sink_accepts_anything() {
        let client = SyncClient::new(DisabledSink);
        client.notify_status_change(EntryId(1), EntryStatus::Deleted);
    }
}
