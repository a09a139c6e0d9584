use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};

use crate::models::{DailyTarget, Entry, EntryId, EntryStatus, SessionSnapshot};
use crate::store::IdSequence;

const DAY_FORMAT: &str = "%Y-%m-%d";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where today's session lives between CLI invocations.
///
/// Holds a single session row plus its active entries. Loading a session
/// from an earlier day drops its entries.
///
/// Several processes may share one file (an open `shell` next to one-shot
/// commands). A mutation must go through [`SessionDb::begin`] so that it
/// reloads, changes and writes back the session under SQLite's write lock.
pub struct SessionDb {
    conn: Connection,
}

/// One locked read-modify-write of the session.
///
/// Dropping it without [`SessionWrite::commit`] rolls everything back.
pub struct SessionWrite<'db> {
    tx: Transaction<'db>,
}

impl SessionDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = SessionDb { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = SessionDb { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS session (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    day TEXT NOT NULL,
                    target INTEGER NOT NULL CHECK (target > 0),
                    next_id INTEGER NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS entries (
                    id INTEGER PRIMARY KEY,
                    position INTEGER NOT NULL,
                    calories INTEGER NOT NULL CHECK (calories > 0),
                    is_junk INTEGER NOT NULL,
                    time TEXT NOT NULL,
                    date TEXT NOT NULL,
                    status TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_entries_position ON entries(position);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Load the session for `today`, starting a fresh one when none is stored
    /// or the stored one is from another day. The last target carries over.
    pub fn load(&self, today: NaiveDate) -> Result<SessionSnapshot> {
        load_snapshot(&self.conn, today)
    }

    /// Replace the stored session with `snapshot`.
    ///
    /// Only safe when nothing else writes to the file; concurrent writers
    /// should use [`SessionDb::begin`] instead.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let write = self.begin()?;
        write.save(snapshot)?;
        write.commit()
    }

    /// Take the write lock (`BEGIN IMMEDIATE`) for a read-modify-write.
    ///
    /// Other connections wait up to the busy timeout for the lock, so two
    /// writers never start from the same stored session.
    pub fn begin(&self) -> Result<SessionWrite<'_>> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .context("Failed to lock the session database")?;
        Ok(SessionWrite { tx })
    }
}

impl SessionWrite<'_> {
    /// Load the session as stored right now, under the lock.
    pub fn load(&self, today: NaiveDate) -> Result<SessionSnapshot> {
        load_snapshot(&self.tx, today)
    }

    /// Stage `snapshot` as the stored session. Nothing is visible to other
    /// connections until [`SessionWrite::commit`].
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        write_snapshot(&self.tx, snapshot)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("Failed to save the session")
    }
}

fn load_snapshot(conn: &Connection, today: NaiveDate) -> Result<SessionSnapshot> {
    let stored: Option<(String, i64, i64)> = conn
        .query_row(
            "SELECT day, target, next_id FROM session WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let clock_next = IdSequence::from_clock().peek();

    let Some((day, target, next_id)) = stored else {
        return Ok(SessionSnapshot {
            day: today,
            target: DailyTarget::default(),
            entries: Vec::new(),
            next_id: clock_next,
        });
    };

    let day = NaiveDate::parse_from_str(&day, DAY_FORMAT)
        .with_context(|| format!("Invalid session day '{day}' in database"))?;
    let target = u32::try_from(target)
        .ok()
        .and_then(|t| DailyTarget::new(t).ok())
        .with_context(|| format!("Invalid target {target} in database"))?;
    let next_id = u64::try_from(next_id).unwrap_or(0).max(clock_next);

    if day != today {
        tracing::info!(%day, %today, "starting a new day, previous entries dropped");
        return Ok(SessionSnapshot {
            day: today,
            target,
            entries: Vec::new(),
            next_id,
        });
    }

    Ok(SessionSnapshot {
        day,
        target,
        entries: load_entries(conn)?,
        next_id,
    })
}

fn load_entries(conn: &Connection) -> Result<Vec<Entry>> {
    let mut stmt = conn.prepare(
        "SELECT id, calories, is_junk, time, date, status FROM entries ORDER BY position",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, bool>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, calories, is_junk, time, date, status) = row?;
        let id = u64::try_from(id).with_context(|| format!("Invalid entry id {id}"))?;
        let calories = u32::try_from(calories)
            .with_context(|| format!("Invalid calories {calories} for entry {id}"))?;
        let status: EntryStatus = status.parse()?;
        entries.push(Entry::from_parts(
            EntryId(id),
            calories,
            is_junk,
            time,
            date,
            status,
        ));
    }
    Ok(entries)
}

fn write_snapshot(conn: &Connection, snapshot: &SessionSnapshot) -> Result<()> {
    let now = Local::now().to_rfc3339();
    let next_id = i64::try_from(snapshot.next_id).context("Entry id space exhausted")?;

    conn.execute(
        "INSERT INTO session (id, day, target, next_id, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            day = excluded.day,
            target = excluded.target,
            next_id = MAX(session.next_id, excluded.next_id),
            updated_at = excluded.updated_at",
        params![
            snapshot.day.format(DAY_FORMAT).to_string(),
            snapshot.target.calories(),
            next_id,
            now
        ],
    )?;

    conn.execute("DELETE FROM entries", [])?;
    let mut stmt = conn.prepare(
        "INSERT INTO entries (id, position, calories, is_junk, time, date, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (position, entry) in snapshot.entries.iter().enumerate() {
        let id = i64::try_from(entry.id().0).context("Entry id space exhausted")?;
        let position = i64::try_from(position)?;
        stmt.execute(params![
            id,
            position,
            entry.calories(),
            entry.is_junk(),
            entry.time(),
            entry.date(),
            entry.status().as_str(),
        ])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Tracker;
    use crate::sync::DisabledSink;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_load_empty_database() {
        let db = SessionDb::open_in_memory().unwrap();
        let snap = db.load(day(2025, 2, 1)).unwrap();
        assert_eq!(snap.day, day(2025, 2, 1));
        assert!(snap.entries.is_empty());
        assert_eq!(snap.target, DailyTarget::default());
        assert!(snap.next_id > 0);
    }

    #[test]
    fn test_save_and_load_same_day() {
        let db = SessionDb::open_in_memory().unwrap();
        let today = day(2025, 2, 1);

        let mut snap = db.load(today).unwrap();
        snap.target = DailyTarget::preset(1750).unwrap();
        let mut tracker = Tracker::from_snapshot(snap, DisabledSink).unwrap();
        let a = tracker.submit("400", false).unwrap();
        let b = tracker.submit("250", true).unwrap();
        db.save(&tracker.snapshot()).unwrap();

        let loaded = db.load(today).unwrap();
        assert_eq!(loaded.target.calories(), 1750);
        assert_eq!(loaded.entries, vec![a, b]);
        assert!(loaded.next_id >= tracker.snapshot().next_id);
    }

    #[test]
    fn test_new_day_drops_entries_keeps_target() {
        let db = SessionDb::open_in_memory().unwrap();
        let yesterday = day(2025, 2, 1);

        let mut snap = db.load(yesterday).unwrap();
        snap.target = DailyTarget::preset(2500).unwrap();
        let mut tracker = Tracker::from_snapshot(snap, DisabledSink).unwrap();
        let old = tracker.submit("900", true).unwrap();
        db.save(&tracker.snapshot()).unwrap();

        let loaded = db.load(day(2025, 2, 2)).unwrap();
        assert_eq!(loaded.day, day(2025, 2, 2));
        assert!(loaded.entries.is_empty());
        assert_eq!(loaded.target.calories(), 2500);
        assert!(loaded.next_id > old.id().0);
    }

    #[test]
    fn test_save_replaces_removed_entries() {
        let db = SessionDb::open_in_memory().unwrap();
        let today = day(2025, 2, 1);

        let mut tracker = Tracker::from_snapshot(db.load(today).unwrap(), DisabledSink).unwrap();
        let a = tracker.submit("100", false).unwrap();
        tracker.submit("200", false).unwrap();
        db.save(&tracker.snapshot()).unwrap();

        tracker.delete(a.id()).unwrap();
        db.save(&tracker.snapshot()).unwrap();

        let loaded = db.load(today).unwrap();
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries[0].calories(), 200);

        tracker.clear_today();
        db.save(&tracker.snapshot()).unwrap();
        assert!(db.load(today).unwrap().entries.is_empty());
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calorez.db");
        let today = day(2025, 2, 1);

        {
            let db = SessionDb::open(&path).unwrap();
            let mut tracker =
                Tracker::from_snapshot(db.load(today).unwrap(), DisabledSink).unwrap();
            tracker.submit("321", false).unwrap();
            db.save(&tracker.snapshot()).unwrap();
        }

        let db = SessionDb::open(&path).unwrap();
        let loaded = db.load(today).unwrap();
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries[0].calories(), 321);
    }

    /// One locked reload-change-save, the way every CLI mutation runs.
    fn add_locked(
        db: &SessionDb,
        tracker: &mut Tracker<DisabledSink>,
        today: NaiveDate,
        raw: &str,
        junk: bool,
    ) -> Entry {
        let write = db.begin().unwrap();
        tracker.reload(write.load(today).unwrap()).unwrap();
        let entry = tracker.submit(raw, junk).unwrap();
        write.save(&tracker.snapshot()).unwrap();
        write.commit().unwrap();
        entry
    }

    #[test]
    fn test_two_handles_keep_each_others_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calorez.db");
        let today = day(2025, 2, 1);

        // A long-lived shell and a one-shot command, both opened before
        // either writes, so both start from the same clock-seeded next_id.
        let shell_db = SessionDb::open(&path).unwrap();
        let one_shot_db = SessionDb::open(&path).unwrap();
        let mut shell =
            Tracker::from_snapshot(shell_db.load(today).unwrap(), DisabledSink).unwrap();
        let mut one_shot =
            Tracker::from_snapshot(one_shot_db.load(today).unwrap(), DisabledSink).unwrap();

        let a = add_locked(&shell_db, &mut shell, today, "100", false);
        let b = add_locked(&one_shot_db, &mut one_shot, today, "700", true);
        let c = add_locked(&shell_db, &mut shell, today, "50", false);

        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), c.id());
        assert_ne!(a.id(), c.id());

        let stored = SessionDb::open(&path).unwrap().load(today).unwrap();
        assert_eq!(stored.entries, vec![a, b.clone(), c]);
        assert_eq!(shell.summary().total, 850);
        assert!(shell.entries().contains(&b));
    }

    #[test]
    fn test_locked_delete_keeps_other_handles_add() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calorez.db");
        let today = day(2025, 2, 1);

        let first_db = SessionDb::open(&path).unwrap();
        let second_db = SessionDb::open(&path).unwrap();
        let mut first =
            Tracker::from_snapshot(first_db.load(today).unwrap(), DisabledSink).unwrap();
        let mut second =
            Tracker::from_snapshot(second_db.load(today).unwrap(), DisabledSink).unwrap();

        let doomed = add_locked(&first_db, &mut first, today, "300", false);
        let kept = add_locked(&second_db, &mut second, today, "700", true);

        let write = first_db.begin().unwrap();
        first.reload(write.load(today).unwrap()).unwrap();
        first.delete(doomed.id()).unwrap();
        write.save(&first.snapshot()).unwrap();
        write.commit().unwrap();

        let stored = second_db.load(today).unwrap();
        assert_eq!(stored.entries, vec![kept]);
    }

    #[test]
    fn test_uncommitted_write_rolls_back() {
        let db = SessionDb::open_in_memory().unwrap();
        let today = day(2025, 2, 1);
        let mut tracker = Tracker::from_snapshot(db.load(today).unwrap(), DisabledSink).unwrap();

        {
            let write = db.begin().unwrap();
            tracker.submit("400", false).unwrap();
            write.save(&tracker.snapshot()).unwrap();
        }

        assert!(db.load(today).unwrap().entries.is_empty());
    }

    #[test]
    fn test_stored_next_id_never_moves_back() {
        let db = SessionDb::open_in_memory().unwrap();
        let today = day(2025, 2, 1);

        let mut snap = db.load(today).unwrap();
        let stale = snap.clone();
        snap.next_id += 1000;
        db.save(&snap).unwrap();
        db.save(&stale).unwrap();

        assert!(db.load(today).unwrap().next_id >= snap.next_id);
    }
}
