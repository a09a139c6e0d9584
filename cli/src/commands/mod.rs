mod entry;
mod helpers;
mod shell;
mod status;
mod target;

use anyhow::Result;
use chrono::Local;

use calorez_core::db::SessionDb;
use calorez_core::service::Tracker;
use calorez_core::sync::MirrorSink;

pub(crate) use entry::{cmd_add, cmd_clear, cmd_delete};
pub(crate) use shell::cmd_shell;
pub(crate) use status::cmd_status;
pub(crate) use target::{cmd_target_presets, cmd_target_set, cmd_target_show};

/// Today's tracker as the CLI drives it: the mirror is chosen at startup.
pub(crate) type Session = Tracker<Box<dyn MirrorSink>>;

/// How a command ended when it did not hit an infrastructure error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Done,
    /// The input was refused (bad calories, unknown id, non-preset target).
    /// Nothing changed locally and nothing was sent to the mirror.
    Rejected,
}

/// Run a mutating command on the session as it is stored right now.
///
/// The database write lock is held from the reload until the save, so a
/// shell and a one-shot command sharing the file never overwrite each
/// other's entries or hand out the same id. A rejected command saves nothing.
pub(crate) fn with_latest<F>(session: &mut Session, db: &SessionDb, command: F) -> Result<Outcome>
where
    F: FnOnce(&mut Session) -> Result<Outcome>,
{
    let write = db.begin()?;
    session.reload(write.load(Local::now().date_naive())?)?;

    let outcome = command(session)?;
    if outcome == Outcome::Done {
        write.save(&session.snapshot())?;
        write.commit()?;
    }
    Ok(outcome)
}

/// Pick up changes other processes saved since the session was loaded.
pub(crate) fn refresh(session: &mut Session, db: &SessionDb) -> Result<()> {
    session.reload(db.load(Local::now().date_naive())?)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_session(db: &SessionDb) -> Session {
    use calorez_core::sync::DisabledSink;

    let snapshot = db.load(Local::now().date_naive()).unwrap();
    Tracker::from_snapshot(snapshot, Box::new(DisabledSink) as Box<dyn MirrorSink>).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_and_one_shot_share_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calorez.db");
        let shell_db = SessionDb::open(&path).unwrap();
        let mut shell = test_session(&shell_db);

        let outcome =
            with_latest(&mut shell, &shell_db, |s| cmd_add(s, "100", false, false)).unwrap();
        assert_eq!(outcome, Outcome::Done);

        // A separate `calorez add -j 700` while the shell stays open.
        {
            let db = SessionDb::open(&path).unwrap();
            let mut one_shot = test_session(&db);
            with_latest(&mut one_shot, &db, |s| cmd_add(s, "700", true, false)).unwrap();
        }

        with_latest(&mut shell, &shell_db, |s| cmd_add(s, "50", false, false)).unwrap();

        let stored = SessionDb::open(&path)
            .unwrap()
            .load(Local::now().date_naive())
            .unwrap();
        let calories: Vec<u32> = stored.entries.iter().map(|e| e.calories()).collect();
        assert_eq!(calories, vec![100, 700, 50]);
        assert_eq!(stored.entries.iter().filter(|e| e.is_junk()).count(), 1);

        let mut ids: Vec<_> = stored.entries.iter().map(|e| e.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_rejected_command_saves_nothing() {
        let db = SessionDb::open_in_memory().unwrap();
        let mut session = test_session(&db);
        with_latest(&mut session, &db, |s| cmd_add(s, "300", false, false)).unwrap();

        let outcome =
            with_latest(&mut session, &db, |s| cmd_add(s, "lots", false, false)).unwrap();
        assert_eq!(outcome, Outcome::Rejected);

        let stored = db.load(Local::now().date_naive()).unwrap();
        assert_eq!(stored.entries.len(), 1);
    }

    #[test]
    fn test_refresh_sees_outside_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calorez.db");
        let db = SessionDb::open(&path).unwrap();
        let mut session = test_session(&db);

        {
            let other_db = SessionDb::open(&path).unwrap();
            let mut other = test_session(&other_db);
            with_latest(&mut other, &other_db, |s| cmd_add(s, "420", false, false)).unwrap();
        }

        assert!(session.entries().is_empty());
        refresh(&mut session, &db).unwrap();
        assert_eq!(session.summary().total, 420);
    }
}
