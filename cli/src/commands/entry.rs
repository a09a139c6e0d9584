use anyhow::Result;
use serde::Serialize;

use calorez_core::models::{Entry, EntryId};
use calorez_core::summary::DailySummary;

use super::helpers::reject;
use super::{Outcome, Session};

#[derive(Serialize)]
struct EntryChange<'a> {
    entry: &'a Entry,
    summary: &'a DailySummary,
}

pub(crate) fn cmd_add(
    session: &mut Session,
    calories: &str,
    junk: bool,
    json: bool,
) -> Result<Outcome> {
    let entry = match session.submit(calories, junk) {
        Ok(entry) => entry,
        Err(err) => return Ok(reject(&err, json)),
    };
    let summary = session.summary();

    if json {
        let change = EntryChange {
            entry: &entry,
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&change)?);
    } else {
        let id = entry.id();
        let cal = entry.calories();
        let category = entry.category();
        let time = entry.time();
        println!("Added [{id}] {cal} kcal ({category}) at {time}");
        let total = summary.total;
        let target = summary.target;
        let remaining = summary.remaining_label();
        println!("Today: {total} / {target} kcal, {remaining}");
    }

    Ok(Outcome::Done)
}

pub(crate) fn cmd_delete(session: &mut Session, id: EntryId, json: bool) -> Result<Outcome> {
    let entry = match session.delete(id) {
        Ok(entry) => entry,
        Err(err) => return Ok(reject(&err, json)),
    };

    if json {
        let change = EntryChange {
            entry: &entry,
            summary: session.summary(),
        };
        println!("{}", serde_json::to_string_pretty(&change)?);
    } else {
        let cal = entry.calories();
        let total = session.summary().total;
        println!("Deleted entry {id} ({cal} kcal). Today: {total} kcal");
    }

    Ok(Outcome::Done)
}

/// Clearing never reaches the mirror, so JSON callers are told as much.
fn clear_json(cleared: usize) -> serde_json::Value {
    serde_json::json!({ "cleared": cleared, "mirror_updated": false })
}

pub(crate) fn cmd_clear(session: &mut Session, json: bool) -> Result<Outcome> {
    let cleared = session.clear_today();

    if json {
        println!("{}", clear_json(cleared));
    } else if cleared == 0 {
        eprintln!("Nothing to clear");
    } else {
        let noun = if cleared == 1 { "entry" } else { "entries" };
        println!("Cleared {cleared} {noun}");
        eprintln!("Note: clearing is local only; the mirror still lists these entries as active.");
    }

    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_session;
    use calorez_core::db::SessionDb;

    #[test]
    fn test_clear_json_reports_mirror_untouched() {
        let value = clear_json(3);
        assert_eq!(value["cleared"], 3);
        assert_eq!(value["mirror_updated"], false);
    }

    #[test]
    fn test_clear_empties_session() {
        let db = SessionDb::open_in_memory().unwrap();
        let mut session = test_session(&db);
        cmd_add(&mut session, "200", false, true).unwrap();
        cmd_add(&mut session, "300", true, true).unwrap();

        assert_eq!(cmd_clear(&mut session, true).unwrap(), Outcome::Done);
        assert!(session.entries().is_empty());
        assert_eq!(session.summary().total, 0);
    }

    #[test]
    fn test_delete_unknown_id_is_rejected() {
        let db = SessionDb::open_in_memory().unwrap();
        let mut session = test_session(&db);
        assert_eq!(
            cmd_delete(&mut session, EntryId(1), true).unwrap(),
            Outcome::Rejected
        );
    }
}
