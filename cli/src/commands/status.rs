use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use calorez_core::models::Entry;
use calorez_core::summary::DailySummary;

use super::helpers::{print_entries_table, progress_bar};
use super::{Outcome, Session};

#[derive(Serialize)]
struct StatusView<'a> {
    day: NaiveDate,
    entries: &'a [Entry],
    summary: &'a DailySummary,
}

pub(crate) fn cmd_status(session: &Session, json: bool) -> Result<Outcome> {
    let summary = session.summary();

    if json {
        let view = StatusView {
            day: session.day(),
            entries: session.entries(),
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(Outcome::Done);
    }

    let day = session.day();
    let total = summary.total;
    let target = summary.target;
    println!("=== {day} ===\n");
    println!("  {total} calories today (target {target})");
    println!(
        "  {}",
        progress_bar(summary.progress_percentage, summary.over_target)
    );
    println!(
        "  {}  |  {}\n",
        summary.remaining_label(),
        summary.junk_label()
    );

    if session.entries().is_empty() {
        eprintln!("No entries yet");
        eprintln!("Start logging with `calorez add <calories>`");
    } else {
        print_entries_table(session.entries());
    }

    Ok(Outcome::Done)
}
