use anyhow::Result;
use std::io::{self, BufRead, Write};

use calorez_core::db::SessionDb;
use calorez_core::models::EntryId;

use super::entry::{cmd_add, cmd_clear, cmd_delete};
use super::status::cmd_status;
use super::target::{cmd_target_presets, cmd_target_set, cmd_target_show};
use super::{Outcome, Session, refresh, with_latest};

const HELP: &str = "\
Commands:
  <calories>              add an entry with the current category
  add <calories> [junk]   add an entry (category defaults to the current one)
  healthy | junk          choose the category for the next entry
  delete <id>             delete an entry
  clear                   clear today's entries (local only)
  target [<calories>]     show or choose the daily target
  presets                 list target presets
  status                  show today's log
  help                    show this help
  quit                    leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Empty,
    Add { calories: String, junk: Option<bool> },
    Category { junk: bool },
    Delete(EntryId),
    Clear,
    ShowTarget,
    SetTarget(u32),
    Presets,
    Status,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(ShellCommand::Empty);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (first.to_lowercase().as_str(), rest.as_slice()) {
        ("add" | "a", [calories]) => ShellCommand::Add {
            calories: (*calories).to_string(),
            junk: None,
        },
        ("add" | "a", [calories, category]) => ShellCommand::Add {
            calories: (*calories).to_string(),
            junk: Some(parse_category(category)?),
        },
        ("healthy" | "h", []) => ShellCommand::Category { junk: false },
        ("junk" | "j", []) => ShellCommand::Category { junk: true },
        ("delete" | "del" | "rm", [id]) => {
            ShellCommand::Delete(id.parse::<EntryId>().map_err(|e| e.to_string())?)
        }
        ("clear", []) => ShellCommand::Clear,
        ("target", []) => ShellCommand::ShowTarget,
        ("target", [value]) => ShellCommand::SetTarget(
            value
                .parse()
                .map_err(|_| format!("Invalid target '{value}'"))?,
        ),
        ("presets", []) => ShellCommand::Presets,
        ("status" | "ls", []) => ShellCommand::Status,
        ("help" | "?", []) => ShellCommand::Help,
        ("quit" | "exit" | "q", []) => ShellCommand::Quit,
        (_, []) if first.starts_with(|c: char| c.is_ascii_digit() || c == '-') => {
            ShellCommand::Add {
                calories: first.to_string(),
                junk: None,
            }
        }
        _ => return Err(format!("Unknown command '{}'. Type 'help'.", line.trim())),
    };
    Ok(command)
}

fn parse_category(word: &str) -> Result<bool, String> {
    match word.to_lowercase().as_str() {
        "junk" | "j" => Ok(true),
        "healthy" | "h" => Ok(false),
        _ => Err(format!("Invalid category '{word}'. Use healthy or junk")),
    }
}

fn category_name(junk: bool) -> &'static str {
    if junk { "junk" } else { "healthy" }
}

/// Interactive session. Every change is reloaded and saved under the
/// database lock, so a killed shell loses nothing that was already on screen
/// and commands run from another terminal meanwhile are kept.
pub(crate) fn cmd_shell(
    session: &mut Session,
    db: &SessionDb,
    input: &mut impl BufRead,
) -> Result<()> {
    let mut junk = false;
    let mut raw = Vec::new();

    eprintln!("calorez shell. Type 'help' for commands.");
    loop {
        eprint!("[{}]> ", category_name(junk));
        io::stderr().flush()?;

        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        // Stray bytes from a paste or a mismatched terminal end up as an
        // unknown command instead of ending the session.
        let line = String::from_utf8_lossy(&raw);

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Quit => break,
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Category { junk: next } => junk = next,
            ShellCommand::Add {
                calories,
                junk: category,
            } => {
                let is_junk = category.unwrap_or(junk);
                let outcome = with_latest(session, db, |s| cmd_add(s, &calories, is_junk, false))?;
                if outcome == Outcome::Done {
                    junk = false;
                }
            }
            ShellCommand::Delete(id) => {
                with_latest(session, db, |s| cmd_delete(s, id, false))?;
            }
            ShellCommand::Clear => {
                with_latest(session, db, |s| cmd_clear(s, false))?;
            }
            ShellCommand::SetTarget(value) => {
                with_latest(session, db, |s| cmd_target_set(s, value, false))?;
            }
            ShellCommand::ShowTarget => {
                refresh(session, db)?;
                cmd_target_show(session, false)?;
            }
            ShellCommand::Presets => {
                refresh(session, db)?;
                cmd_target_presets(session, false)?;
            }
            ShellCommand::Status => {
                refresh(session, db)?;
                cmd_status(session, false)?;
            }
        }
    }

    Ok(())
}
