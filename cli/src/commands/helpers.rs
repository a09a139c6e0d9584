use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use calorez_core::error::CalorieError;
use calorez_core::models::Entry;

use super::Outcome;

const BAR_WIDTH: usize = 20;

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a refused input and turn it into [`Outcome::Rejected`].
pub(crate) fn reject(err: &CalorieError, json: bool) -> Outcome {
    let message = err.to_string();
    if json {
        println!("{}", json_error(&message));
    } else {
        eprintln!("{message}");
    }
    Outcome::Rejected
}

pub(crate) fn print_entries_table(entries: &[Entry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Category")]
        category: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id().to_string(),
            time: e.time().to_string(),
            calories: format!("{} kcal", e.calories()),
            category: e.category().to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Text progress bar, e.g. `[#####...............]  25%`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn progress_bar(percentage: f64, over_target: bool) -> String {
    let pct = percentage.clamp(0.0, 100.0);
    let filled = ((pct / 100.0) * BAR_WIDTH as f64).round() as usize;
    let fill = if over_target { '!' } else { '#' };
    let bar: String = std::iter::repeat_n(fill, filled)
        .chain(std::iter::repeat_n('.', BAR_WIDTH - filled))
        .collect();
    format!("[{bar}] {pct:>3.0}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error() {
        let s = json_error("Entry 4 not found");
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["error"], "Entry 4 not found");
    }

    #[test]
    fn test_progress_bar_empty_and_full() {
        assert_eq!(progress_bar(0.0, false), "[....................]   0%");
        assert_eq!(progress_bar(100.0, true), "[!!!!!!!!!!!!!!!!!!!!] 100%");
    }

    #[test]
    fn test_progress_bar_partial() {
        assert_eq!(progress_bar(25.0, false), "[#####...............]  25%");
    }

    #[test]
    fn test_progress_bar_clamps() {
        assert_eq!(progress_bar(150.0, true), progress_bar(100.0, true));
        assert_eq!(progress_bar(-3.0, false), progress_bar(0.0, false));
    }
}
