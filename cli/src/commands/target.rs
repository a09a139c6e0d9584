use anyhow::Result;
use serde::Serialize;

use calorez_core::models::{DailyTarget, TARGET_PRESETS};

use super::helpers::reject;
use super::{Outcome, Session};

#[derive(Serialize)]
struct TargetView {
    target: DailyTarget,
    remaining: i64,
    over_target: bool,
}

fn target_view(session: &Session) -> TargetView {
    let summary = session.summary();
    TargetView {
        target: session.target(),
        remaining: summary.remaining,
        over_target: summary.over_target,
    }
}

pub(crate) fn cmd_target_set(session: &mut Session, calories: u32, json: bool) -> Result<Outcome> {
    let target = match DailyTarget::preset(calories) {
        Ok(target) => target,
        Err(err) => return Ok(reject(&err, json)),
    };
    session.set_target(target);

    if json {
        println!("{}", serde_json::to_string_pretty(&target_view(session))?);
    } else {
        let remaining = session.summary().remaining_label();
        println!("Target: {target} kcal/day ({remaining})");
    }

    Ok(Outcome::Done)
}

pub(crate) fn cmd_target_show(session: &Session, json: bool) -> Result<Outcome> {
    if json {
        println!("{}", serde_json::to_string_pretty(&target_view(session))?);
    } else {
        let target = session.target();
        println!("Target: {target} kcal/day");
    }
    Ok(Outcome::Done)
}

pub(crate) fn cmd_target_presets(session: &Session, json: bool) -> Result<Outcome> {
    if json {
        println!("{}", serde_json::to_string(TARGET_PRESETS)?);
        return Ok(Outcome::Done);
    }

    let current = session.target().calories();
    for &value in TARGET_PRESETS {
        let marker = if value == current { "*" } else { " " };
        println!("{marker} {value} kcal");
    }
    Ok(Outcome::Done)
}
