use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CalorieError, Result};

/// Target presets offered to the user, in display order.
pub const TARGET_PRESETS: &[u32] = &[1500, 1750, 2000, 2250, 2500];

pub const DEFAULT_TARGET: u32 = 2000;

/// Format of `Entry::time`, e.g. "08:05".
pub const TIME_FORMAT: &str = "%H:%M";
/// Format of `Entry::date`, e.g. "3/14/2025".
pub const DATE_FORMAT: &str = "%-m/%-d/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = CalorieError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(EntryId)
            .map_err(|_| CalorieError::validation(format!("Invalid entry id '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Active,
    Deleted,
}

impl EntryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    /// Move along `active -> deleted`. Repeating the current status is a no-op;
    /// going back to `active` is refused.
    pub fn transition(self, to: EntryStatus) -> Result<EntryStatus> {
        match (self, to) {
            (Self::Deleted, Self::Active) => Err(CalorieError::validation(
                "A deleted entry cannot be made active again",
            )),
            (_, to) => Ok(to),
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = CalorieError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "deleted" => Ok(Self::Deleted),
            _ => Err(CalorieError::validation(format!(
                "Invalid status '{s}'. Must be one of: active, deleted"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Healthy,
    Junk,
}

impl Category {
    #[must_use]
    pub fn from_junk(is_junk: bool) -> Self {
        if is_junk { Self::Junk } else { Self::Healthy }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Junk => "Junk",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged calorie event.
///
/// Everything except `status` is fixed at creation; fields are private so the
/// only way to change an entry is through [`Entry::mark`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    id: EntryId,
    calories: u32,
    is_junk: bool,
    time: String,
    date: String,
    status: EntryStatus,
}

impl Entry {
    pub(crate) fn create(id: EntryId, calories: u32, is_junk: bool, now: DateTime<Local>) -> Self {
        Self {
            id,
            calories,
            is_junk,
            time: now.format(TIME_FORMAT).to_string(),
            date: now.format(DATE_FORMAT).to_string(),
            status: EntryStatus::Active,
        }
    }

    /// Rebuild an entry from stored fields. Used when restoring a session.
    #[must_use]
    pub fn from_parts(
        id: EntryId,
        calories: u32,
        is_junk: bool,
        time: String,
        date: String,
        status: EntryStatus,
    ) -> Self {
        Self {
            id,
            calories,
            is_junk,
            time,
            date,
            status,
        }
    }

    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    #[must_use]
    pub fn calories(&self) -> u32 {
        self.calories
    }

    #[must_use]
    pub fn is_junk(&self) -> bool {
        self.is_junk
    }

    #[must_use]
    pub fn category(&self) -> Category {
        Category::from_junk(self.is_junk)
    }

    #[must_use]
    pub fn time(&self) -> &str {
        &self.time
    }

    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    #[must_use]
    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn mark(&mut self, status: EntryStatus) -> Result<()> {
        self.status = self.status.transition(status)?;
        Ok(())
    }
}

/// The user's daily calorie ceiling. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DailyTarget(u32);

impl DailyTarget {
    pub fn new(calories: u32) -> Result<Self> {
        if calories == 0 {
            return Err(CalorieError::validation("Calorie target must be greater than 0"));
        }
        Ok(Self(calories))
    }

    /// Accept only one of [`TARGET_PRESETS`].
    pub fn preset(calories: u32) -> Result<Self> {
        if TARGET_PRESETS.contains(&calories) {
            Ok(Self(calories))
        } else {
            let presets: Vec<String> = TARGET_PRESETS.iter().map(ToString::to_string).collect();
            Err(CalorieError::validation(format!(
                "Invalid target {calories}. Choose one of: {}",
                presets.join(", ")
            )))
        }
    }

    #[must_use]
    pub fn calories(self) -> u32 {
        self.0
    }
}

impl Default for DailyTarget {
    fn default() -> Self {
        Self(DEFAULT_TARGET)
    }
}

impl TryFrom<u32> for DailyTarget {
    type Error = CalorieError;

    fn try_from(calories: u32) -> Result<Self> {
        Self::new(calories)
    }
}

impl From<DailyTarget> for u32 {
    fn from(target: DailyTarget) -> Self {
        target.0
    }
}

impl fmt::Display for DailyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to resume today's session in a later process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub day: NaiveDate,
    pub target: DailyTarget,
    pub entries: Vec<Entry>,
    pub next_id: u64,
}

/// Parse user calorie input: a whole, positive number.
pub fn parse_calories(raw: &str) -> Result<u32> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(CalorieError::validation("Calories must not be empty"));
    }
    let value: i64 = s.parse().map_err(|_| {
        CalorieError::validation(format!(
            "Invalid calories '{s}'. Use a whole number like '250'"
        ))
    })?;
    if value <= 0 {
        return Err(CalorieError::validation("Calories must be greater than 0"));
    }
    u32::try_from(value)
        .map_err(|_| CalorieError::validation(format!("Calories '{s}' is too large")))
}
