//! Week classification for recurring and one-off tasks
//!
//! Given a task's recurrence, its last completion and a target week, decide
//! whether the task must happen that week, may happen, or cannot happen, and
//! list the concrete dates it is expected on.
//!
//! Everything here is pure: "today" is always passed in.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::recurrence::{Recurrence, RecurrenceMode};

// ---------------------------------------------------------------------------
/// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Allowed window and week nest inside one another
    Must,
    /// Allowed window straddles a week boundary
    DoIfPossible,
    /// No overlap at all
    Skip,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Must => "must",
            Self::DoIfPossible => "do_if_possible",
            Self::Skip => "skip",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `date` shifted by `days`, pinned to the calendar bounds instead of
/// overflowing. Far-off windows then classify as `skip`.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

// ---------------------------------------------------------------------------
/// Week Range
// ---------------------------------------------------------------------------

/// Closed date interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TrackerError> {
        if end < start {
            return Err(TrackerError::InvalidOperation(format!(
                "week_end {} is before week_start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// The next week starting on `start_day` (today counts), seven days long
    pub fn upcoming(today: NaiveDate, start_day: Weekday) -> Self {
        let offset = (start_day.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        let start = add_days(today, offset);
        Self {
            start,
            end: add_days(start, 6),
        }
    }

    /// Fill in whichever bound the caller left out. A missing end is six
    /// days after the start.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        start_day: Weekday,
    ) -> Result<Self, TrackerError> {
        let start = start.unwrap_or_else(|| Self::upcoming(today, start_day).start);
        let end = end.unwrap_or_else(|| add_days(start, 6));
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
/// Allowed Window
// ---------------------------------------------------------------------------

/// Absolute dates a task may next occur on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedWindow {
    pub base: NaiveDate,
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl AllowedWindow {
    pub fn compute(
        recurrence: &Recurrence,
        last_completed_on: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let base = match recurrence.mode {
            RecurrenceMode::Repeat => last_completed_on.unwrap_or(today),
            // One-off tasks are never re-anchored by history
            RecurrenceMode::OneTime => today,
        };
        Self {
            base,
            earliest: add_days(base, recurrence.start_after_days()),
            latest: add_days(base, recurrence.end_before_days()),
        }
    }

    pub fn classify(&self, week: &WeekRange) -> Classification {
        if week.end < self.earliest || week.start > self.latest {
            return Classification::Skip;
        }
        let week_inside = week.start >= self.earliest && week.end <= self.latest;
        let window_inside = self.earliest >= week.start && self.latest <= week.end;
        if week_inside || window_inside {
            Classification::Must
        } else {
            Classification::DoIfPossible
        }
    }
}

// ---------------------------------------------------------------------------
/// Week Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekClassification {
    pub classification: Classification,
    pub window: AllowedWindow,
    pub expected_dates: Vec<NaiveDate>,
}

/// Classify one task against one week
pub fn classify_week(
    recurrence: &Recurrence,
    last_completed_on: Option<NaiveDate>,
    week: &WeekRange,
    today: NaiveDate,
) -> WeekClassification {
    let window = AllowedWindow::compute(recurrence, last_completed_on, today);
    WeekClassification {
        classification: window.classify(week),
        expected_dates: expected_dates(recurrence, &window, week),
        window,
    }
}

/// Dates inside the week the task is expected on.
///
/// Repeat tasks chain forward from the earliest date in steps of
/// `max(1, start_after_days)`. One-off tasks land once, on the first day
/// that is both allowed and inside the week.
pub fn expected_dates(
    recurrence: &Recurrence,
    window: &AllowedWindow,
    week: &WeekRange,
) -> Vec<NaiveDate> {
    match recurrence.mode {
        RecurrenceMode::Repeat => {
            let step = recurrence.start_after_days().max(1);
            let mut cursor = window.earliest;
            if cursor < week.start {
                // jump to the first step on or after week.start
                let gap = (week.start - cursor).num_days();
                let steps = gap.saturating_add(step - 1) / step;
                cursor = add_days(cursor, steps.saturating_mul(step));
            }
            let mut dates = Vec::new();
            while week.contains(cursor) {
                dates.push(cursor);
                let next = add_days(cursor, step);
                if next == cursor {
                    break;
                }
                cursor = next;
            }
            dates
        }
        RecurrenceMode::OneTime => {
            let candidate = window.earliest.max(week.start);
            if week.contains(candidate) && candidate <= window.latest {
                vec![candidate]
            } else {
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
