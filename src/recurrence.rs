//! Recurrence rules for task templates
//!
//! A stored recurrence is loose JSON written by several generations of
//! clients. This module turns it into a canonical `(mode, window)` pair:
//!
//! - `{"mode": "repeat" | "one_time", "config": {"start_after_days", "end_before_days"}}`
//! - legacy `{"mode": "gap", "min_days", "max_days"}` (keys may also live in `config`)
//! - legacy metadata keys `frequency_min_days` / `frequency_max_days`
//!
//! Parsing never fails. Anything unreadable degrades to a zero-width window
//! at day 0 in `repeat` mode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
/// Recurrence Mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceMode {
    /// Anchored to the last completion, chains forward
    #[default]
    Repeat,
    /// Anchored to today, happens once
    OneTime,
}

impl RecurrenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repeat => "repeat",
            Self::OneTime => "one_time",
        }
    }
}

impl std::fmt::Display for RecurrenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the window came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceSource {
    /// Explicit `start_after_days` / `end_before_days`
    Offsets,
    /// Translated from `gap` mode or `frequency_min/max_days`
    LegacyGap,
    /// Nothing usable was stored
    Default,
}

// ---------------------------------------------------------------------------
/// Recurrence Window
// ---------------------------------------------------------------------------

/// Day offsets relative to an anchor date. Always `0 <= start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecurrenceWindow {
    pub start_after_days: i64,
    pub end_before_days: i64,
}

impl RecurrenceWindow {
    /// Clamp negatives to zero and raise `end` up to `start`
    pub fn new(start_after_days: i64, end_before_days: i64) -> Self {
        let start = start_after_days.max(0);
        let end = end_before_days.max(0).max(start);
        Self {
            start_after_days: start,
            end_before_days: end,
        }
    }
}

// ---------------------------------------------------------------------------
/// Recurrence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub mode: RecurrenceMode,
    pub window: RecurrenceWindow,
    pub source: RecurrenceSource,
}

impl Default for Recurrence {
    fn default() -> Self {
        Self {
            mode: RecurrenceMode::Repeat,
            window: RecurrenceWindow::default(),
            source: RecurrenceSource::Default,
        }
    }
}

impl Recurrence {
    pub fn repeat(start_after_days: i64, end_before_days: i64) -> Self {
        Self {
            mode: RecurrenceMode::Repeat,
            window: RecurrenceWindow::new(start_after_days, end_before_days),
            source: RecurrenceSource::Offsets,
        }
    }

    pub fn one_time(start_after_days: i64, end_before_days: i64) -> Self {
        Self {
            mode: RecurrenceMode::OneTime,
            window: RecurrenceWindow::new(start_after_days, end_before_days),
            source: RecurrenceSource::Offsets,
        }
    }

    pub fn start_after_days(&self) -> i64 {
        self.window.start_after_days
    }

    pub fn end_before_days(&self) -> i64 {
        self.window.end_before_days
    }

    pub fn is_legacy(&self) -> bool {
        self.source == RecurrenceSource::LegacyGap
    }

    /// Extract a canonical recurrence from the stored recurrence value,
    /// consulting task metadata only for the legacy frequency keys.
    ///
    /// An explicit offset config always wins over legacy encodings.
    pub fn from_task_json(recurrence: &Value, metadata: &Value) -> Self {
        let config = recurrence.get("config").unwrap_or(&Value::Null);
        let mode_str = recurrence
            .get("mode")
            .and_then(Value::as_str)
            .map(|m| m.trim().to_lowercase())
            .unwrap_or_default();

        let mode = match mode_str.as_str() {
            "one_time" => RecurrenceMode::OneTime,
            _ => RecurrenceMode::Repeat,
        };

        // Explicit offsets
        if let Some(start) = read_days(config, "start_after_days") {
            let end = read_days(config, "end_before_days")
                .filter(|&e| e != 0)
                .unwrap_or(start);
            return Self {
                mode,
                window: RecurrenceWindow::new(start, end),
                source: RecurrenceSource::Offsets,
            };
        }
        if let Some(end) = read_days(config, "end_before_days") {
            return Self {
                mode,
                window: RecurrenceWindow::new(0, end),
                source: RecurrenceSource::Offsets,
            };
        }

        // Legacy gap mode: bounds on the recurrence itself or inside config
        if mode_str == "gap" {
            let min = read_days(recurrence, "min_days").or_else(|| read_days(config, "min_days"));
            let max = read_days(recurrence, "max_days").or_else(|| read_days(config, "max_days"));
            if min.is_some() || max.is_some() {
                return Self::from_legacy_gap(min, max);
            }
        }

        // Legacy frequency keys carried in metadata
        let min = read_days(metadata, "frequency_min_days");
        let max = read_days(metadata, "frequency_max_days");
        if min.is_some() || max.is_some() {
            return Self::from_legacy_gap(min, max);
        }

        Self {
            mode,
            ..Self::default()
        }
    }

    /// Translate a legacy min/max gap into the offset form. The gap was
    /// always measured from the last completion, so the mode is `repeat`.
    pub fn from_legacy_gap(min_days: Option<i64>, max_days: Option<i64>) -> Self {
        let start = min_days.unwrap_or(0);
        let end = max_days.unwrap_or(start);
        Self {
            mode: RecurrenceMode::Repeat,
            window: RecurrenceWindow::new(start, end),
            source: RecurrenceSource::LegacyGap,
        }
    }

    /// Canonical JSON form, as written back by a migration step
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "mode": self.mode.as_str(),
            "config": {
                "start_after_days": self.window.start_after_days,
                "end_before_days": self.window.end_before_days,
            }
        })
    }
}

/// Read a day count that may be an integer, a float or a numeric string
fn read_days(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
