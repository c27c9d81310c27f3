//! Log entry type and line codec
//!
//! One entry is persisted as one JSON object on one line. The writer and
//! the reader share this codec so an appended line always decodes back to
//! the entry that produced it.
//!
//! Every persisted entry carries the `time`, `level`, `category`, and
//! `message` keys; `meta` holds arbitrary nested data and may be null.
//! Caller-supplied extension fields are kept verbatim in an open map.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Timestamp format written by the store.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity applied when the caller supplies none.
pub const DEFAULT_LEVEL: &str = "info";

/// Classification applied when the caller supplies none.
pub const DEFAULT_CATEGORY: &str = "general";

/// One activity record.
///
/// Entries are immutable once written; there is no update or delete on an
/// individual entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Point in time the entry was recorded, as written to disk
    #[serde(default)]
    pub time: String,

    /// Free-form severity tag
    #[serde(default = "default_level")]
    pub level: String,

    /// Free-form classification tag
    #[serde(default = "default_category")]
    pub category: String,

    /// Human-readable description
    #[serde(default)]
    pub message: String,

    /// Arbitrary nested structured value
    #[serde(default)]
    pub meta: Value,

    /// Caller-supplied extension fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_level() -> String {
    DEFAULT_LEVEL.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl LogEntry {
    /// Builds an entry by overlaying caller fields onto the default set.
    ///
    /// Defaults are `{time, level: "info", category: "general",
    /// message: "", meta: null}`; caller fields win on conflict and
    /// unknown keys are retained as extension fields.
    ///
    /// # Errors
    ///
    /// Fails if a caller field conflicts with the type of a required
    /// field (for example a non-string `level`).
    pub fn compose(fields: Map<String, Value>, time: &str) -> serde_json::Result<Self> {
        let mut merged = Map::new();
        merged.insert("time".to_string(), Value::from(time));
        merged.insert("level".to_string(), Value::from(DEFAULT_LEVEL));
        merged.insert("category".to_string(), Value::from(DEFAULT_CATEGORY));
        merged.insert("message".to_string(), Value::from(""));
        merged.insert("meta".to_string(), Value::Null);
        merged.extend(fields);

        serde_json::from_value(Value::Object(merged))
    }

    /// Serializes the entry as a single JSON line (no trailing newline).
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes one stored line.
    ///
    /// Returns `None` for malformed lines; callers skip those without
    /// surfacing an error.
    pub fn decode(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }

    /// Parses the entry's `time` field.
    ///
    /// Returns `None` when the time is missing or unparseable. Such
    /// entries are never excluded by a date filter and sort as oldest in
    /// any descending-by-time ordering.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_time(&self.time)
    }
}

/// Lenient timestamp parse shared by the filter predicate and sorters.
pub(crate) fn parse_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIME_FORMAT)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|t| t.naive_utc()))
}
