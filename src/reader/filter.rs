//! Search-mode filter predicate
//!
//! Applied per decoded entry, together with the raw line the entry was
//! decoded from. The keyword matches against the raw line so it reaches
//! keys, the message, and nested meta content alike.

use chrono::NaiveDateTime;

use crate::entry::LogEntry;

/// Predicate combining the optional keyword, category, and date bounds.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    keyword: Option<String>,
    category: Option<String>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl EntryFilter {
    /// Builds a predicate; keyword and category match case-insensitively.
    pub fn new(
        keyword: Option<&str>,
        category: Option<&str>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            keyword: keyword.map(|k| k.to_lowercase()),
            category: category.map(|c| c.to_lowercase()),
            start,
            end,
        }
    }

    /// True when no condition is set; such a filter accepts everything.
    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.category.is_none() && self.start.is_none() && self.end.is_none()
    }

    /// Applies every configured condition to one entry.
    ///
    /// An entry whose time cannot be parsed is never excluded by a date
    /// bound; it is preserved as if it had no usable time.
    pub fn matches(&self, entry: &LogEntry, raw_line: &str) -> bool {
        if self.start.is_some() || self.end.is_some() {
            if let Some(time) = entry.timestamp() {
                if let Some(start) = self.start {
                    if time < start {
                        return false;
                    }
                }
                if let Some(end) = self.end {
                    if time > end {
                        return false;
                    }
                }
            }
        }

        if let Some(category) = &self.category {
            if !entry.category.to_lowercase().contains(category.as_str()) {
                return false;
            }
        }

        if let Some(keyword) = &self.keyword {
            if !raw_line.to_lowercase().contains(keyword.as_str()) {
                return false;
            }
        }

        true
    }
}
