//! Append-only partition writer
//!
//! One call appends one encoded entry, plus a line terminator, to the
//! partition file for the current day, creating the storage root on
//! demand. The append holds an exclusive advisory lock on the partition
//! file so concurrent writers cannot interleave partial lines; the lock
//! is released on every exit path.
//!
//! `log` never surfaces an error for ordinary I/O failure; it reports
//! `false` and leaves retry policy to the caller.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use serde_json::{Map, Value};

use crate::clock::{Clock, SystemClock};
use crate::config::LogConfig;
use crate::entry::{LogEntry, TIME_FORMAT};
use crate::naming;

/// Category applied by the transaction convenience helper.
pub const TRANSACTION_CATEGORY: &str = "transaction";

/// Appends activity entries to the current day's partition.
pub struct LogWriter {
    root: PathBuf,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl LogWriter {
    /// Creates a writer over the configured storage root.
    pub fn new(config: &LogConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a writer with an injected time source.
    pub fn with_clock(config: &LogConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: config.root.clone(),
            prefix: config.prefix.clone(),
            clock,
        }
    }

    /// Appends one entry built from the caller's fields.
    ///
    /// Caller fields are overlaid onto the default set; see
    /// [`LogEntry::compose`]. Returns `false` on any failure.
    pub fn log(&self, fields: Map<String, Value>) -> bool {
        match self.append(fields) {
            Ok(()) => true,
            Err(err) => {
                log::error!("activity log append failed: {}", err);
                false
            }
        }
    }

    /// Logs an info-level entry under the `transaction` category.
    pub fn transaction(&self, message: &str, meta: Value) -> bool {
        self.transaction_with_category(TRANSACTION_CATEGORY, message, meta)
    }

    /// Logs an info-level entry under a caller-chosen category.
    pub fn transaction_with_category(&self, category: &str, message: &str, meta: Value) -> bool {
        let mut fields = Map::new();
        fields.insert("level".to_string(), Value::from("info"));
        fields.insert("category".to_string(), Value::from(category));
        fields.insert("message".to_string(), Value::from(message));
        fields.insert("meta".to_string(), meta);
        self.log(fields)
    }

    fn append(&self, fields: Map<String, Value>) -> io::Result<()> {
        let now = self.clock.now();
        let time = now.format(TIME_FORMAT).to_string();

        let entry = LogEntry::compose(fields, &time)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let line = entry
            .encode()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        self.ensure_root()?;

        let name = naming::partition_name(&self.prefix, now.date_naive());
        let path = self.root.join(name);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.lock_exclusive()?;
        let outcome = write_line(&file, &line);
        let _ = FileExt::unlock(&file);
        outcome
    }

    fn ensure_root(&self) -> io::Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }
        builder.create(&self.root)
    }
}

/// The full line goes out in one write while the lock is held.
fn write_line(mut file: &File, line: &str) -> io::Result<()> {
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn fixed_writer(root: &std::path::Path, y: i32, m: u32, d: u32) -> LogWriter {
        let config = LogConfig::new(root.join("activity"));
        let instant = Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap();
        LogWriter::with_clock(&config, Arc::new(FixedClock(instant)))
    }

    #[test]
    fn test_log_creates_root_and_partition() {
        let temp_dir = TempDir::new().unwrap();
        let writer = fixed_writer(temp_dir.path(), 2024, 5, 6);

        assert!(writer.log(Map::new()));

        let partition = temp_dir
            .path()
            .join("activity")
            .join("activity-2024-05-06.log");
        assert!(partition.is_file());
    }

    #[test]
    fn test_same_day_appends_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let writer = fixed_writer(temp_dir.path(), 2024, 5, 6);

        let mut first = Map::new();
        first.insert("message".to_string(), json!("first"));
        let mut second = Map::new();
        second.insert("message".to_string(), json!("second"));

        assert!(writer.log(first));
        assert!(writer.log(second));

        let partition = temp_dir
            .path()
            .join("activity")
            .join("activity-2024-05-06.log");
        let text = fs::read_to_string(partition).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("first"));
        assert!(lines[1].contains("second"));
    }

    #[test]
    fn test_logged_line_decodes_back() {
        let temp_dir = TempDir::new().unwrap();
        let writer = fixed_writer(temp_dir.path(), 2024, 5, 6);

        let mut fields = Map::new();
        fields.insert("message".to_string(), json!("hello"));
        fields.insert("request_id".to_string(), json!("req-7"));
        assert!(writer.log(fields));

        let partition = temp_dir
            .path()
            .join("activity")
            .join("activity-2024-05-06.log");
        let text = fs::read_to_string(partition).unwrap();
        let entry = LogEntry::decode(text.lines().next().unwrap()).unwrap();

        assert_eq!(entry.time, "2024-05-06 10:00:00");
        assert_eq!(entry.message, "hello");
        assert_eq!(entry.extra.get("request_id"), Some(&json!("req-7")));
    }

    #[test]
    fn test_transaction_sets_category_and_meta() {
        let temp_dir = TempDir::new().unwrap();
        let writer = fixed_writer(temp_dir.path(), 2024, 5, 6);

        assert!(writer.transaction("order placed", json!({"order": 9})));

        let partition = temp_dir
            .path()
            .join("activity")
            .join("activity-2024-05-06.log");
        let text = fs::read_to_string(partition).unwrap();
        let entry = LogEntry::decode(text.lines().next().unwrap()).unwrap();

        assert_eq!(entry.level, "info");
        assert_eq!(entry.category, "transaction");
        assert_eq!(entry.message, "order placed");
        assert_eq!(entry.meta, json!({"order": 9}));
    }

    #[test]
    fn test_log_reports_failure_as_false() {
        let temp_dir = TempDir::new().unwrap();

        // Occupy the root path with a file so the directory cannot be
        // created.
        let blocked = temp_dir.path().join("activity");
        fs::write(&blocked, b"not a directory").unwrap();

        let config = LogConfig::new(&blocked);
        let instant = Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap();
        let writer = LogWriter::with_clock(&config, Arc::new(FixedClock(instant)));

        assert!(!writer.log(Map::new()));
    }

    #[test]
    fn test_log_reports_mistyped_field_as_false() {
        let temp_dir = TempDir::new().unwrap();
        let writer = fixed_writer(temp_dir.path(), 2024, 5, 6);

        let mut fields = Map::new();
        fields.insert("level".to_string(), json!(5));

        assert!(!writer.log(fields));
    }

    #[test]
    fn test_lock_released_after_append() {
        let temp_dir = TempDir::new().unwrap();
        let writer = fixed_writer(temp_dir.path(), 2024, 5, 6);

        // A second append would block forever if the first one leaked
        // its lock.
        assert!(writer.log(Map::new()));
        assert!(writer.log(Map::new()));
    }
}
