//! Retrieval engine
//!
//! A single entry point serves two request shapes:
//!
//! - **Incremental mode** (no filters): newest entries first, walking
//!   backward from today's partition one day at a time, spilling into
//!   archives only when the live partitions cannot satisfy the limit.
//!   The backward walk is bounded by [`MAX_LOOKBACK_DAYS`].
//! - **Search mode** (any filter present): every candidate partition and
//!   archive is decoded in full, entries pass the filter predicate, and
//!   the merged result is sorted by time descending.
//!
//! Reads never lock. A line that fails to decode is skipped; a file that
//! does not exist contributes nothing. Date filters are validated before
//! any filesystem access.

mod days;
mod errors;
mod filter;

pub use days::{DaysBack, MAX_LOOKBACK_DAYS};
pub use errors::{ReadError, ReadResult};
pub use filter::EntryFilter;

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::clock::{Clock, SystemClock};
use crate::config::LogConfig;
use crate::entry::LogEntry;
use crate::naming::{self, ArchiveName, PartitionName};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parameters of one read request. All fields are optional; an entirely
/// empty query is an incremental read at the configured default limit.
#[derive(Debug, Clone, Default)]
pub struct ReadQuery {
    /// Maximum number of entries to return. Incremental mode falls back
    /// to the configured default; search mode applies it only when set.
    pub limit: Option<usize>,
    /// Case-insensitive substring matched against the whole serialized
    /// entry.
    pub keyword: Option<String>,
    /// Case-insensitive substring matched against the category field.
    pub category: Option<String>,
    /// Inclusive lower day bound, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive upper day bound, `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

impl ReadQuery {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    fn is_search(&self) -> bool {
        self.keyword.is_some()
            || self.category.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
    }
}

/// Reads entries back from partitions and archives.
pub struct LogReader {
    root: PathBuf,
    prefix: String,
    default_limit: usize,
    clock: Arc<dyn Clock>,
}

impl LogReader {
    /// Creates a reader over the configured storage root.
    pub fn new(config: &LogConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a reader with an injected time source.
    pub fn with_clock(config: &LogConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: config.root.clone(),
            prefix: config.prefix.clone(),
            default_limit: config.default_limit,
            clock,
        }
    }

    /// Runs one read request and returns decoded entries newest first.
    pub fn read(&self, query: &ReadQuery) -> ReadResult<Vec<LogEntry>> {
        let start = parse_bound(query.start_date.as_deref())?.map(start_of_day);
        let end = parse_bound(query.end_date.as_deref())?.map(end_of_day);

        if query.is_search() {
            self.search(query, start, end)
        } else {
            self.latest(query.limit.unwrap_or(self.default_limit))
        }
    }

    /// Incremental mode: backward day walk, then archives.
    fn latest(&self, limit: usize) -> ReadResult<Vec<LogEntry>> {
        let mut results = Vec::new();
        if limit == 0 {
            return Ok(results);
        }

        let sources = naming::classify(&self.prefix, self.list_names()?);

        if let Some(earliest) = sources.earliest_partition_day() {
            let today = self.clock.now().date_naive();
            for day in DaysBack::new(today, MAX_LOOKBACK_DAYS) {
                if let Some(partition) = sources.partition_for_day(day) {
                    self.scan_partition_reverse(partition, limit, &mut results)?;
                    if results.len() >= limit {
                        break;
                    }
                }
                if day <= earliest {
                    break;
                }
            }
        }

        if results.len() < limit {
            // Archives are already ordered by end date descending.
            for archive in &sources.archives {
                let mut entries = self.read_archive(archive, &EntryFilter::default())?;
                entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
                for entry in entries {
                    results.push(entry);
                    if results.len() >= limit {
                        break;
                    }
                }
                if results.len() >= limit {
                    break;
                }
            }
        }

        results.truncate(limit);
        Ok(results)
    }

    /// Search mode: decode every candidate source, filter, global sort.
    fn search(
        &self,
        query: &ReadQuery,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> ReadResult<Vec<LogEntry>> {
        let mut sources = naming::classify(&self.prefix, self.list_names()?);
        if start.is_some() || end.is_some() {
            sources = sources.in_range(start.map(|t| t.date()), end.map(|t| t.date()));
        }

        let predicate = EntryFilter::new(
            query.keyword.as_deref(),
            query.category.as_deref(),
            start,
            end,
        );

        let mut results = Vec::new();
        for partition in &sources.partitions {
            self.scan_partition(partition, &predicate, &mut results)?;
        }
        for archive in &sources.archives {
            results.extend(self.read_archive(archive, &predicate)?);
        }

        // Descending by time; entries without a usable time sort last.
        results.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    /// Names of every entry under the storage root. A missing root is an
    /// empty store.
    fn list_names(&self) -> ReadResult<Vec<String>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(ReadError::Io {
                    path: self.root.clone(),
                    source: err,
                })
            }
        };

        let mut names = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|err| ReadError::Io {
                path: self.root.clone(),
                source: err,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Decodes a partition newest-line-first, appending up to `limit`
    /// total entries into `out`.
    fn scan_partition_reverse(
        &self,
        partition: &PartitionName,
        limit: usize,
        out: &mut Vec<LogEntry>,
    ) -> ReadResult<()> {
        let Some(text) = self.partition_text(partition)? else {
            return Ok(());
        };

        for line in text.lines().rev() {
            if line.trim().is_empty() {
                continue;
            }
            match LogEntry::decode(line) {
                Some(entry) => {
                    out.push(entry);
                    if out.len() >= limit {
                        break;
                    }
                }
                None => log::debug!("skipping malformed line in {}", partition.name),
            }
        }
        Ok(())
    }

    /// Decodes a partition in on-disk order, keeping entries that pass
    /// the predicate.
    fn scan_partition(
        &self,
        partition: &PartitionName,
        predicate: &EntryFilter,
        out: &mut Vec<LogEntry>,
    ) -> ReadResult<()> {
        let Some(text) = self.partition_text(partition)? else {
            return Ok(());
        };

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match LogEntry::decode(line) {
                Some(entry) if predicate.matches(&entry, line) => out.push(entry),
                Some(_) => {}
                None => log::debug!("skipping malformed line in {}", partition.name),
            }
        }
        Ok(())
    }

    /// Reads one partition's content. A concurrent writer may leave a
    /// torn final line; the lossy conversion keeps every complete line
    /// decodable and the torn one falls out as malformed.
    fn partition_text(&self, partition: &PartitionName) -> ReadResult<Option<String>> {
        let path = self.root.join(&partition.name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ReadError::Io { path, source: err }),
        }
    }

    /// Decodes every member of one archive, keeping entries that pass
    /// the predicate.
    ///
    /// An archive that is not a readable zip is treated as empty; only
    /// genuine I/O failures propagate. A half-written staging file never
    /// reaches this point because its name does not classify.
    fn read_archive(
        &self,
        archive: &ArchiveName,
        predicate: &EntryFilter,
    ) -> ReadResult<Vec<LogEntry>> {
        let path = self.root.join(&archive.name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ReadError::Io { path, source: err }),
        };

        let mut bundle = match ZipArchive::new(file) {
            Ok(bundle) => bundle,
            Err(ZipError::Io(err)) => return Err(ReadError::Io { path, source: err }),
            Err(err) => {
                log::warn!("ignoring unreadable archive {}: {}", archive.name, err);
                return Ok(Vec::new());
            }
        };

        let mut entries = Vec::new();
        for index in 0..bundle.len() {
            let mut member = match bundle.by_index(index) {
                Ok(member) => member,
                Err(ZipError::Io(err)) => return Err(ReadError::Io { path, source: err }),
                Err(err) => {
                    log::warn!("skipping corrupt member in {}: {}", archive.name, err);
                    continue;
                }
            };

            let mut bytes = Vec::new();
            if let Err(err) = member.read_to_end(&mut bytes) {
                log::warn!(
                    "skipping unreadable member {} in {}: {}",
                    member.name(),
                    archive.name,
                    err
                );
                continue;
            }

            let text = String::from_utf8_lossy(&bytes);
            for line in text.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match LogEntry::decode(line) {
                    Some(entry) if predicate.matches(&entry, line) => entries.push(entry),
                    Some(_) => {}
                    None => log::debug!("skipping malformed line in {}", archive.name),
                }
            }
        }
        Ok(entries)
    }
}

fn parse_bound(value: Option<&str>) -> ReadResult<Option<NaiveDate>> {
    match value {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, DAY_FORMAT)
            .map(Some)
            .map_err(|_| ReadError::InvalidDateFilter {
                value: raw.to_string(),
            }),
    }
}

fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| day.and_time(NaiveTime::MIN))
}
