//! Filename codec and source discovery
//!
//! Maps directory entry names to typed descriptors and back:
//!
//! - Daily partition: `<prefix>-YYYY-MM-DD.log`
//! - Weekly archive:  `<prefix>-week-YYYYMMDD-to-YYYYMMDD.zip`
//!
//! Everything here is pure; callers feed in a listing of names and get
//! typed, ordered descriptors out. Names that match neither pattern are
//! ignored, which also keeps staging files invisible to readers.

use chrono::NaiveDate;

/// Suffix of a daily partition file.
pub const PARTITION_SUFFIX: &str = ".log";

/// Suffix of a weekly archive file.
pub const ARCHIVE_SUFFIX: &str = ".zip";

const DAY_FORMAT: &str = "%Y-%m-%d";
const WEEK_DAY_FORMAT: &str = "%Y%m%d";

/// Descriptor of one calendar day's partition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionName {
    /// Day covered by the partition
    pub day: NaiveDate,
    /// Filename under the storage root
    pub name: String,
}

/// Descriptor of one calendar week's archive file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    /// First day of the covered week (Monday)
    pub week_start: NaiveDate,
    /// Last day of the covered week (Sunday)
    pub week_end: NaiveDate,
    /// Filename under the storage root
    pub name: String,
}

/// A directory entry recognized as a partition or an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Partition(PartitionName),
    Archive(ArchiveName),
}

/// Builds the partition filename for a day.
pub fn partition_name(prefix: &str, day: NaiveDate) -> String {
    format!("{}-{}{}", prefix, day.format(DAY_FORMAT), PARTITION_SUFFIX)
}

/// Builds the archive filename for a week.
pub fn archive_name(prefix: &str, week_start: NaiveDate, week_end: NaiveDate) -> String {
    format!(
        "{}-week-{}-to-{}{}",
        prefix,
        week_start.format(WEEK_DAY_FORMAT),
        week_end.format(WEEK_DAY_FORMAT),
        ARCHIVE_SUFFIX
    )
}

/// Matches one directory entry name against both patterns.
///
/// Returns `None` for names carrying another prefix, staging suffixes,
/// or unparseable date components.
pub fn parse_source(prefix: &str, name: &str) -> Option<LogSource> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;

    if let Some(day) = rest.strip_suffix(PARTITION_SUFFIX) {
        let day = NaiveDate::parse_from_str(day, DAY_FORMAT).ok()?;
        return Some(LogSource::Partition(PartitionName {
            day,
            name: name.to_string(),
        }));
    }

    let span = rest.strip_prefix("week-")?.strip_suffix(ARCHIVE_SUFFIX)?;
    let (start, end) = span.split_once("-to-")?;
    let week_start = NaiveDate::parse_from_str(start, WEEK_DAY_FORMAT).ok()?;
    let week_end = NaiveDate::parse_from_str(end, WEEK_DAY_FORMAT).ok()?;

    Some(LogSource::Archive(ArchiveName {
        week_start,
        week_end,
        name: name.to_string(),
    }))
}

/// Typed view of a storage root listing.
///
/// Partitions are ordered by day descending and archives by end date
/// descending, the order the incremental reader consumes them in.
#[derive(Debug, Default, Clone)]
pub struct SourceSet {
    pub partitions: Vec<PartitionName>,
    pub archives: Vec<ArchiveName>,
}

/// Classifies a listing of directory entry names into a [`SourceSet`].
pub fn classify<I, S>(prefix: &str, names: I) -> SourceSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = SourceSet::default();

    for name in names {
        match parse_source(prefix, name.as_ref()) {
            Some(LogSource::Partition(partition)) => set.partitions.push(partition),
            Some(LogSource::Archive(archive)) => set.archives.push(archive),
            None => {}
        }
    }

    set.partitions.sort_by(|a, b| b.day.cmp(&a.day));
    set.archives.sort_by(|a, b| b.week_end.cmp(&a.week_end));
    set
}

impl SourceSet {
    /// Earliest day that has a partition, if any.
    pub fn earliest_partition_day(&self) -> Option<NaiveDate> {
        self.partitions.last().map(|p| p.day)
    }

    /// Looks up the partition covering one day.
    pub fn partition_for_day(&self, day: NaiveDate) -> Option<&PartitionName> {
        self.partitions.iter().find(|p| p.day == day)
    }

    /// Keeps every partition whose day falls inside the bound and every
    /// archive whose week interval overlaps it.
    ///
    /// An open side of the bound excludes nothing on that side.
    pub fn in_range(self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> SourceSet {
        let partitions = self
            .partitions
            .into_iter()
            .filter(|p| {
                start.map_or(true, |s| p.day >= s) && end.map_or(true, |e| p.day <= e)
            })
            .collect();

        let archives = self
            .archives
            .into_iter()
            .filter(|a| {
                start.map_or(true, |s| a.week_end >= s) && end.map_or(true, |e| a.week_start <= e)
            })
            .collect();

        SourceSet {
            partitions,
            archives,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_partition_name_format() {
        assert_eq!(
            partition_name("activity", day(2024, 5, 6)),
            "activity-2024-05-06.log"
        );
    }

    #[test]
    fn test_archive_name_format() {
        assert_eq!(
            archive_name("activity", day(2024, 4, 29), day(2024, 5, 5)),
            "activity-week-20240429-to-20240505.zip"
        );
    }

    #[test]
    fn test_parse_partition_roundtrip() {
        let name = partition_name("activity", day(2024, 5, 6));
        let source = parse_source("activity", &name).unwrap();

        assert_eq!(
            source,
            LogSource::Partition(PartitionName {
                day: day(2024, 5, 6),
                name,
            })
        );
    }

    #[test]
    fn test_parse_archive_roundtrip() {
        let name = archive_name("activity", day(2024, 4, 29), day(2024, 5, 5));
        let source = parse_source("activity", &name).unwrap();

        assert_eq!(
            source,
            LogSource::Archive(ArchiveName {
                week_start: day(2024, 4, 29),
                week_end: day(2024, 5, 5),
                name,
            })
        );
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!(parse_source("activity", "audit-2024-05-06.log").is_none());
        assert!(parse_source("activity", "activity-notadate.log").is_none());
        assert!(parse_source("activity", "activity-2024-05-06.log.partial").is_none());
        assert!(parse_source("activity", "activity-week-20240429-to-20240505.zip.partial").is_none());
        assert!(parse_source("activity", "activity-week-20240429.zip").is_none());
        assert!(parse_source("activity", "readme.txt").is_none());
    }

    #[test]
    fn test_classify_orders_newest_first() {
        let set = classify(
            "activity",
            [
                "activity-2024-05-04.log",
                "activity-week-20240415-to-20240421.zip",
                "activity-2024-05-06.log",
                "activity-week-20240422-to-20240428.zip",
                "activity-2024-05-05.log",
                "notes.md",
            ],
        );

        let days: Vec<NaiveDate> = set.partitions.iter().map(|p| p.day).collect();
        assert_eq!(days, vec![day(2024, 5, 6), day(2024, 5, 5), day(2024, 5, 4)]);

        let ends: Vec<NaiveDate> = set.archives.iter().map(|a| a.week_end).collect();
        assert_eq!(ends, vec![day(2024, 4, 28), day(2024, 4, 21)]);
    }

    #[test]
    fn test_earliest_partition_day() {
        let set = classify(
            "activity",
            ["activity-2024-05-06.log", "activity-2024-05-01.log"],
        );

        assert_eq!(set.earliest_partition_day(), Some(day(2024, 5, 1)));
        assert!(classify("activity", Vec::<String>::new())
            .earliest_partition_day()
            .is_none());
    }

    #[test]
    fn test_in_range_filters_partitions_by_day() {
        let set = classify(
            "activity",
            [
                "activity-2024-05-01.log",
                "activity-2024-05-06.log",
                "activity-2024-05-10.log",
            ],
        );

        let ranged = set.in_range(Some(day(2024, 5, 2)), Some(day(2024, 5, 9)));

        assert_eq!(ranged.partitions.len(), 1);
        assert_eq!(ranged.partitions[0].day, day(2024, 5, 6));
    }

    #[test]
    fn test_in_range_keeps_overlapping_archives() {
        let set = classify(
            "activity",
            [
                "activity-week-20240401-to-20240407.zip",
                "activity-week-20240408-to-20240414.zip",
                "activity-week-20240415-to-20240421.zip",
            ],
        );

        // Bound straddles the middle week and touches the edges of the
        // other two.
        let ranged = set
            .clone()
            .in_range(Some(day(2024, 4, 7)), Some(day(2024, 4, 15)));
        assert_eq!(ranged.archives.len(), 3);

        let ranged = set.in_range(Some(day(2024, 4, 9)), Some(day(2024, 4, 10)));
        assert_eq!(ranged.archives.len(), 1);
        assert_eq!(ranged.archives[0].week_start, day(2024, 4, 8));
    }

    #[test]
    fn test_in_range_open_bounds() {
        let set = classify(
            "activity",
            ["activity-2024-05-01.log", "activity-2024-05-06.log"],
        );

        let from_only = set.clone().in_range(Some(day(2024, 5, 3)), None);
        assert_eq!(from_only.partitions.len(), 1);

        let until_only = set.in_range(None, Some(day(2024, 5, 3)));
        assert_eq!(until_only.partitions.len(), 1);
        assert_eq!(until_only.partitions[0].day, day(2024, 5, 1));
    }
}
