//! Weekly compaction
//!
//! Bundles the previous calendar week's partitions into one zip archive
//! and removes the originals, all-or-nothing:
//!
//! 1. Select every partition whose day falls in the previous
//!    Monday-to-Sunday window. None selected: the run is a no-op.
//! 2. Build the archive at a staging path whose name never classifies
//!    as a valid archive, copy each partition's raw bytes in as a
//!    member under its original filename, fsync.
//! 3. Rename the staging file onto the final archive name.
//! 4. Only then delete the original partitions.
//!
//! A failure in steps 2-3 removes the staging file and leaves every
//! partition untouched, so a store observed between runs is either
//! "week not yet archived, all dailies present" or "week archived, all
//! dailies removed". Rerunning for an archived week selects nothing and
//! succeeds.
//!
//! The window never includes the current day, so compaction cannot race
//! an active writer on the same file.

mod errors;

pub use errors::{CompactError, CompactResult};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Weekday};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::clock::{Clock, SystemClock};
use crate::config::LogConfig;
use crate::naming::{self, PartitionName};

/// What one compaction run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// No partition fell inside the previous week's window.
    Skipped,
    /// The week was rolled into an archive.
    Archived {
        /// Filename of the created archive
        archive: String,
        /// Number of partitions bundled and removed
        partitions: usize,
    },
}

/// Rolls past weeks of partitions into archives.
pub struct Compactor {
    root: PathBuf,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl Compactor {
    /// Creates a compactor over the configured storage root.
    pub fn new(config: &LogConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a compactor with an injected time source.
    pub fn with_clock(config: &LogConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: config.root.clone(),
            prefix: config.prefix.clone(),
            clock,
        }
    }

    /// Archives the previous calendar week's partitions.
    pub fn compact(&self) -> CompactResult<CompactionOutcome> {
        let today = self.clock.now().date_naive();
        let (week_start, week_end) = previous_week(today);

        let sources = naming::classify(&self.prefix, self.list_names()?);
        let selected: Vec<&PartitionName> = sources
            .partitions
            .iter()
            .filter(|p| p.day >= week_start && p.day <= week_end)
            .collect();

        if selected.is_empty() {
            log::info!(
                "no partitions to roll for week {} to {}",
                week_start,
                week_end
            );
            return Ok(CompactionOutcome::Skipped);
        }

        let archive = naming::archive_name(&self.prefix, week_start, week_end);
        let final_path = self.root.join(&archive);
        let staging_path = self.root.join(format!("{}.partial", archive));

        if let Err(err) = self.build_archive(&selected, &staging_path) {
            remove_staging(&staging_path);
            return Err(err);
        }

        if let Err(err) = fs::rename(&staging_path, &final_path) {
            remove_staging(&staging_path);
            return Err(CompactError::Finalize {
                path: final_path,
                source: err,
            });
        }

        sync_dir(&self.root).map_err(|err| CompactError::Finalize {
            path: self.root.clone(),
            source: err,
        })?;

        // The archive is durable; the originals may go.
        for partition in &selected {
            fs::remove_file(self.root.join(&partition.name)).map_err(|err| {
                CompactError::Cleanup {
                    name: partition.name.clone(),
                    source: err,
                }
            })?;
        }

        log::info!("rolled {} partitions into {}", selected.len(), archive);
        Ok(CompactionOutcome::Archived {
            archive,
            partitions: selected.len(),
        })
    }

    /// Writes every selected partition into a zip at the staging path.
    fn build_archive(
        &self,
        partitions: &[&PartitionName],
        staging_path: &Path,
    ) -> CompactResult<()> {
        let file = File::create(staging_path).map_err(|err| CompactError::Create {
            path: staging_path.to_path_buf(),
            source: err,
        })?;

        let mut bundle = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for partition in partitions {
            let bytes =
                fs::read(self.root.join(&partition.name)).map_err(|err| CompactError::Member {
                    name: partition.name.clone(),
                    source: err,
                })?;

            bundle
                .start_file(partition.name.as_str(), options)
                .map_err(|err| CompactError::Member {
                    name: partition.name.clone(),
                    source: io::Error::from(err),
                })?;
            bundle.write_all(&bytes).map_err(|err| CompactError::Member {
                name: partition.name.clone(),
                source: err,
            })?;
        }

        let file = bundle.finish().map_err(|err| CompactError::Finalize {
            path: staging_path.to_path_buf(),
            source: io::Error::from(err),
        })?;
        file.sync_all().map_err(|err| CompactError::Finalize {
            path: staging_path.to_path_buf(),
            source: err,
        })
    }

    /// Names of every entry under the storage root. A missing root
    /// means nothing to roll.
    fn list_names(&self) -> CompactResult<Vec<String>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(CompactError::Scan {
                    path: self.root.clone(),
                    source: err,
                })
            }
        };

        let mut names = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|err| CompactError::Scan {
                path: self.root.clone(),
                source: err,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

/// Previous Monday-to-Sunday window relative to `today`.
fn previous_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let this_monday = today.week(Weekday::Mon).first_day();
    let start = this_monday - Duration::days(7);
    (start, start + Duration::days(6))
}

fn remove_staging(path: &Path) {
    if path.exists() {
        let _ = fs::remove_file(path);
    }
}

fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
