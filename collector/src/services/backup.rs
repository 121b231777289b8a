use crate::error::{Result, StatsError};
use chrono::NaiveDateTime;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed-width, so name order equals chronological order.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Timestamped copies of the history log with bounded retention.
#[derive(Debug, Clone)]
pub struct BackupRotator {
    dir: PathBuf,
    keep: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SnapshotOutcome {
    pub created: Option<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl BackupRotator {
    pub fn new(dir: impl Into<PathBuf>, keep: usize) -> Self {
        BackupRotator {
            dir: dir.into(),
            keep,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies `log` into the backup directory, then rotates. A log that does
    /// not exist yet has nothing to protect and yields no snapshot.
    pub fn snapshot(&self, log: &Path, at: NaiveDateTime) -> Result<SnapshotOutcome> {
        if !log.is_file() {
            info!("No history at {} yet, skipping backup", log.display());
            return Ok(SnapshotOutcome::default());
        }

        fs::create_dir_all(&self.dir).map_err(|e| StatsError::io(&self.dir, e))?;

        let (stem, ext) = name_parts(log);
        let target = self.dir.join(format!(
            "{stem}_{}{ext}",
            at.format(SNAPSHOT_TIMESTAMP_FORMAT)
        ));
        fs::copy(log, &target).map_err(|e| StatsError::io(&target, e))?;
        info!("Backed up {} to {}", log.display(), target.display());

        let removed = self.rotate(log)?;
        Ok(SnapshotOutcome {
            created: Some(target),
            removed,
        })
    }

    /// Deletes every snapshot of `log` beyond the newest `keep`, returning what was removed.
    pub fn rotate(&self, log: &Path) -> Result<Vec<PathBuf>> {
        let mut snapshots = self.list(log)?;
        // newest first
        snapshots.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

        let mut removed = Vec::new();
        for stale in snapshots.into_iter().skip(self.keep) {
            fs::remove_file(&stale).map_err(|e| StatsError::io(&stale, e))?;
            info!("Removed old backup {}", stale.display());
            removed.push(stale);
        }
        Ok(removed)
    }

    /// Snapshots of `log` currently on disk, in directory order.
    pub fn list(&self, log: &Path) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StatsError::io(&self.dir, e)),
        };

        let (stem, ext) = name_parts(log);
        let prefix = format!("{stem}_");

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StatsError::io(&self.dir, e))?;
            let path = entry.path();
            // only names we generated; a hand-made `<stem>_manual<ext>` is left alone
            let is_snapshot = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(prefix.as_str()))
                .and_then(|n| n.strip_suffix(ext.as_str()))
                .map(|stamp| {
                    NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIMESTAMP_FORMAT).is_ok()
                })
                .unwrap_or(false);
            if is_snapshot && path.is_file() {
                snapshots.push(path);
            }
        }
        Ok(snapshots)
    }
}

/// ("youtube_stats", ".csv") for `youtube_stats.csv`.
fn name_parts(log: &Path) -> (String, String) {
    let stem = log
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "history".to_string());
    let ext = log
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}
