use crate::error::{Result, StatsError};
use crate::models::{MetricSample, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const HEADER: &str = "Date,Subscribers,Views,Videos,Playlists";

/// Append-only CSV log of samples. Rows are never rewritten.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

/// Exclusive advisory lock on the log; released on drop.
#[derive(Debug)]
pub struct HistoryLock {
    file: File,
    path: PathBuf,
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl HistoryLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Takes `<log>.lock` so that only one run writes the log at a time.
    pub fn lock(&self) -> Result<HistoryLock> {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        let lock_path = PathBuf::from(name);

        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StatsError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StatsError::io(&lock_path, e))?;

        file.try_lock_exclusive().map_err(|_| StatsError::Locked {
            path: self.path.clone(),
        })?;

        Ok(HistoryLock {
            file,
            path: lock_path,
        })
    }

    /// Writes the header (first write only) and one row in a single write-and-flush.
    pub fn append(&self, sample: &MetricSample) -> Result<()> {
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => return Err(StatsError::io(&self.path, e)),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StatsError::io(parent, e))?;
        }

        let mut buf = String::new();
        if needs_header {
            buf.push_str(HEADER);
            buf.push('\n');
        }
        buf.push_str(&format_row(sample));
        buf.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StatsError::io(&self.path, e))?;
        file.write_all(buf.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| StatsError::io(&self.path, e))
    }

    /// All samples in file order. A missing log is an empty history;
    /// any malformed line is an error rather than being skipped.
    pub fn read_all(&self) -> Result<Vec<MetricSample>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StatsError::io(&self.path, e)),
        };

        let mut lines = content.lines().enumerate();
        match lines.next() {
            None => return Ok(Vec::new()),
            Some((_, header)) if header.trim_end() == HEADER => {}
            Some((_, header)) => {
                return Err(self.malformed(1, format!("unexpected header {header:?}")));
            }
        }

        lines
            .map(|(idx, line)| parse_row(line).map_err(|details| self.malformed(idx + 1, details)))
            .collect()
    }

    fn malformed(&self, line: usize, details: String) -> StatsError {
        StatsError::MalformedHistory {
            path: self.path.clone(),
            line,
            details,
        }
    }
}

pub fn format_row(sample: &MetricSample) -> String {
    format!(
        "{},{},{},{},{}",
        sample.formatted_timestamp(),
        sample.subscribers,
        sample.views,
        sample.videos,
        sample.playlists
    )
}

fn parse_row(line: &str) -> std::result::Result<MetricSample, String> {
    let fields: Vec<&str> = line.trim_end_matches('\r').split(',').collect();
    if fields.len() != 5 {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    }

    let timestamp = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT)
        .map_err(|e| format!("bad timestamp {:?}: {e}", fields[0]))?;
    let count = |idx: usize, name: &str| {
        fields[idx]
            .parse::<u64>()
            .map_err(|e| format!("bad {name} {:?}: {e}", fields[idx]))
    };

    Ok(MetricSample {
        timestamp,
        subscribers: count(1, "subscribers")?,
        views: count(2, "views")?,
        videos: count(3, "videos")?,
        playlists: count(4, "playlists")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample(minute: u32, subscribers: u64) -> MetricSample {
        MetricSample {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, minute, 5)
                .unwrap(),
            subscribers,
            views: subscribers * 10,
            videos: 7,
            playlists: 2,
        }
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("stats.csv"));
        assert!(!store.exists());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn appends_keep_order_and_single_header() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("stats.csv"));
        let samples: Vec<_> = (0..5).map(|i| sample(i, 100 + i as u64)).collect();

        for s in &samples {
            store.append(s).unwrap();
        }

        assert_eq!(store.read_all().unwrap(), samples);

        let raw = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], HEADER);
        assert_eq!(raw.matches(HEADER).count(), 1);
        assert_eq!(lines[1], "2024-03-01 12:00:05,100,1000,7,2");
    }

    #[test]
    fn empty_file_gets_a_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.csv");
        fs::write(&path, "").unwrap();
        let store = HistoryStore::new(&path);

        store.append(&sample(1, 5)).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with(HEADER));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("data/nested/stats.csv"));
        store.append(&sample(1, 5)).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn malformed_rows_are_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.csv");
        fs::write(
            &path,
            format!("{HEADER}\n2024-03-01 12:00:05,1,2,3,4\n2024-03-01 12:01:05,1,2\n"),
        )
        .unwrap();

        match HistoryStore::new(&path).read_all().unwrap_err() {
            StatsError::MalformedHistory { line, details, .. } => {
                assert_eq!(line, 3);
                assert!(details.contains("expected 5 fields"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_count_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.csv");
        fs::write(&path, format!("{HEADER}\n2024-03-01 12:00:05,1,lots,3,4\n")).unwrap();

        let err = HistoryStore::new(&path).read_all().unwrap_err();
        assert!(err.to_string().contains("bad views"));
    }

    #[test]
    fn wrong_header_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.csv");
        fs::write(&path, "when,subs\n").unwrap();

        let err = HistoryStore::new(&path).read_all().unwrap_err();
        assert!(matches!(err, StatsError::MalformedHistory { line: 1, .. }));
    }

    #[test]
    fn second_lock_is_refused_until_first_drops() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("stats.csv"));

        let first = store.lock().unwrap();
        assert!(first.path().ends_with("stats.csv.lock"));
        assert!(matches!(store.lock(), Err(StatsError::Locked { .. })));

        drop(first);
        assert!(store.lock().is_ok());
    }
}
