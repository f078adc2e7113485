//! Optimization Result Persistence
//!
//! Each stride sweep can be stored as `dev_vs_stride_<timestamp>_<id>.json`
//! in a result directory. The store finds the most recent record by its
//! timestamp and looks up previously optimized strides per mask.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sprayplan_core::{Grid, Mask, Result, Shape};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// File name prefix of result files.
pub const RESULT_FILE_PREFIX: &str = "dev_vs_stride_";

/// The mask a sweep was run against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskRecord {
    pub name: String,
    pub shape: Shape,
    pub bed_size: f64,
    pub grid_step: f64,
    pub cell_count: usize,
}

impl MaskRecord {
    pub fn from_mask(mask: &Mask, grid: &Grid) -> Self {
        Self {
            name: mask.name().to_string(),
            shape: mask.shape().clone(),
            bed_size: grid.bed_size(),
            grid_step: grid.grid_step(),
            cell_count: mask.cell_count(),
        }
    }
}

/// A stored stride sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// `(stride, deviation)` in candidate order
    pub dev_vs_stride: Vec<(f64, f64)>,
    pub best_stride: f64,
    pub best_deviation: f64,
    pub masks: Vec<MaskRecord>,
}

impl OptimizationRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        dev_vs_stride: Vec<(f64, f64)>,
        best_stride: f64,
        best_deviation: f64,
        masks: Vec<MaskRecord>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp,
            dev_vs_stride,
            best_stride,
            best_deviation,
            masks,
        }
    }

    /// File name this record is stored under.
    pub fn file_name(&self) -> String {
        let id = self.run_id.simple().to_string();
        format!(
            "{}{}_{}.json",
            RESULT_FILE_PREFIX,
            self.timestamp.format("%Y-%m-%dT%H-%M-%S%.6fZ"),
            &id[..8]
        )
    }

    pub fn covers_mask(&self, name: &str) -> bool {
        self.masks.iter().any(|m| m.name == name)
    }
}

/// Directory of optimization result files
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `record`, creating the directory if needed.
    pub fn save(&self, record: &OptimizationRecord) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(record.file_name());
        std::fs::write(&path, serde_json::to_string_pretty(record)?)?;
        debug!(path = %path.display(), best_stride = record.best_stride, "saved optimization result");
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<OptimizationRecord> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Result files in the store, sorted by name. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_result = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(RESULT_FILE_PREFIX) && n.ends_with(".json"));
            if is_result && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Every readable record, oldest first. Unreadable files are skipped.
    pub fn records(&self) -> Result<Vec<OptimizationRecord>> {
        let mut records = Vec::new();
        for path in self.list()? {
            match Self::load(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), "skipping unreadable result file: {}", e),
            }
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    /// The record with the newest timestamp.
    pub fn latest(&self) -> Result<Option<OptimizationRecord>> {
        Ok(self.records()?.pop())
    }

    /// Most recent best stride for each named mask, `None` where no record covers it.
    pub fn best_strides(&self, masks: &[&str]) -> Result<Vec<Option<f64>>> {
        let records = self.records()?;
        Ok(masks
            .iter()
            .map(|name| {
                records
                    .iter()
                    .rev()
                    .find(|r| r.covers_mask(name))
                    .map(|r| r.best_stride)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sprayplan_core::Point;

    fn record(name: &str, best: f64, timestamp: DateTime<Utc>) -> OptimizationRecord {
        let mask = MaskRecord {
            name: name.to_string(),
            shape: Shape::rectangle(Point::new(0.0, 0.0), 10.0, 10.0),
            bed_size: 100.0,
            grid_step: 1.0,
            cell_count: 100,
        };
        OptimizationRecord::new(timestamp, vec![(best, 0.5)], best, 0.5, vec![mask])
    }

    #[test]
    fn test_file_name_is_prefixed_and_sortable() {
        let ts = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let name = record("a", 1.0, ts).file_name();
        assert!(name.starts_with("dev_vs_stride_2026-01-02T03-04-05.000000Z_"));
        assert!(name.ends_with(".json"));
        assert!(!name.contains(':'));
    }

    #[test]
    fn test_save_load_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("logs"));
        assert!(store.latest().unwrap().is_none());

        let now = Utc::now();
        let old = record("a", 2.0, now - Duration::hours(1));
        let new = record("a", 3.0, now);
        store.save(&new).unwrap();
        let old_path = store.save(&old).unwrap();

        assert_eq!(ResultStore::load(&old_path).unwrap(), old);
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(store.latest().unwrap().unwrap().run_id, new.run_id);
    }

    #[test]
    fn test_best_strides_per_mask() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let now = Utc::now();
        store.save(&record("a", 2.0, now - Duration::minutes(5))).unwrap();
        store.save(&record("b", 4.0, now - Duration::minutes(3))).unwrap();
        store.save(&record("a", 2.5, now)).unwrap();

        let strides = store.best_strides(&["a", "b", "c"]).unwrap();
        assert_eq!(strides, vec![Some(2.5), Some(4.0), None]);
    }

    #[test]
    fn test_unrelated_and_corrupt_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("dev_vs_stride_broken.json"), "{").unwrap();
        let store = ResultStore::new(dir.path());
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(store.records().unwrap().is_empty());
        assert!(ResultStore::load(&dir.path().join("dev_vs_stride_broken.json"))
            .unwrap_err()
            .is_io());
    }
}
