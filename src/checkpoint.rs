//! Durable checkpointing of partial batch results.
//!
//! The checkpoint is a CSV file holding one record per successfully processed
//! row: a `row_index` column, the row's original values, then the generated
//! response. The explicit index column keeps the done-set exact even when
//! failed rows were dropped between saved ones. Callers never probe for the
//! file themselves; [`CheckpointStore::load`] returns an explicit `Option`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::dataset::RESPONSE_COLUMN;
use crate::error::{Error, Result};

/// Column holding the 0-based dataset row index in the checkpoint file.
const INDEX_COLUMN: &str = "row_index";

/// One successfully processed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRecord {
    /// 0-based position of the row in the source dataset.
    pub index: usize,
    /// The row's original column values, in dataset column order.
    pub values: Vec<String>,
    /// The generated text. Non-empty and trimmed.
    pub response: String,
}

/// The records persisted by a prior run.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub records: Vec<ProcessingRecord>,
}

impl Checkpoint {
    /// Row indices already processed; a resumed run skips these.
    pub fn done_indices(&self) -> HashSet<usize> {
        self.records.iter().map(|r| r.index).collect()
    }
}

/// Reads and writes the intermediate-results file.
///
/// Sole owner of the on-disk representation. One store per run; concurrent
/// access from multiple processes is out of scope and unguarded.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previously persisted records, or `None` when no checkpoint
    /// exists.
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        if reader.headers()?.get(0) != Some(INDEX_COLUMN) {
            return Err(Error::InvalidConfig(format!(
                "checkpoint {} does not start with a '{}' column",
                self.path.display(),
                INDEX_COLUMN
            )));
        }

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            let index: usize = record.get(0).unwrap_or_default().parse().map_err(|_| {
                Error::InvalidConfig(format!(
                    "checkpoint {} has a non-numeric row index",
                    self.path.display()
                ))
            })?;
            let mut values: Vec<String> = record.iter().skip(1).map(str::to_string).collect();
            let response = values.pop().unwrap_or_default();
            records.push(ProcessingRecord {
                index,
                values,
                response,
            });
        }

        Ok(Some(Checkpoint { records }))
    }

    /// Rewrite the checkpoint in full.
    ///
    /// Writes to a sibling temp file and renames it into place, so the file
    /// on disk is always a complete document and never a partially written
    /// one. `columns` are the original dataset columns.
    pub fn save(&self, columns: &[String], records: &[ProcessingRecord]) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;

            let mut header: Vec<&str> = Vec::with_capacity(columns.len() + 2);
            header.push(INDEX_COLUMN);
            header.extend(columns.iter().map(String::as_str));
            header.push(RESPONSE_COLUMN);
            writer.write_record(&header)?;

            for record in records {
                let mut row: Vec<String> = Vec::with_capacity(record.values.len() + 2);
                row.push(record.index.to_string());
                row.extend(record.values.iter().cloned());
                row.push(record.response.clone());
                writer.write_record(&row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!(
            "saved checkpoint with {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Remove the checkpoint file. A no-op when it does not exist.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("removed checkpoint {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn columns() -> Vec<String> {
        vec!["name".to_string(), "topic".to_string()]
    }

    fn record(index: usize, name: &str, topic: &str, response: &str) -> ProcessingRecord {
        ProcessingRecord {
            index,
            values: vec![name.to_string(), topic.to_string()],
            response: response.to_string(),
        }
    }

    #[test]
    fn test_load_absent_returns_none() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("missing.csv"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("partial.csv"));
        let records = vec![
            record(0, "Ada", "engines", "text a"),
            record(2, "Linus", "kernels", "text b"),
        ];

        store.save(&columns(), &records).unwrap();
        let checkpoint = store.load().unwrap().expect("checkpoint exists");

        assert_eq!(checkpoint.records, records);
        assert_eq!(
            checkpoint.done_indices(),
            [0, 2].into_iter().collect()
        );
    }

    #[test]
    fn test_save_is_full_overwrite() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("partial.csv"));

        store
            .save(
                &columns(),
                &[
                    record(0, "Ada", "engines", "a"),
                    record(1, "Grace", "compilers", "b"),
                ],
            )
            .unwrap();
        store.save(&columns(), &[record(5, "Ada", "engines", "c")]).unwrap();

        let checkpoint = store.load().unwrap().unwrap();
        assert_eq!(checkpoint.records, vec![record(5, "Ada", "engines", "c")]);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("partial.csv"));
        store.save(&columns(), &[record(0, "Ada", "engines", "a")]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, ["partial.csv"]);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("partial.csv"));
        store.save(&columns(), &[record(0, "Ada", "engines", "a")]).unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_clear_when_absent_is_noop() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("never-created.csv"));
        store.clear().unwrap();
        store.clear().unwrap();
    }

    #[test]
    fn test_load_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.csv");
        fs::write(&path, "name,topic\nAda,engines\n").unwrap();

        let store = CheckpointStore::new(&path);
        assert!(matches!(store.load(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_save_empty_records_writes_header_only() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("partial.csv"));
        store.save(&columns(), &[]).unwrap();

        let checkpoint = store.load().unwrap().unwrap();
        assert!(checkpoint.records.is_empty());
    }
}
