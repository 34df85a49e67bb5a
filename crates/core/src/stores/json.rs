//! Single-file JSON [`RecordStore`]. Mutations rewrite the whole table through a temporary
//! file and a rename; the in-memory table is swapped only after the write succeeded.

use super::Table;
use crate::error::StoreError;
use crate::models::{DocumentRecord, RecordPatch, StoredRecord};
use crate::traits::{RecordPredicate, RecordStore};
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct JsonRecordStore {
    path: PathBuf,
    table: RwLock<Table>,
    // Serializes writers so readers are only blocked for the final swap.
    writer: Mutex<()>,
    read_only: bool,
}

impl JsonRecordStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = if path.exists() {
            load_table(&path)?
        } else {
            let table = Table::default();
            persist(&path, &table)?;
            table
        };

        Ok(Self {
            path,
            table: RwLock::new(table),
            writer: Mutex::new(()),
            read_only: false,
        })
    }

    pub fn open_or_reset(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        match Self::open(&path) {
            Err(StoreError::Corrupted { details, .. }) => {
                warn!(path = %path.display(), %details, "resetting corrupted record store");
                Self::reset(path)
            }
            other => other,
        }
    }

    pub fn reset(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = Table::default();
        persist(&path, &table)?;
        info!(path = %path.display(), "record store reset");

        Ok(Self {
            path,
            table: RwLock::new(table),
            writer: Mutex::new(()),
            read_only: false,
        })
    }

    /// An empty store that rejects every write, for when the file at `path` is unreadable and
    /// must not be touched.
    pub fn degraded(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: RwLock::new(Table::default()),
            writer: Mutex::new(()),
            read_only: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut Table) -> T) -> Result<T, StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }

        let _writer = self.writer.lock();
        let mut next = self.table.read().clone();
        let outcome = change(&mut next);
        persist(&self.path, &next)?;
        *self.table.write() = next;
        Ok(outcome)
    }
}

impl RecordStore for JsonRecordStore {
    fn insert(&self, record: DocumentRecord) -> Result<u64, StoreError> {
        self.mutate(|table| table.insert(record))
    }

    fn insert_batch(&self, records: Vec<DocumentRecord>) -> Result<Vec<u64>, StoreError> {
        self.mutate(|table| {
            records
                .into_iter()
                .map(|record| table.insert(record))
                .collect()
        })
    }

    fn all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self.table.read().records().to_vec())
    }

    fn remove(&self, predicate: RecordPredicate<'_>) -> Result<usize, StoreError> {
        self.mutate(|table| table.remove(predicate))
    }

    fn update(
        &self,
        patch: &RecordPatch,
        predicate: RecordPredicate<'_>,
    ) -> Result<usize, StoreError> {
        self.mutate(|table| table.update(patch, predicate))
    }
}

fn load_table(path: &Path) -> Result<Table, StoreError> {
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Table::default());
    }

    serde_json::from_str(&raw).map_err(|error| StoreError::Corrupted {
        path: path.to_path_buf(),
        details: error.to_string(),
    })
}

fn persist(path: &Path, table: &Table) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, serde_json::to_vec_pretty(table)?)?;
    fs::rename(&staging, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileType;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn record(filename: &str) -> DocumentRecord {
        DocumentRecord {
            filename: filename.to_string(),
            filetype: FileType::Pdf,
            text: "Returns are accepted within thirty days.".to_string(),
            tags: vec!["returns".to_string()],
            image_paths: vec![PathBuf::from("images/x_img0.jpg")],
            created: None,
            category: Some("policy".to_string()),
        }
    }

    #[test]
    fn records_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("data").join("knowledge_db.json");

        let store = JsonRecordStore::open(&path)?;
        store.insert_batch(vec![record("a.pdf"), record("b.pdf")])?;
        store.insert(record("c.pdf"))?;
        drop(store);

        let reopened = JsonRecordStore::open(&path)?;
        let all = reopened.all()?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].id, 3);
        assert_eq!(all[0].record, record("a.pdf"));
        assert_eq!(reopened.insert(record("d.pdf"))?, 4);
        Ok(())
    }

    #[test]
    fn corrupted_file_is_reported_and_can_be_reset() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("knowledge_db.json");
        fs::write(&path, b"{not json")?;

        assert!(matches!(
            JsonRecordStore::open(&path),
            Err(StoreError::Corrupted { .. })
        ));

        let store = JsonRecordStore::open_or_reset(&path)?;
        assert!(store.all()?.is_empty());
        store.insert(record("a.pdf"))?;
        assert_eq!(JsonRecordStore::open(&path)?.all()?.len(), 1);
        Ok(())
    }

    #[test]
    fn degraded_store_is_empty_and_read_only() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("knowledge_db.json");
        fs::write(&path, b"garbage")?;

        let store = JsonRecordStore::degraded(&path);
        assert!(store.all()?.is_empty());
        assert!(matches!(store.insert(record("a.pdf")), Err(StoreError::ReadOnly)));
        assert_eq!(fs::read(&path)?, b"garbage");
        Ok(())
    }

    #[test]
    fn failed_persist_leaves_table_unchanged() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("store").join("knowledge_db.json");
        let store = JsonRecordStore::open(&path)?;
        store.insert(record("a.pdf"))?;

        fs::remove_dir_all(dir.path().join("store"))?;
        fs::write(dir.path().join("store"), b"now a file")?;

        assert!(store.insert(record("b.pdf")).is_err());
        assert_eq!(store.all()?.len(), 1);
        Ok(())
    }

    #[test]
    fn reads_are_not_blocked_by_a_pending_write() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = JsonRecordStore::open(dir.path().join("knowledge_db.json"))?;
        store.insert(record("a.pdf"))?;

        let _writer = store.writer.lock();
        assert_eq!(store.all()?.len(), 1);
        assert!(store.contains_filename("a.pdf")?);
        Ok(())
    }

    #[test]
    fn concurrent_writers_do_not_lose_records() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("knowledge_db.json");
        let store = Arc::new(JsonRecordStore::open(&path)?);

        let handles = (0..4)
            .map(|worker| {
                let store = store.clone();
                thread::spawn(move || {
                    (0..5)
                        .map(|n| store.insert(record(&format!("{worker}-{n}.pdf"))))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().map_err(|_| "writer thread panicked")??;
        }

        let mut ids = store.all()?.into_iter().map(|stored| stored.id).collect::<Vec<_>>();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
        assert_eq!(JsonRecordStore::open(&path)?.all()?.len(), 20);
        Ok(())
    }
}
