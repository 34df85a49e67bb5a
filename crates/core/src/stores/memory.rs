//! In-memory [`RecordStore`] for tests and for running without a readable store file.

use super::Table;
use crate::error::StoreError;
use crate::models::{DocumentRecord, RecordPatch, StoredRecord};
use crate::traits::{RecordPredicate, RecordStore};
use parking_lot::RwLock;

#[derive(Default)]
pub struct MemoryRecordStore {
    table: RwLock<Table>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, record: DocumentRecord) -> Result<u64, StoreError> {
        Ok(self.table.write().insert(record))
    }

    fn insert_batch(&self, records: Vec<DocumentRecord>) -> Result<Vec<u64>, StoreError> {
        let mut table = self.table.write();
        Ok(records.into_iter().map(|record| table.insert(record)).collect())
    }

    fn all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self.table.read().records().to_vec())
    }

    fn remove(&self, predicate: RecordPredicate<'_>) -> Result<usize, StoreError> {
        Ok(self.table.write().remove(predicate))
    }

    fn update(
        &self,
        patch: &RecordPatch,
        predicate: RecordPredicate<'_>,
    ) -> Result<usize, StoreError> {
        Ok(self.table.write().update(patch, predicate))
    }
}
