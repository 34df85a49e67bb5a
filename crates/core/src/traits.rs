use crate::error::StoreError;
use crate::models::{DocumentRecord, RecordPatch, StoredRecord};

pub type RecordPredicate<'a> = &'a dyn Fn(&DocumentRecord) -> bool;

/// Readers never observe a half-applied mutation.
pub trait RecordStore: Send + Sync {
    fn insert(&self, record: DocumentRecord) -> Result<u64, StoreError>;

    fn insert_batch(&self, records: Vec<DocumentRecord>) -> Result<Vec<u64>, StoreError> {
        records.into_iter().map(|record| self.insert(record)).collect()
    }

    fn all(&self) -> Result<Vec<StoredRecord>, StoreError>;

    fn search(&self, predicate: RecordPredicate<'_>) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|stored| predicate(&stored.record))
            .collect())
    }

    fn remove(&self, predicate: RecordPredicate<'_>) -> Result<usize, StoreError>;

    fn update(&self, patch: &RecordPatch, predicate: RecordPredicate<'_>)
        -> Result<usize, StoreError>;

    fn contains_filename(&self, filename: &str) -> Result<bool, StoreError> {
        Ok(!self.search(&|record| record.filename == filename)?.is_empty())
    }
}
