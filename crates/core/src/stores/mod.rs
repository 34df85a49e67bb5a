pub mod json;
pub mod memory;

pub use json::JsonRecordStore;
pub use memory::MemoryRecordStore;

use crate::models::{DocumentRecord, RecordPatch, StoredRecord};
use crate::traits::RecordPredicate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub(crate) struct Table {
    next_id: u64,
    records: Vec<StoredRecord>,
}

impl Table {
    pub(crate) fn insert(&mut self, record: DocumentRecord) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.records.push(StoredRecord { id, record });
        id
    }

    pub(crate) fn records(&self) -> &[StoredRecord] {
        &self.records
    }

    pub(crate) fn remove(&mut self, predicate: RecordPredicate<'_>) -> usize {
        let before = self.records.len();
        self.records.retain(|stored| !predicate(&stored.record));
        before - self.records.len()
    }

    pub(crate) fn update(&mut self, patch: &RecordPatch, predicate: RecordPredicate<'_>) -> usize {
        let mut updated = 0;
        for stored in self.records.iter_mut().filter(|stored| predicate(&stored.record)) {
            patch.apply(&mut stored.record);
            updated += 1;
        }
        updated
    }
}
