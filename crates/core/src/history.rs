use std::collections::VecDeque;
use std::fs;
use std::path::Path;

pub const DEFAULT_HISTORY_CAP: usize = 20;

/// Past queries, most recent first, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAP)
    }
}

impl ChatHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() || self.entries.iter().any(|entry| entry == query) {
            return false;
        }

        self.entries.push_front(query.to_string());
        self.entries.truncate(self.capacity);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Queries containing `needle`, ignoring case. An empty needle keeps every query.
    pub fn filter(&self, needle: &str) -> Vec<&str> {
        let needle = needle.trim().to_lowercase();
        self.iter()
            .filter(|query| query.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn export(&self, path: &Path) -> std::io::Result<()> {
        let mut out = String::new();
        for query in self.entries.iter().rev() {
            out.push_str(query);
            out.push('\n');
        }
        fs::write(path, out)
    }
}
