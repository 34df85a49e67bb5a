use crate::tags::TagStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ALL_FILTER: &str = "All";

/// Fuzzy similarity score a record needs to reach (inclusive) to be kept.
pub const FUZZY_ACCEPT_THRESHOLD: u8 = 65;

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_MAX_IMAGES_PER_DOCUMENT: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileType {
    #[serde(rename = "txt")]
    Text,
    #[serde(rename = "docx")]
    WordProcessor,
    #[serde(rename = "pdf")]
    Pdf,
}

impl FileType {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Text => "txt",
            FileType::WordProcessor => "docx",
            FileType::Pdf => "pdf",
        }
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "txt" => Ok(FileType::Text),
            "docx" => Ok(FileType::WordProcessor),
            "pdf" => Ok(FileType::Pdf),
            other => Err(format!("unknown file type `{other}` (expected txt, docx or pdf)")),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Granularity {
    Document,
    #[default]
    Chunk,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Granularity::Document),
            "chunk" => Ok(Granularity::Chunk),
            other => Err(format!("unknown granularity `{other}` (expected document or chunk)")),
        }
    }
}

/// `created` and `category` are only set in [`Granularity::Document`] mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub filename: String,
    pub filetype: FileType,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_paths: Vec<PathBuf>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
}

impl DocumentRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    pub id: u64,
    #[serde(flatten)]
    pub record: DocumentRecord,
}

/// Partial record used by [`crate::RecordStore::update`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub tags: Option<Vec<String>>,
    pub category: Option<Option<String>>,
}

impl RecordPatch {
    pub fn apply(&self, record: &mut DocumentRecord) {
        if let Some(tags) = &self.tags {
            record.tags = crate::tags::dedup_preserving_order(tags.iter().cloned());
        }
        if let Some(category) = &self.category {
            record.category = category.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub filename: String,
    pub matched_text: String,
    pub line_number: Option<usize>,
    pub tags: Vec<String>,
    pub score: u8,
    pub image_paths: Vec<PathBuf>,
    pub spans: Vec<MatchSpan>,
}

impl QueryResult {
    pub fn highlighted(&self, open: &str, close: &str) -> String {
        let mut out = String::with_capacity(self.matched_text.len());
        let mut cursor = 0;
        for span in &self.spans {
            if span.start < cursor || span.end > self.matched_text.len() {
                continue;
            }
            out.push_str(&self.matched_text[cursor..span.start]);
            out.push_str(open);
            out.push_str(&self.matched_text[span.start..span.end]);
            out.push_str(close);
            cursor = span.end;
        }
        out.push_str(&self.matched_text[cursor..]);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub tag: Option<String>,
    pub filetype: Option<FileType>,
    pub case_sensitive: bool,
    pub regex: bool,
}

impl SearchFilters {
    pub fn from_selection(tag: &str, filetype: &str) -> Result<Self, String> {
        let tag = match tag.trim() {
            "" | ALL_FILTER => None,
            value => Some(value.to_string()),
        };
        let filetype = match filetype.trim() {
            "" | ALL_FILTER => None,
            value => Some(value.parse()?),
        };

        Ok(Self {
            tag,
            filetype,
            ..Self::default()
        })
    }

    pub fn accepts(&self, record: &DocumentRecord) -> bool {
        if let Some(tag) = &self.tag {
            if !record.has_tag(tag) {
                return false;
            }
        }
        if let Some(filetype) = self.filetype {
            if record.filetype != filetype {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexPreset {
    Email,
    Phone,
}

impl RegexPreset {
    pub fn pattern(&self) -> &'static str {
        match self {
            RegexPreset::Email => r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            RegexPreset::Phone => r"\b\d{3}-\d{3}-\d{4}\b",
        }
    }
}

impl FromStr for RegexPreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(RegexPreset::Email),
            "phone" => Ok(RegexPreset::Phone),
            other => Err(format!("unknown preset `{other}` (expected email or phone)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub granularity: Granularity,
    pub image_dir: PathBuf,
    pub max_images_per_document: usize,
    pub tag_strategy: TagStrategy,
    pub category: Option<String>,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::Chunk,
            image_dir: PathBuf::from("images"),
            max_images_per_document: DEFAULT_MAX_IMAGES_PER_DOCUMENT,
            tag_strategy: TagStrategy::Frequency,
            category: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub max_results: usize,
    pub page_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
