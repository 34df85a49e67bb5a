use crate::error::{IndexError, StoreError};
use crate::extractor::{ExtractedDocument, Extractor};
use crate::models::{DocumentRecord, FileType, Granularity, IndexerOptions, RecordPatch};
use crate::tags::TagGenerator;
use crate::traits::RecordStore;
use chrono::Utc;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if FileType::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed { records: usize },
    /// A record with the same filename already exists; nothing was written.
    Duplicate,
    /// The document parsed but yielded no records. Its images were removed again.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IndexingReport {
    pub indexed: usize,
    pub duplicates: usize,
    pub empty: usize,
    pub failed: Vec<FailedDocument>,
}

pub struct Indexer<S>
where
    S: RecordStore,
{
    store: Arc<S>,
    extractor: Extractor,
    tags: TagGenerator,
    options: IndexerOptions,
}

impl<S> Indexer<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>, options: IndexerOptions) -> Self {
        let extractor = Extractor::new(options.image_dir.clone(), options.max_images_per_document);
        Self {
            store,
            extractor,
            tags: TagGenerator::new(options.tag_strategy),
            options,
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Known filenames are skipped without reading the file. A panic while parsing is reported
    /// as [`IndexError::Panicked`].
    pub fn index(&self, path: &Path) -> Result<IndexOutcome, IndexError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.index_document(path))).unwrap_or_else(
            |payload| {
                let message = panic_message(&*payload);
                error!(path = %path.display(), %message, "indexing panicked");
                Err(IndexError::Panicked {
                    path: path.to_path_buf(),
                    message,
                })
            },
        )
    }

    fn index_document(&self, path: &Path) -> Result<IndexOutcome, IndexError> {
        let filename = file_name(path)?;
        if self.store.contains_filename(&filename)? {
            debug!(filename = %filename, "already indexed");
            return Ok(IndexOutcome::Duplicate);
        }

        let filetype = FileType::from_path(path)
            .ok_or_else(|| IndexError::UnsupportedFileType(path.display().to_string()))?;

        let document_id = Uuid::new_v4().to_string();
        let extracted = self
            .extractor
            .extract(path, filetype, &document_id)
            .map_err(|source| IndexError::Extraction {
                filename: filename.clone(),
                source,
            })?;

        let records = self.build_records(&filename, &extracted);
        if records.is_empty() {
            remove_images(&extracted.image_paths);
            warn!(filename = %filename, "document produced no indexable text");
            return Ok(IndexOutcome::Empty);
        }

        let inserted = match self.store.insert_batch(records) {
            Ok(ids) => ids.len(),
            Err(error) => {
                remove_images(&extracted.image_paths);
                return Err(error.into());
            }
        };
        info!(
            filename = %filename,
            filetype = %filetype,
            records = inserted,
            images = extracted.image_paths.len(),
            "document indexed"
        );
        Ok(IndexOutcome::Indexed { records: inserted })
    }

    fn build_records(&self, filename: &str, extracted: &ExtractedDocument) -> Vec<DocumentRecord> {
        let record = |text: String, created, category| DocumentRecord {
            tags: self.tags.generate(&text, Some(filename)),
            filename: filename.to_string(),
            filetype: extracted.filetype,
            text,
            image_paths: extracted.image_paths.clone(),
            created,
            category,
        };

        match self.options.granularity {
            Granularity::Document => vec![record(
                extracted.text(),
                Some(Utc::now()),
                self.options.category.clone(),
            )],
            Granularity::Chunk => extracted
                .chunks()
                .map(|chunk| record(chunk, None, None))
                .collect(),
        }
    }

    /// Indexes every supported file under `folder`. Failures of single files are recorded in
    /// the report; only store errors abort the batch.
    pub fn index_folder(&self, folder: &Path) -> Result<IndexingReport, IndexError> {
        if !folder.is_dir() {
            return Err(IndexError::MissingFolder(folder.to_path_buf()));
        }

        let mut report = IndexingReport::default();
        for path in discover_documents(folder) {
            match self.index(&path) {
                Ok(IndexOutcome::Indexed { .. }) => report.indexed += 1,
                Ok(IndexOutcome::Duplicate) => report.duplicates += 1,
                Ok(IndexOutcome::Empty) => report.empty += 1,
                Err(IndexError::Store(error)) => return Err(error.into()),
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipped document");
                    report.failed.push(FailedDocument {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            folder = %folder.display(),
            indexed = report.indexed,
            duplicates = report.duplicates,
            empty = report.empty,
            failed = report.failed.len(),
            "folder indexed"
        );
        Ok(report)
    }

    pub fn indexed_documents(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .all()?
            .into_iter()
            .map(|stored| stored.record.filename)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    pub fn all_tags(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .all()?
            .into_iter()
            .flat_map(|stored| stored.record.tags)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    pub fn delete_document(&self, filename: &str) -> Result<usize, StoreError> {
        let images = self
            .store
            .search(&|record| record.filename == filename)?
            .into_iter()
            .flat_map(|stored| stored.record.image_paths)
            .collect::<BTreeSet<_>>();

        remove_images(&images);
        let removed = self.store.remove(&|record| record.filename == filename)?;
        info!(filename = %filename, records = removed, images = images.len(), "document deleted");
        Ok(removed)
    }

    pub fn regenerate_tags(&self, filename: &str) -> Result<usize, StoreError> {
        let mut tags_by_text: HashMap<String, Vec<String>> = HashMap::new();
        for stored in self.store.search(&|record| record.filename == filename)? {
            let text = stored.record.text;
            if !tags_by_text.contains_key(&text) {
                let tags = self.tags.generate(&text, Some(filename));
                tags_by_text.insert(text, tags);
            }
        }

        let mut updated = 0;
        for (text, tags) in tags_by_text {
            let patch = RecordPatch {
                tags: Some(tags),
                ..RecordPatch::default()
            };
            updated += self
                .store
                .update(&patch, &|record| record.filename == filename && record.text == text)?;
        }

        info!(filename = %filename, records = updated, strategy = ?self.tags.strategy(), "tags regenerated");
        Ok(updated)
    }
}

fn remove_images<'a>(images: impl IntoIterator<Item = &'a PathBuf>) {
    for image in images {
        match fs::remove_file(image) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => warn!(path = %image.display(), %error, "failed to remove image"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn file_name(path: &Path) -> Result<String, IndexError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IndexError::MissingFileName(path.display().to_string()))
}
