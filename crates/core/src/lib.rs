pub mod chunking;
pub mod docx;
pub mod error;
pub mod extractor;
pub mod faq;
pub mod fuzzy;
pub mod history;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod paginate;
pub mod stores;
pub mod synonyms;
pub mod tags;
pub mod traits;
pub mod worker;

pub use chunking::{chunk_sections, normalize_whitespace, split_sentences, MIN_SENTENCE_CHARS};
pub use error::{
    ExtractError, FaqError, IndexError, SearchError, StoreError, SynonymError, WorkerError,
};
pub use extractor::{ExtractedDocument, Extractor, LopdfExtractor, PageText, PdfExtractor};
pub use faq::{FaqBook, FaqEntry};
pub use fuzzy::partial_ratio;
pub use history::{ChatHistory, DEFAULT_HISTORY_CAP};
pub use ingest::{
    discover_documents, FailedDocument, IndexOutcome, Indexer, IndexingReport,
};
pub use models::{
    DocumentRecord, FileType, Granularity, IndexerOptions, MatchSpan, QueryResult, RecordPatch,
    RegexPreset, SearchFilters, SearchSettings, StoredRecord, ALL_FILTER,
    DEFAULT_MAX_IMAGES_PER_DOCUMENT, DEFAULT_MAX_RESULTS, DEFAULT_PAGE_SIZE,
    FUZZY_ACCEPT_THRESHOLD,
};
pub use orchestrator::{rank, SearchCoordinator, SearchOutcome, SearchSession};
pub use paginate::{group_by_document, paginate, total_pages, DocumentGroup, Page};
pub use stores::{JsonRecordStore, MemoryRecordStore};
pub use synonyms::SynonymDictionary;
pub use tags::{TagGenerator, TagStrategy, MAX_TAGS, MIN_TAG_TOKEN_CHARS};
pub use traits::{RecordPredicate, RecordStore};
pub use worker::{IndexWorker, TaskCompletion};
