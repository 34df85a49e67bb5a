use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("docx archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("docx xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("docx is missing part: {0}")]
    MissingPart(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("folder does not exist: {0}")]
    MissingFolder(PathBuf),

    #[error("extraction failed for {filename}: {source}")]
    Extraction {
        filename: String,
        #[source]
        source: ExtractError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("indexing {} panicked: {message}", path.display())]
    Panicked { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record store at {path} is corrupted: {details}")]
    Corrupted { path: PathBuf, details: String },

    #[error("record store is read-only")]
    ReadOnly,
}

#[derive(Debug, Error)]
pub enum SynonymError {
    #[error("synonym group is empty")]
    EmptyInput,

    #[error("a synonym group needs at least two words, got {0}")]
    TooFewWords(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FaqError {
    #[error("faq {0} must not be empty")]
    EmptyField(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("index worker has stopped")]
    Stopped,
}
