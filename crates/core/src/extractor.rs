use crate::chunking::chunk_sections;
use crate::docx::{DocxPackage, EmbeddedImage};
use crate::error::ExtractError;
use crate::models::FileType;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct PdfContent {
    pub pages: Vec<PageText>,
    pub images: Vec<EmbeddedImage>,
}

pub trait PdfExtractor {
    fn extract(&self, path: &Path, image_limit: usize) -> Result<PdfContent, ExtractError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract(&self, path: &Path, image_limit: usize) -> Result<PdfContent, ExtractError> {
        let document =
            Document::load(path).map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        let mut content = PdfContent::default();
        for (page_no, page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                content.pages.push(PageText {
                    number: page_no,
                    text,
                });
            }

            for image in page_images(&document, page_id) {
                if content.images.len() >= image_limit {
                    break;
                }
                content.images.push(image);
            }
        }

        Ok(content)
    }
}

fn page_images(document: &Document, page_id: ObjectId) -> Vec<EmbeddedImage> {
    let Some(xobjects) = document
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| dictionary_entry(document, page, b"Resources"))
        .and_then(|resources| dictionary_entry(document, resources, b"XObject"))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, object)| match resolve(document, object) {
            Some(Object::Stream(stream)) => Some(stream),
            _ => None,
        })
        .filter(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|subtype| subtype == b"Image")
        })
        .map(|stream| EmbeddedImage {
            extension: image_extension(&stream.dict).to_string(),
            bytes: stream.content.clone(),
        })
        .collect()
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn dictionary_entry<'a>(
    document: &'a Document,
    dictionary: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    dictionary
        .get(key)
        .ok()
        .and_then(|object| resolve(document, object))
        .and_then(|object| object.as_dict().ok())
}

/// Encoded image streams are written as-is; only self-contained formats keep a real extension.
fn image_extension(dict: &Dictionary) -> &'static str {
    let filters = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok())
            .collect(),
        _ => Vec::new(),
    };

    match filters.last() {
        Some(&b"DCTDecode") => "jpg",
        Some(&b"JPXDecode") => "jp2",
        _ => "bin",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub filetype: FileType,
    pub sections: Vec<String>,
    pub image_paths: Vec<PathBuf>,
}

impl ExtractedDocument {
    pub fn text(&self) -> String {
        self.sections.join("\n")
    }

    pub fn chunks(&self) -> impl Iterator<Item = String> + '_ {
        chunk_sections(self.filetype, &self.sections)
    }
}

pub struct Extractor {
    image_dir: PathBuf,
    max_images: usize,
    pdf: Box<dyn PdfExtractor + Send + Sync>,
}

impl Extractor {
    pub fn new(image_dir: impl Into<PathBuf>, max_images: usize) -> Self {
        Self {
            image_dir: image_dir.into(),
            max_images,
            pdf: Box::new(LopdfExtractor),
        }
    }

    pub fn with_pdf_extractor(mut self, pdf: impl PdfExtractor + Send + Sync + 'static) -> Self {
        self.pdf = Box::new(pdf);
        self
    }

    /// Images are written as `{document_id}_img{index}.{ext}`, only after parsing succeeded.
    pub fn extract(
        &self,
        path: &Path,
        filetype: FileType,
        document_id: &str,
    ) -> Result<ExtractedDocument, ExtractError> {
        let (sections, images) = match filetype {
            FileType::Text => {
                let bytes = fs::read(path)?;
                (vec![String::from_utf8_lossy(&bytes).into_owned()], Vec::new())
            }
            FileType::WordProcessor => {
                let mut package = DocxPackage::from_bytes(fs::read(path)?)?;
                let paragraphs = package.paragraphs()?;
                let images = package.images(self.max_images)?;
                (paragraphs, images)
            }
            FileType::Pdf => {
                let content = self.pdf.extract(path, self.max_images)?;
                let pages = content.pages.into_iter().map(|page| page.text).collect();
                (pages, content.images)
            }
        };

        debug!(
            path = %path.display(),
            sections = sections.len(),
            images = images.len(),
            "extracted document"
        );

        Ok(ExtractedDocument {
            filetype,
            sections,
            image_paths: self.write_images(document_id, images),
        })
    }

    fn write_images(&self, document_id: &str, images: Vec<EmbeddedImage>) -> Vec<PathBuf> {
        if images.is_empty() {
            return Vec::new();
        }

        if let Err(error) = fs::create_dir_all(&self.image_dir) {
            warn!(dir = %self.image_dir.display(), %error, "cannot create image directory");
            return Vec::new();
        }

        let mut written = Vec::new();
        for image in images.into_iter().take(self.max_images) {
            let path = self.image_dir.join(format!(
                "{document_id}_img{}.{}",
                written.len(),
                image.extension
            ));
            match fs::write(&path, &image.bytes) {
                Ok(()) => written.push(path),
                Err(error) => warn!(path = %path.display(), %error, "failed to write image"),
            }
        }
        written
    }
}
