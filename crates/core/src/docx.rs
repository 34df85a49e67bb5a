use crate::error::ExtractError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";
/// Maximum decompressed bytes read from a single archive entry.
const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

pub struct DocxPackage {
    archive: zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl DocxPackage {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ExtractError> {
        Ok(Self {
            archive: zip::ZipArchive::new(Cursor::new(bytes))?,
        })
    }

    pub fn paragraphs(&mut self) -> Result<Vec<String>, ExtractError> {
        let xml = self
            .read_entry(DOCUMENT_PART)?
            .ok_or_else(|| ExtractError::MissingPart(DOCUMENT_PART.to_string()))?;
        parse_paragraphs(&xml)
    }

    /// Unreadable image parts are skipped.
    pub fn images(&mut self, limit: usize) -> Result<Vec<EmbeddedImage>, ExtractError> {
        let Some(rels) = self.read_entry(RELATIONSHIPS_PART)? else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for target in image_targets(&rels)? {
            if images.len() >= limit {
                break;
            }

            let part = resolve_target(&target);
            match self.read_entry(&part) {
                Ok(Some(bytes)) => images.push(EmbeddedImage {
                    extension: extension_of(&target),
                    bytes,
                }),
                Ok(None) => tracing::warn!(part = %part, "docx image part missing"),
                Err(error) => tracing::warn!(part = %part, %error, "docx image part unreadable"),
            }
        }

        Ok(images)
    }

    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, ExtractError> {
        let entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let mut out = Vec::new();
        entry.take(MAX_ENTRY_BYTES).read_to_end(&mut out)?;
        if out.len() as u64 >= MAX_ENTRY_BYTES {
            return Err(ExtractError::MissingPart(format!(
                "{name} exceeds size limit ({MAX_ENTRY_BYTES} bytes)"
            )));
        }
        Ok(Some(out))
    }
}

fn parse_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    // Text boxes nest whole paragraphs inside a run of the enclosing one.
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(element) => {
                if let Some(paragraph) = open.last_mut() {
                    match element.local_name().as_ref() {
                        b"tab" => paragraph.push('\t'),
                        b"br" | b"cr" => paragraph.push('\n'),
                        _ => {}
                    }
                }
                if element.local_name().as_ref() == b"p" {
                    paragraphs.push(String::new());
                }
            }
            Event::Text(text) if in_text => {
                if let Some(paragraph) = open.last_mut() {
                    paragraph.push_str(&text.unescape()?);
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(paragraph) = open.pop() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn image_targets(rels: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_reader(rels);
    reader.config_mut().trim_text(true);

    let mut targets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                let mut kind = None;
                let mut target = None;
                let mut external = false;
                for attribute in element.attributes().flatten() {
                    let value = attribute.unescape_value()?.into_owned();
                    match attribute.key.local_name().as_ref() {
                        b"Type" => kind = Some(value),
                        b"Target" => target = Some(value),
                        b"TargetMode" => external = value.eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }

                if let (Some(kind), Some(target)) = (kind, target) {
                    if kind.ends_with("/image") && !external {
                        targets.push(target);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => format!("word/{target}"),
    }
}

fn extension_of(target: &str) -> String {
    target
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && !ext.contains('/'))
        .unwrap_or_else(|| "bin".to_string())
}
