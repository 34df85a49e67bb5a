use crate::models::FileType;

/// Sentence chunks of a PDF page shorter than this many characters are dropped.
pub const MIN_SENTENCE_CHARS: usize = 20;

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

pub fn split_sentences(text: &str) -> Sentences<'_> {
    Sentences { rest: text }
}

pub struct Sentences<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Sentences<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.trim().is_empty() {
                self.rest = "";
                return None;
            }

            let mut chars = self.rest.char_indices().peekable();
            let mut boundary = None;
            while let Some((index, ch)) = chars.next() {
                if matches!(ch, '.' | '!' | '?') {
                    let at_break = chars
                        .peek()
                        .map_or(true, |(_, following)| following.is_whitespace());
                    if at_break {
                        boundary = Some(index + ch.len_utf8());
                        break;
                    }
                }
            }

            let end = boundary.unwrap_or(self.rest.len());
            let sentence = self.rest[..end].trim();
            self.rest = &self.rest[end..];
            if !sentence.is_empty() {
                return Some(sentence);
            }
        }
    }
}

pub fn split_paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
}

pub fn chunk_sections<'a>(
    filetype: FileType,
    sections: &'a [String],
) -> Box<dyn Iterator<Item = String> + 'a> {
    match filetype {
        FileType::Text => Box::new(
            sections
                .iter()
                .flat_map(|section| section.lines())
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        ),
        FileType::WordProcessor => Box::new(
            sections
                .iter()
                .map(|paragraph| paragraph.trim())
                .filter(|paragraph| !paragraph.is_empty())
                .map(str::to_string),
        ),
        FileType::Pdf => Box::new(
            sections
                .iter()
                .flat_map(|page| split_paragraphs(page))
                .flat_map(split_sentences)
                .filter(|sentence| sentence.chars().count() >= MIN_SENTENCE_CHARS)
                .map(str::to_string),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        let normalized = normalize_whitespace(input);
        assert_eq!(normalized, "A lot of spacing");
    }

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let sentences = split_sentences("Version 2.5 ships today. Does it work? Yes!  Trailing")
            .collect::<Vec<_>>();
        assert_eq!(
            sentences,
            vec!["Version 2.5 ships today.", "Does it work?", "Yes!", "Trailing"]
        );
    }

    #[test]
    fn text_chunks_are_non_empty_lines() {
        let sections = vec!["first line\n\n   \n  second line  \n".to_string()];
        let chunks = chunk_sections(FileType::Text, &sections).collect::<Vec<_>>();
        assert_eq!(chunks, vec!["first line", "second line"]);
    }

    #[test]
    fn pdf_chunks_drop_short_sentences() {
        let sections = vec![
            "Short one. This sentence is comfortably long enough.\n\nTiny.".to_string(),
            "Second page holds another long sentence here.".to_string(),
        ];
        let chunks = chunk_sections(FileType::Pdf, &sections).collect::<Vec<_>>();
        assert_eq!(
            chunks,
            vec![
                "This sentence is comfortably long enough.",
                "Second page holds another long sentence here.",
            ]
        );
    }

    #[test]
    fn chunking_is_restartable() {
        let sections = vec!["Alpha paragraph".to_string(), " ".to_string(), "Beta".to_string()];
        let first = chunk_sections(FileType::WordProcessor, &sections).collect::<Vec<_>>();
        let second = chunk_sections(FileType::WordProcessor, &sections).collect::<Vec<_>>();
        assert_eq!(first, vec!["Alpha paragraph", "Beta"]);
        assert_eq!(first, second);
    }
}
