use crate::chunking::split_sentences;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

pub const MAX_TAGS: usize = 5;

/// Content tokens shorter than this many characters never become tags.
pub const MIN_TAG_TOKEN_CHARS: usize = 4;

/// English stopword list (the NLTK corpus).
pub const STOPWORDS: [&str; 179] = [
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagStrategy {
    #[default]
    Frequency,
    /// Highest tf-idf weight, using the text's sentences as the corpus.
    Weighted,
}

impl FromStr for TagStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "frequency" => Ok(TagStrategy::Frequency),
            "weighted" => Ok(TagStrategy::Weighted),
            other => Err(format!("unknown tag strategy `{other}` (expected frequency or weighted)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagGenerator {
    strategy: TagStrategy,
    stopwords: HashSet<&'static str>,
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new(TagStrategy::default())
    }
}

impl TagGenerator {
    pub fn new(strategy: TagStrategy) -> Self {
        Self {
            strategy,
            stopwords: STOPWORDS.iter().copied().collect(),
        }
    }

    pub fn strategy(&self) -> TagStrategy {
        self.strategy
    }

    /// Up to [`MAX_TAGS`] content keywords followed by the filename tokens.
    pub fn generate(&self, text: &str, filename: Option<&str>) -> Vec<String> {
        let content = match self.strategy {
            TagStrategy::Frequency => self.by_frequency(text),
            TagStrategy::Weighted => self.by_weight(text),
        };

        let filename_tokens = filename.map(filename_tokens).unwrap_or_default();
        dedup_preserving_order(content.into_iter().chain(filename_tokens))
    }

    fn content_words(&self, text: &str) -> Vec<String> {
        word_tokens(&text.to_lowercase())
            .filter(|token| token.chars().all(char::is_alphabetic))
            .map(str::to_string)
            .filter(|token| token.chars().count() >= MIN_TAG_TOKEN_CHARS)
            .filter(|token| !self.stopwords.contains(token.as_str()))
            .collect()
    }

    fn by_frequency(&self, text: &str) -> Vec<String> {
        let words = self.content_words(text);
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, word) in words.iter().enumerate() {
            counts.entry(word.as_str()).or_insert((0, position)).0 += 1;
        }

        let mut ranked = counts.into_iter().collect::<Vec<_>>();
        ranked.sort_by(|(_, (left_count, left_first)), (_, (right_count, right_first))| {
            right_count
                .cmp(left_count)
                .then_with(|| left_first.cmp(right_first))
        });

        ranked
            .into_iter()
            .take(MAX_TAGS)
            .map(|(word, _)| word.to_string())
            .collect()
    }

    fn by_weight(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text)
            .map(|sentence| self.content_words(sentence))
            .filter(|words| !words.is_empty())
            .collect::<Vec<_>>();
        if sentences.is_empty() {
            return Vec::new();
        }

        let total_terms = sentences.iter().map(Vec::len).sum::<usize>() as f64;
        let corpus_size = sentences.len() as f64;

        // term -> (term frequency, document frequency, first position)
        let mut stats: HashMap<&str, (usize, usize, usize)> = HashMap::new();
        let mut position = 0usize;
        for words in &sentences {
            let mut seen_here = HashSet::new();
            for word in words {
                let entry = stats.entry(word.as_str()).or_insert((0, 0, position));
                entry.0 += 1;
                if seen_here.insert(word.as_str()) {
                    entry.1 += 1;
                }
                position += 1;
            }
        }

        let mut weighted = stats
            .into_iter()
            .map(|(term, (tf, df, first))| {
                let idf = ((1.0 + corpus_size) / (1.0 + df as f64)).ln() + 1.0;
                (term, (tf as f64 / total_terms) * idf, first)
            })
            .filter(|(_, weight, _)| *weight > 0.0)
            .collect::<Vec<_>>();

        weighted.sort_by(|left, right| right.1.total_cmp(&left.1).then_with(|| left.2.cmp(&right.2)));

        weighted
            .into_iter()
            .take(MAX_TAGS)
            .map(|(term, _, _)| term.to_string())
            .collect()
    }
}

pub fn filename_tokens(filename: &str) -> Vec<String> {
    word_tokens(&filename.to_lowercase())
        .map(str::to_string)
        .collect()
}

pub fn dedup_preserving_order(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

fn word_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
}
