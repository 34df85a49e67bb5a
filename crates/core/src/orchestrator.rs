use crate::error::SearchError;
use crate::fuzzy::partial_ratio;
use crate::history::ChatHistory;
use crate::models::{
    DocumentRecord, MatchSpan, QueryResult, SearchFilters, SearchSettings, FUZZY_ACCEPT_THRESHOLD,
};
use crate::paginate::{group_by_document, DocumentGroup};
use crate::synonyms::SynonymDictionary;
use crate::traits::RecordStore;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query: String,
    pub regex: bool,
    /// Expanded query in fuzzy mode, the raw pattern in regex mode.
    pub terms: Vec<String>,
    pub results: Vec<QueryResult>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn groups(&self) -> Vec<DocumentGroup<'_>> {
        group_by_document(&self.results)
    }
}

/// Regex mode yields one result per matching line with score 100. Equal scores keep record
/// order.
pub fn rank<'a>(
    query: &str,
    filters: &SearchFilters,
    records: impl IntoIterator<Item = &'a DocumentRecord>,
    synonyms: &SynonymDictionary,
    max_results: usize,
) -> Result<SearchOutcome, SearchError> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let candidates = records.into_iter().filter(|record| filters.accepts(record));
    let (terms, mut results) = if filters.regex {
        let pattern = RegexBuilder::new(query)
            .case_insensitive(!filters.case_sensitive)
            .build()?;
        (vec![query.to_string()], match_lines(&pattern, candidates))
    } else {
        let mut terms = synonyms.expand(query);
        if filters.case_sensitive {
            terms.extend(query.split_whitespace().map(str::to_string));
        }
        let terms = terms.into_iter().collect::<Vec<_>>();
        let results = match_fuzzy(&terms, filters.case_sensitive, candidates);
        (terms, results)
    };

    results.sort_by(|left, right| right.score.cmp(&left.score));
    results.truncate(max_results);
    debug!(query, hits = results.len(), regex = filters.regex, "ranked records");

    Ok(SearchOutcome {
        query: query.to_string(),
        regex: filters.regex,
        terms,
        results,
    })
}

fn match_lines<'a>(
    pattern: &Regex,
    records: impl Iterator<Item = &'a DocumentRecord>,
) -> Vec<QueryResult> {
    let mut results = Vec::new();
    for record in records {
        for (index, line) in record.text.lines().enumerate() {
            let spans = pattern
                .find_iter(line)
                .map(|found| MatchSpan {
                    start: found.start(),
                    end: found.end(),
                })
                .collect::<Vec<_>>();
            if spans.is_empty() {
                continue;
            }

            results.push(QueryResult {
                filename: record.filename.clone(),
                matched_text: line.to_string(),
                line_number: Some(index + 1),
                tags: record.tags.clone(),
                score: 100,
                image_paths: record.image_paths.clone(),
                spans,
            });
        }
    }
    results
}

fn match_fuzzy<'a>(
    terms: &[String],
    case_sensitive: bool,
    records: impl Iterator<Item = &'a DocumentRecord>,
) -> Vec<QueryResult> {
    let normalize = |value: &str| {
        if case_sensitive {
            value.to_string()
        } else {
            value.to_lowercase()
        }
    };
    let compared_terms = terms.iter().map(|term| normalize(term)).collect::<Vec<_>>();
    let highlighter = term_highlighter(terms, case_sensitive);

    let mut results = Vec::new();
    for record in records {
        let text = normalize(&record.text);
        let score = compared_terms
            .iter()
            .map(|term| partial_ratio(term, &text))
            .max()
            .unwrap_or(0);
        if score < FUZZY_ACCEPT_THRESHOLD {
            continue;
        }

        let spans = highlighter
            .as_ref()
            .map(|pattern| {
                pattern
                    .find_iter(&record.text)
                    .map(|found| MatchSpan {
                        start: found.start(),
                        end: found.end(),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        results.push(QueryResult {
            filename: record.filename.clone(),
            matched_text: record.text.clone(),
            line_number: None,
            tags: record.tags.clone(),
            score,
            image_paths: record.image_paths.clone(),
            spans,
        });
    }
    results
}

fn term_highlighter(terms: &[String], case_sensitive: bool) -> Option<Regex> {
    let mut literals = terms
        .iter()
        .filter(|term| !term.is_empty())
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>();
    if literals.is_empty() {
        return None;
    }
    literals.sort_by(|left, right| right.len().cmp(&left.len()));

    RegexBuilder::new(&literals.join("|"))
        .case_insensitive(!case_sensitive)
        .build()
        .ok()
}

pub struct SearchCoordinator<S>
where
    S: RecordStore,
{
    store: Arc<S>,
    settings: SearchSettings,
}

impl<S> SearchCoordinator<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>, settings: SearchSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> SearchSettings {
        self.settings
    }

    pub fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        synonyms: &SynonymDictionary,
    ) -> Result<SearchOutcome, SearchError> {
        let snapshot = self.store.all()?;
        rank(
            query,
            filters,
            snapshot.iter().map(|stored| &stored.record),
            synonyms,
            self.settings.max_results,
        )
    }
}

pub struct SearchSession<S>
where
    S: RecordStore,
{
    coordinator: SearchCoordinator<S>,
    history: ChatHistory,
    last: Option<SearchOutcome>,
}

impl<S> SearchSession<S>
where
    S: RecordStore,
{
    pub fn new(coordinator: SearchCoordinator<S>, history: ChatHistory) -> Self {
        Self {
            coordinator,
            history,
            last: None,
        }
    }

    /// Runs a search. On failure the previous outcome and the history are left untouched.
    pub fn run(
        &mut self,
        query: &str,
        filters: &SearchFilters,
        synonyms: &SynonymDictionary,
    ) -> Result<&SearchOutcome, SearchError> {
        let outcome = self.coordinator.search(query, filters, synonyms)?;
        self.history.push(query);
        Ok(self.last.insert(outcome))
    }

    pub fn last(&self) -> Option<&SearchOutcome> {
        self.last.as_ref()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ChatHistory {
        &mut self.history
    }

    pub fn settings(&self) -> SearchSettings {
        self.coordinator.settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileType;
    use crate::paginate::paginate;
    use crate::stores::MemoryRecordStore;

    fn record(filename: &str, filetype: FileType, text: &str, tags: &[&str]) -> DocumentRecord {
        DocumentRecord {
            filename: filename.to_string(),
            filetype,
            text: text.to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            image_paths: Vec::new(),
            created: None,
            category: None,
        }
    }

    fn regex_filters() -> SearchFilters {
        SearchFilters {
            regex: true,
            ..SearchFilters::default()
        }
    }

    const EMAIL: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

    #[test]
    fn regex_matches_report_line_numbers() -> Result<(), SearchError> {
        let records = vec![
            record("a.txt", FileType::Text, "contact a@b.com", &[]),
            record("b.txt", FileType::Text, "no email here", &[]),
        ];

        let outcome = rank(
            EMAIL,
            &regex_filters(),
            &records,
            &SynonymDictionary::default(),
            10,
        )?;

        assert_eq!(outcome.results.len(), 1);
        let hit = &outcome.results[0];
        assert_eq!(hit.filename, "a.txt");
        assert_eq!(hit.line_number, Some(1));
        assert_eq!(hit.score, 100);
        assert_eq!(hit.highlighted("<b>", "</b>"), "contact <b>a@b.com</b>");
        Ok(())
    }

    #[test]
    fn regex_yields_one_result_per_matching_line() -> Result<(), SearchError> {
        let records = vec![record(
            "phones.txt",
            FileType::Text,
            "call 555-123-4567\nnothing\nor 555-987-6543",
            &[],
        )];

        let outcome = rank(
            r"\b\d{3}-\d{3}-\d{4}\b",
            &regex_filters(),
            &records,
            &SynonymDictionary::default(),
            10,
        )?;

        let lines = outcome
            .results
            .iter()
            .map(|result| result.line_number)
            .collect::<Vec<_>>();
        assert_eq!(lines, vec![Some(1), Some(3)]);
        Ok(())
    }

    #[test]
    fn regex_case_sensitivity_is_honoured() -> Result<(), SearchError> {
        let records = vec![record("a.txt", FileType::Text, "ERROR 42", &[])];
        let dictionary = SynonymDictionary::default();

        assert_eq!(rank("error", &regex_filters(), &records, &dictionary, 10)?.results.len(), 1);

        let sensitive = SearchFilters {
            case_sensitive: true,
            ..regex_filters()
        };
        assert!(rank("error", &sensitive, &records, &dictionary, 10)?.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let records = vec![record("a.txt", FileType::Text, "text", &[])];
        let result = rank("(", &regex_filters(), &records, &SynonymDictionary::default(), 10);
        assert!(matches!(result, Err(SearchError::InvalidPattern(_))));
    }

    #[test]
    fn empty_query_is_rejected() {
        let result = rank(
            "  ",
            &SearchFilters::default(),
            std::iter::empty(),
            &SynonymDictionary::default(),
            10,
        );
        assert!(matches!(result, Err(SearchError::EmptyQuery)));
    }

    #[test]
    fn fuzzy_threshold_is_inclusive() -> Result<(), SearchError> {
        let records = vec![
            record("at.txt", FileType::Text, "abcdefghijklmzzzzzzz", &[]),
            record("below.txt", FileType::Text, "abcdefghijklmnopzzzzzzzzz", &[]),
        ];
        let dictionary = SynonymDictionary::default();

        let at = rank("abcdefghijklmnopqrst", &SearchFilters::default(), &records[..1], &dictionary, 10)?;
        assert_eq!(at.results.len(), 1);
        assert_eq!(at.results[0].score, FUZZY_ACCEPT_THRESHOLD);

        let below = rank(
            "abcdefghijklmnopqrstuvwxy",
            &SearchFilters::default(),
            &records[1..],
            &dictionary,
            10,
        )?;
        assert!(below.is_empty());
        Ok(())
    }

    #[test]
    fn fuzzy_uses_synonyms_and_sorts_stably() -> Result<(), Box<dyn std::error::Error>> {
        let records = vec![
            record("a.txt", FileType::Text, "We reimburse customers quickly", &[]),
            record("b.txt", FileType::Text, "Nothing relevant at all", &[]),
            record("c.txt", FileType::Text, "Refund requests go to billing", &[]),
            record("d.txt", FileType::Text, "Another refund note", &[]),
        ];
        let mut dictionary = SynonymDictionary::default();
        dictionary.add_group("refund, reimburse")?;

        let outcome = rank("refund", &SearchFilters::default(), &records, &dictionary, 10)?;

        let names = outcome
            .results
            .iter()
            .map(|result| result.filename.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.txt", "c.txt", "d.txt"]);
        assert!(outcome.results.iter().all(|result| result.score == 100));
        assert_eq!(outcome.terms, vec!["refund".to_string(), "reimburse".to_string()]);
        assert_eq!(outcome.results[1].highlighted("[", "]"), "[Refund] requests go to billing");
        Ok(())
    }

    #[test]
    fn results_are_truncated_to_max_results() -> Result<(), SearchError> {
        let records = (0..30)
            .map(|index| record(&format!("{index}.txt"), FileType::Text, "router manual", &[]))
            .collect::<Vec<_>>();

        let outcome = rank("router", &SearchFilters::default(), &records, &SynonymDictionary::default(), 7)?;
        assert_eq!(outcome.results.len(), 7);
        assert_eq!(outcome.results[0].filename, "0.txt");
        Ok(())
    }

    #[test]
    fn tag_and_filetype_filters_are_conjunctive() -> Result<(), SearchError> {
        let records = vec![
            record("guide.pdf", FileType::Pdf, "router setup guide", &["pdf-tag"]),
            record("notes.txt", FileType::Text, "router setup notes", &["other"]),
        ];
        let dictionary = SynonymDictionary::default();

        let by_tag = SearchFilters::from_selection("pdf-tag", "All").unwrap();
        assert_eq!(rank("router", &by_tag, &records, &dictionary, 10)?.results.len(), 1);

        let by_type = SearchFilters::from_selection("All", "txt").unwrap();
        assert_eq!(rank("router", &by_type, &records, &dictionary, 10)?.results.len(), 1);

        let both = SearchFilters::from_selection("pdf-tag", "txt").unwrap();
        assert!(rank("router", &both, &records, &dictionary, 10)?.is_empty());
        Ok(())
    }

    #[test]
    fn session_keeps_previous_results_after_invalid_pattern() -> Result<(), SearchError> {
        let store = Arc::new(MemoryRecordStore::new());
        store.insert(record("a.txt", FileType::Text, "contact a@b.com", &[]))?;
        let coordinator = SearchCoordinator::new(store, SearchSettings::default());
        let mut session = SearchSession::new(coordinator, ChatHistory::default());
        let dictionary = SynonymDictionary::default();

        session.run(EMAIL, &regex_filters(), &dictionary)?;
        let before = session.last().cloned();

        let failed = session.run("(", &regex_filters(), &dictionary);
        assert!(matches!(failed, Err(SearchError::InvalidPattern(_))));
        assert_eq!(session.last().cloned(), before);
        assert_eq!(session.history().len(), 1);
        Ok(())
    }

    #[test]
    fn outcome_groups_and_pages_results() -> Result<(), SearchError> {
        let mut records = Vec::new();
        for index in 0..23 {
            let filename = if index % 2 == 0 { "even.txt" } else { "odd.txt" };
            records.push(record(filename, FileType::Text, &format!("router line {index}"), &[]));
        }

        let outcome = rank("router", &SearchFilters::default(), &records, &SynonymDictionary::default(), 50)?;
        let groups = outcome.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].filename, "even.txt");
        assert_eq!(groups[0].results.len(), 12);

        let page = paginate(&outcome.results, 5, 7);
        assert_eq!(page.total_pages, 5);
        assert_eq!(page.page_number, 5);
        assert_eq!(page.items.len(), 3);
        Ok(())
    }
}
