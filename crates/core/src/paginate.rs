use crate::models::QueryResult;

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGroup<'a> {
    pub filename: &'a str,
    pub results: Vec<&'a QueryResult>,
}

/// Groups keep first-seen order.
pub fn group_by_document(results: &[QueryResult]) -> Vec<DocumentGroup<'_>> {
    let mut groups: Vec<DocumentGroup<'_>> = Vec::new();
    for result in results {
        match groups
            .iter_mut()
            .find(|group| group.filename == result.filename)
        {
            Some(group) => group.results.push(result),
            None => groups.push(DocumentGroup {
                filename: &result.filename,
                results: vec![result],
            }),
        }
    }
    groups
}

#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page_number: usize,
    pub total_pages: usize,
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

/// `page_number` is clamped to `1..=total_pages`; a page size of zero is treated as one.
pub fn paginate<T>(items: &[T], page_size: usize, page_number: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len(), page_size);
    let page_number = page_number.clamp(1, total_pages.max(1));

    let start = ((page_number - 1) * page_size).min(items.len());
    let end = (start + page_size).min(items.len());

    Page {
        items: &items[start..end],
        page_number,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(filename: &str, score: u8) -> QueryResult {
        QueryResult {
            filename: filename.to_string(),
            matched_text: String::new(),
            line_number: None,
            tags: Vec::new(),
            score,
            image_paths: Vec::new(),
            spans: Vec::new(),
        }
    }

    #[test]
    fn groups_keep_first_seen_and_score_order() {
        let results = vec![result("b", 99), result("a", 90), result("b", 80), result("a", 70)];
        let groups = group_by_document(&results);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].filename, "b");
        assert_eq!(
            groups[0].results.iter().map(|r| r.score).collect::<Vec<_>>(),
            vec![99, 80]
        );
        assert_eq!(groups[1].filename, "a");
    }

    #[test]
    fn pages_are_clamped() {
        let items = (1..=23).collect::<Vec<_>>();

        let first = paginate(&items, 5, 1);
        assert_eq!(first.items, &[1, 2, 3, 4, 5]);
        assert_eq!(first.total_pages, 5);

        let last = paginate(&items, 5, 5);
        let beyond = paginate(&items, 5, 7);
        assert_eq!(beyond, last);
        assert_eq!(beyond.items, &[21, 22, 23]);

        assert_eq!(paginate(&items, 5, 0).page_number, 1);
    }

    #[test]
    fn empty_input_has_no_pages() {
        let items: Vec<u8> = Vec::new();
        let page = paginate(&items, 5, 3);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page_number, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn zero_page_size_is_treated_as_one() {
        assert_eq!(total_pages(3, 0), 3);
        assert_eq!(paginate(&[1, 2, 3], 0, 2).items, &[2]);
    }
}
