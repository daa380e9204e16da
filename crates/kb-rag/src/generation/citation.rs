//! Reference and search-result formatting

use crate::types::{ReferenceList, RetrievedPassage};

/// Characters of passage text shown in a reference
pub const PREVIEW_CHARS: usize = 200;

/// Shown in place of a missing page number
const NO_PAGE: &str = "N/A";

/// First `max_chars` characters, with "..." only when something was cut
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// One reference entry per passage, numbered by retrieval rank
pub fn format_references(passages: &[RetrievedPassage]) -> ReferenceList {
    let entries = passages
        .iter()
        .enumerate()
        .map(|(i, passage)| {
            format!(
                "\n--- Reference {} ---\nSource: {}\nPage: {}\nContent: {}",
                i + 1,
                passage.source_uri,
                passage.page_number.as_deref().unwrap_or(NO_PAGE),
                preview(&passage.text, PREVIEW_CHARS)
            )
        })
        .collect();

    ReferenceList::from_entries(entries)
}

/// Render raw retrieval results for the retrieve-only command
pub fn format_search_results(passages: &[RetrievedPassage]) -> String {
    if passages.is_empty() {
        return "No results found.".to_string();
    }

    let mut lines = vec!["=== Search Results ===".to_string()];
    for (i, passage) in passages.iter().enumerate() {
        lines.push(format!(
            "\nResult {} (Relevance: {:.2}):",
            i + 1,
            passage.relevance_score
        ));
        lines.push(format!("Source: {}", passage.source_uri));
        if let Some(page) = &passage.page_number {
            lines.push(format!("Page: {}", page));
        }
        lines.push(format!("Content: {}", preview(&passage.text, PREVIEW_CHARS)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_REFERENCES;

    #[test]
    fn test_preview_truncates_at_200_chars() {
        let long = "a".repeat(250);
        let shown = preview(&long, PREVIEW_CHARS);
        assert_eq!(shown.len(), 203);
        assert!(shown.ends_with("..."));

        let exact = "b".repeat(200);
        assert_eq!(preview(&exact, PREVIEW_CHARS), exact);

        assert_eq!(preview("short", PREVIEW_CHARS), "short");
    }

    #[test]
    fn test_preview_counts_characters_not_bytes() {
        let text = "é".repeat(201);
        let shown = preview(&text, PREVIEW_CHARS);
        assert_eq!(shown.chars().count(), 203);
    }

    #[test]
    fn test_one_reference_per_passage() {
        let passages = vec![
            RetrievedPassage::new("first", "s3://a.pdf", 0.9).with_page("4"),
            RetrievedPassage::new("second", "s3://b.pdf", 0.8),
            RetrievedPassage::new("third", "s3://c.pdf", 0.1),
        ];
        let refs = format_references(&passages);

        assert_eq!(refs.len(), 3);
        assert!(refs.references_found());
        assert_eq!(
            refs.entries()[0],
            "\n--- Reference 1 ---\nSource: s3://a.pdf\nPage: 4\nContent: first"
        );
        assert!(refs.entries()[1].contains("Page: N/A"));
        assert!(refs.entries()[2].starts_with("\n--- Reference 3 ---"));
    }

    #[test]
    fn test_no_passages_gives_sentinel() {
        let refs = format_references(&[]);
        assert_eq!(refs.entries(), &[NO_REFERENCES.to_string()]);
        assert!(!refs.references_found());
    }

    #[test]
    fn test_search_results_rendering() {
        let passages = vec![RetrievedPassage::new("The BD850 dozer", "s3://bd850.pdf", 0.8734)];
        let rendered = format_search_results(&passages);
        assert!(rendered.starts_with("=== Search Results ==="));
        assert!(rendered.contains("Result 1 (Relevance: 0.87):"));
        assert!(rendered.contains("Source: s3://bd850.pdf"));
        assert_eq!(format_search_results(&[]), "No results found.");
    }
}
