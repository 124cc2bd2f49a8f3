//! Page extraction: source pages → ordered [`PageRecord`]s.
//!
//! This stage only builds the record sequence; it never rasterizes and
//! never classifies. Slide-style sources (shapes present) get a two-pass
//! sweep: find the title placeholder first, then collect every text-bearing
//! shape. Page-style sources take the first non-empty line as the title.

use crate::document::PageRecord;
use crate::error::LecternError;
use crate::source::{PageSource, SourcePage};
use tracing::debug;

/// Build one [`PageRecord`] per source page, 1-based and dense.
pub fn extract_pages<S: PageSource>(source: &S) -> Result<Vec<PageRecord>, LecternError> {
    let total = source.page_count()?;
    let mut records = Vec::with_capacity(total as usize);

    for page_number in 1..=total {
        let page = source.page(page_number)?;
        records.push(extract_page(page_number, &page));
    }

    debug!(pages = records.len(), "extracted page records");
    Ok(records)
}

/// Extract a single page. Exposed for the capture stage's re-validation.
pub fn extract_page(page_number: u32, page: &SourcePage) -> PageRecord {
    if page.shapes.is_empty() {
        extract_text_page(page_number, page)
    } else {
        extract_slide_page(page_number, page)
    }
}

/// Page-style sources: first non-empty line is the title, the rest is
/// content. A page with no text at all gets a synthetic `"Page N"` label,
/// which is never folded into `full_text`.
fn extract_text_page(page_number: u32, page: &SourcePage) -> PageRecord {
    let mut lines = page
        .text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let (title, synthetic) = match lines.next() {
        Some(first) => (first.to_string(), false),
        None => (format!("Page {page_number}"), true),
    };
    let content_lines: Vec<String> = lines.map(str::to_string).collect();

    let full_text = if synthetic {
        content_lines.join("\n")
    } else if content_lines.is_empty() {
        title.clone()
    } else {
        format!("{title}\n{}", content_lines.join("\n"))
    };

    PageRecord {
        page_number,
        title,
        content_lines,
        notes: page.notes.clone(),
        full_text: full_text.trim().to_string(),
        has_math_content: false,
        page_image: None,
    }
}

/// Slide-style sources. First pass: the designated title placeholder, if
/// any shape exposes one. Second pass: every text-bearing shape, title
/// included — shapes without text are silently skipped, not an error.
fn extract_slide_page(page_number: u32, page: &SourcePage) -> PageRecord {
    let title = page
        .shapes
        .iter()
        .find(|s| s.is_title_placeholder && !s.text.trim().is_empty())
        .map(|s| s.text.trim().to_string());

    let content_lines: Vec<String> = page
        .shapes
        .iter()
        .filter(|s| !s.is_title_placeholder)
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let (title, synthetic) = match title {
        Some(t) => (t, false),
        None => match content_lines.first() {
            // No placeholder: fall back to the first text shape.
            Some(first) => (first.clone(), false),
            None => (format!("Page {page_number}"), true),
        },
    };

    let full_text = if synthetic {
        content_lines.join("\n")
    } else {
        let mut parts = vec![title.clone()];
        parts.extend(
            content_lines
                .iter()
                .filter(|l| *l != &title)
                .cloned(),
        );
        parts.join("\n")
    };

    PageRecord {
        page_number,
        title,
        content_lines,
        notes: page.notes.trim().to_string(),
        full_text: full_text.trim().to_string(),
        has_math_content: false,
        page_image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemorySource;
    use crate::source::Shape;

    #[test]
    fn page_numbers_are_dense_and_one_based() {
        let source = MemorySource::new(vec![
            MemorySource::text_page("First"),
            MemorySource::text_page("Second"),
            MemorySource::text_page("Third"),
        ]);
        let records = extract_pages(&source).unwrap();
        assert_eq!(records.len(), 3);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.page_number, i as u32 + 1);
        }
    }

    #[test]
    fn first_line_becomes_title() {
        let page = MemorySource::text_page("Bragg Diffraction\nFirst point\nSecond point");
        let record = extract_page(1, &page);
        assert_eq!(record.title, "Bragg Diffraction");
        assert_eq!(record.content_lines, vec!["First point", "Second point"]);
        assert_eq!(record.full_text, "Bragg Diffraction\nFirst point\nSecond point");
    }

    #[test]
    fn empty_page_gets_synthetic_title() {
        let page = MemorySource::text_page("");
        let record = extract_page(7, &page);
        assert_eq!(record.title, "Page 7");
        assert!(record.content_lines.is_empty());
        // The synthetic label must not leak into the searchable text.
        assert_eq!(record.full_text, "");
    }

    #[test]
    fn slide_title_placeholder_wins() {
        let page = MemorySource::slide_page(
            vec![
                Shape {
                    text: "Body text first".into(),
                    is_title_placeholder: false,
                },
                Shape {
                    text: "The Real Title".into(),
                    is_title_placeholder: true,
                },
            ],
            "remember to mention the demo",
        );
        let record = extract_page(1, &page);
        assert_eq!(record.title, "The Real Title");
        assert_eq!(record.content_lines, vec!["Body text first"]);
        assert_eq!(record.notes, "remember to mention the demo");
        assert_eq!(record.full_text, "The Real Title\nBody text first");
    }

    #[test]
    fn textless_shapes_are_skipped() {
        let page = MemorySource::slide_page(
            vec![
                Shape {
                    text: "   ".into(),
                    is_title_placeholder: false,
                },
                Shape {
                    text: "Only content".into(),
                    is_title_placeholder: false,
                },
            ],
            "",
        );
        let record = extract_page(1, &page);
        assert_eq!(record.title, "Only content");
        assert_eq!(record.content_lines, vec!["Only content"]);
        assert_eq!(record.full_text, "Only content");
    }
}
