//! Math-content flagging: which pages earn a full-page capture.
//!
//! Flagging is a small pipeline of pure passes over an immutable snapshot:
//! each pass takes the page records (and optional line sets) and returns a
//! fresh flag vector, so the demotion logic is testable without touching a
//! rasterizer.
//!
//! ## Why three signals?
//!
//! Any single heuristic has false negatives: the page-level classifier can
//! miss a formula buried in prose, the line scan can miss one split across
//! layout blocks. The capture set is the OR of three independent looks —
//! full-text classification, a cheap bare-symbol scan, and a per-line
//! re-scan — so one miss doesn't lose the page.
//!
//! ## Why a demotion pass?
//!
//! The OR is generous, and headings like "3.2 Ewald construction" ride in
//! on the domain vocabulary without showing a single equation. The
//! correction pass demotes any page whose text is a bare chapter/section
//! heading with almost no body and no equality sign or Greek letter,
//! so mentions of a topic don't trigger captures.

use crate::classifier::MathClassifier;
use crate::document::PageRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Operator count at which a page trips the bare-symbol signal on its own.
const BARE_SYMBOL_MIN: usize = 4;

/// Pages with at least this many non-empty lines are never demoted.
const DEMOTION_LINE_LIMIT: usize = 10;

static RE_BARE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?i:chapter|section)\s+\d+|^\s*\d+(?:\.\d+)*\.?\s+\S").unwrap()
});

/// The three independent signals for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSignals {
    /// Classifier verdict on the full page text.
    pub classified: bool,
    /// Cheap scan: any decisive unicode symbol, or enough core operators.
    pub bare_symbols: bool,
    /// Any line of the page classifying positive on its own.
    pub block_level: bool,
}

impl PageSignals {
    pub fn any(&self) -> bool {
        self.classified || self.bare_symbols || self.block_level
    }
}

/// Evaluate the three signals for one page.
pub fn page_signals(classifier: &MathClassifier, full_text: &str, lines: &[String]) -> PageSignals {
    PageSignals {
        classified: classifier.classify(full_text),
        bare_symbols: MathClassifier::has_strong_symbol(full_text)
            || MathClassifier::symbol_count(full_text) >= BARE_SYMBOL_MIN,
        block_level: lines.iter().any(|l| classifier.classify(l)),
    }
}

/// First pass: OR of the three signals per page.
///
/// `line_sets` holds each page's line texts (layout lines at build time,
/// content lines when re-analysing a persisted record) and must be parallel
/// to `pages`.
pub fn flag_pages(
    classifier: &MathClassifier,
    pages: &[PageRecord],
    line_sets: &[Vec<String>],
) -> Vec<bool> {
    debug_assert_eq!(pages.len(), line_sets.len());
    pages
        .iter()
        .zip(line_sets.iter())
        .map(|(page, lines)| page_signals(classifier, &page.full_text, lines).any())
        .collect()
}

/// Correction pass: demote flagged pages that are bare headings.
///
/// A page is demoted when its text starts with a chapter/section heading,
/// carries fewer than [`DEMOTION_LINE_LIMIT`] non-empty lines, and shows
/// neither an equality sign nor a Greek letter. Returns a new flag vector;
/// never promotes.
pub fn demote_headings(pages: &[PageRecord], flags: &[bool]) -> Vec<bool> {
    debug_assert_eq!(pages.len(), flags.len());
    pages
        .iter()
        .zip(flags.iter())
        .map(|(page, &flagged)| {
            if !flagged {
                return false;
            }
            if is_bare_heading_page(&page.full_text) {
                debug!(page = page.page_number, "demoting bare heading page");
                false
            } else {
                true
            }
        })
        .collect()
}

fn is_bare_heading_page(full_text: &str) -> bool {
    let line_count = full_text.lines().filter(|l| !l.trim().is_empty()).count();
    RE_BARE_HEADING.is_match(full_text)
        && line_count < DEMOTION_LINE_LIMIT
        && !MathClassifier::has_equality_or_greek(full_text)
}

/// Final pass: fold the flags back into fresh page records and collect the
/// positive page numbers, ascending.
pub fn annotate(pages: Vec<PageRecord>, flags: &[bool]) -> (Vec<PageRecord>, Vec<u32>) {
    debug_assert_eq!(pages.len(), flags.len());
    let mut math_pages = Vec::new();
    let annotated = pages
        .into_iter()
        .zip(flags.iter())
        .map(|(mut page, &flag)| {
            page.has_math_content = flag;
            if flag {
                math_pages.push(page.page_number);
            }
            page
        })
        .collect();
    (annotated, math_pages)
}
