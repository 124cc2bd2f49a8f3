//! Full-page capture for math-flagged pages.
//!
//! Capture runs after the flag passes have settled, so the set of expensive
//! renders is exactly the final positive set — pages that were never
//! flagged, or were demoted, are never rasterized. A failed render leaves
//! `page_image` empty and moves on.

use crate::config::LecternConfig;
use crate::document::PageRecord;
use crate::pipeline::encode;
use crate::source::Rasterizer;
use tracing::{debug, warn};

/// Attach a full-page PNG data URI to every page with
/// `has_math_content = true`. Returns the new page sequence.
pub fn capture_page_images<R: Rasterizer>(
    pages: Vec<PageRecord>,
    rasterizer: &R,
    config: &LecternConfig,
) -> Vec<PageRecord> {
    pages
        .into_iter()
        .map(|mut page| {
            if !page.has_math_content {
                return page;
            }
            match rasterizer
                .render_page(page.page_number, config.zoom)
                .and_then(|raster| encode::png_data_uri(&raster))
            {
                Ok(uri) => {
                    debug!(page = page.page_number, "captured page image");
                    page.page_image = Some(uri);
                }
                Err(e) => {
                    warn!(page = page.page_number, error = %e, "page capture failed; image omitted");
                }
            }
            page
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemorySource;

    fn page(n: u32, math: bool) -> PageRecord {
        PageRecord {
            page_number: n,
            title: format!("Page {n}"),
            content_lines: vec![],
            notes: String::new(),
            full_text: String::new(),
            has_math_content: math,
            page_image: None,
        }
    }

    #[test]
    fn only_flagged_pages_are_captured() {
        let source = MemorySource::new(vec![
            MemorySource::text_page("a"),
            MemorySource::text_page("b"),
        ]);
        let pages = capture_page_images(
            vec![page(1, false), page(2, true)],
            &source,
            &LecternConfig::default(),
        );
        assert!(pages[0].page_image.is_none());
        let uri = pages[1].page_image.as_ref().expect("flagged page captured");
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn capture_failure_leaves_field_empty() {
        let source = MemorySource::new(vec![
            MemorySource::text_page("a"),
            MemorySource::text_page("b"),
        ])
        .with_failing_render(2);
        let pages = capture_page_images(
            vec![page(1, true), page(2, true)],
            &source,
            &LecternConfig::default(),
        );
        assert!(pages[0].page_image.is_some());
        assert!(pages[1].page_image.is_none());
        assert!(pages[1].has_math_content, "flag survives a failed capture");
    }
}
