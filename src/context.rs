//! Context assembly: turn a document record and a question scope into a
//! bounded prompt context.
//!
//! The assembler is pure — it reads a persisted record and produces the
//! same bytes every time, which is what makes answers reproducible across
//! a save/load cycle. Raster payloads are strictly bounded: a deck with
//! eighty formula crops still produces a request of a few images, never
//! eighty.

use crate::config::LecternConfig;
use crate::document::{DocumentRecord, PageRecord};
use crate::error::LecternError;
use std::fmt::Write as _;
use tracing::debug;

/// What a raster attachment depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Full-page capture of a math-flagged page.
    PageImage,
    /// A formula-region crop.
    Formula,
    /// An embedded image asset.
    Embedded,
}

/// One raster payload selected for the multimodal request.
#[derive(Debug, Clone)]
pub struct VisualAttachment {
    pub page_number: u32,
    pub kind: AttachmentKind,
    /// Base64 data URI, exactly as persisted.
    pub data_uri: String,
}

/// The assembled prompt context for one question.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub question: String,
    /// States whether the answer is grounded in one page or the whole
    /// document. Part of the prompt, not cosmetic.
    pub scope_notice: String,
    pub context_text: String,
    /// Textual enumeration (single page) or aggregate summary (document)
    /// of the visual assets; `None` when visuals are excluded or absent.
    pub visual_summary: Option<String>,
    /// Bounded raster payloads for multimodal inclusion.
    pub attachments: Vec<VisualAttachment>,
}

/// Assemble the context for a question.
///
/// With `target_page` the context is that page's text plus (optionally) its
/// own visual assets; without it the context is every page's text, labelled,
/// with an aggregate visual summary. `include_visual = false` produces a
/// text-only context either way.
pub fn assemble_context(
    document: &DocumentRecord,
    question: &str,
    target_page: Option<u32>,
    include_visual: bool,
    config: &LecternConfig,
) -> Result<PromptContext, LecternError> {
    let context = match target_page {
        Some(page_number) => {
            let page = document
                .page(page_number)
                .ok_or(LecternError::PageOutOfRange {
                    page: page_number,
                    total: document.total_pages,
                })?;
            assemble_single_page(document, page, question, include_visual, config)
        }
        None => assemble_whole_document(document, question, include_visual, config),
    };

    debug!(
        scope = %context.scope_notice,
        attachments = context.attachments.len(),
        "assembled prompt context"
    );
    Ok(context)
}

fn assemble_single_page(
    document: &DocumentRecord,
    page: &PageRecord,
    question: &str,
    include_visual: bool,
    config: &LecternConfig,
) -> PromptContext {
    let scope_notice = format!(
        "This answer is based only on slide {} of {}.",
        page.page_number, document.total_pages
    );

    let mut visual_summary = None;
    let mut attachments = Vec::new();

    if include_visual {
        let formulas: Vec<_> = document.formulas_for_page(page.page_number).collect();
        let images: Vec<_> = document.images_for_page(page.page_number).collect();

        if !formulas.is_empty() || !images.is_empty() {
            let mut summary = format!(
                "Visual assets on slide {}: {} formula region(s), {} embedded image(s).",
                page.page_number,
                formulas.len(),
                images.len()
            );
            for f in &formulas {
                let b = f.bounding_box;
                let _ = write!(
                    summary,
                    "\n- formula at ({:.0}, {:.0})–({:.0}, {:.0}): {}",
                    b.x0, b.y0, b.x1, b.y1, f.source_text
                );
            }
            for i in &images {
                let _ = write!(summary, "\n- image {}: {}x{} {}", i.index, i.width, i.height, i.format);
                if let Some(b) = i.bounding_box {
                    let _ = write!(summary, " at ({:.0}, {:.0})", b.x0, b.y0);
                }
                if let Some(ref text) = i.ocr_text {
                    let _ = write!(summary, " — recognized text: {text}");
                }
            }
            visual_summary = Some(summary);
        }

        // A math-flagged page's own capture outranks its individual crops:
        // the model sees the notation in situ instead of out-of-context
        // fragments.
        if page.has_math_content {
            if let Some(ref uri) = page.page_image {
                attachments.push(VisualAttachment {
                    page_number: page.page_number,
                    kind: AttachmentKind::PageImage,
                    data_uri: uri.clone(),
                });
            }
        }
        for f in &formulas {
            attachments.push(VisualAttachment {
                page_number: f.page_number,
                kind: AttachmentKind::Formula,
                data_uri: f.rendered_image.clone(),
            });
        }
        for i in &images {
            attachments.push(VisualAttachment {
                page_number: i.page_number,
                kind: AttachmentKind::Embedded,
                data_uri: i.rendered_image.clone(),
            });
        }
        attachments.truncate(config.max_page_attachments);
    }

    PromptContext {
        question: question.to_string(),
        scope_notice,
        context_text: page.full_text.clone(),
        visual_summary,
        attachments,
    }
}

fn assemble_whole_document(
    document: &DocumentRecord,
    question: &str,
    include_visual: bool,
    config: &LecternConfig,
) -> PromptContext {
    let scope_notice = format!(
        "This answer is based on the entire document ({} slides).",
        document.total_pages
    );

    let context_text = document
        .pages
        .iter()
        .map(|p| format!("Slide {}:\n{}", p.page_number, p.full_text))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut visual_summary = None;
    let mut attachments = Vec::new();

    if include_visual && (!document.formulas.is_empty() || !document.images.is_empty()) {
        // Aggregate counts and page lists; enumerating every asset of a
        // whole deck would dwarf the actual content.
        let formula_pages = page_list(document.formulas.iter().map(|f| f.page_number));
        let image_pages = page_list(document.images.iter().map(|i| i.page_number));

        let mut summary = format!(
            "The document carries {} formula region(s) (slides {}) and {} embedded image(s) (slides {}).",
            document.formulas.len(),
            formula_pages,
            document.images.len(),
            image_pages
        );
        if !document.math_content_pages.is_empty() {
            let _ = write!(
                summary,
                " Slides flagged as mathematical: {}.",
                page_list(document.math_content_pages.iter().copied())
            );
        }
        visual_summary = Some(summary);
    }

    if include_visual {
        // Sample captures of math pages first, then formula crops.
        for &n in &document.math_content_pages {
            if let Some(page) = document.page(n) {
                if let Some(ref uri) = page.page_image {
                    attachments.push(VisualAttachment {
                        page_number: n,
                        kind: AttachmentKind::PageImage,
                        data_uri: uri.clone(),
                    });
                }
            }
        }
        for f in &document.formulas {
            attachments.push(VisualAttachment {
                page_number: f.page_number,
                kind: AttachmentKind::Formula,
                data_uri: f.rendered_image.clone(),
            });
        }
        attachments.truncate(config.max_document_attachments);
    }

    PromptContext {
        question: question.to_string(),
        scope_notice,
        context_text,
        visual_summary,
        attachments,
    }
}

/// Ascending, deduplicated, comma-separated page numbers.
fn page_list(pages: impl Iterator<Item = u32>) -> String {
    let mut numbers: Vec<u32> = pages.collect();
    numbers.sort_unstable();
    numbers.dedup();
    if numbers.is_empty() {
        return "none".to_string();
    }
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
