//! Top-level document processing entry points.
//!
//! [`extract`] builds the bare page sequence; [`build_enhanced`] runs the
//! full pipeline (flagging, harvesting, capture, metadata). Both have
//! `_from_source` variants generic over any [`PageSource`] so the test
//! suite and embedders can feed in-memory documents; the path-taking
//! wrappers open a [`PdfSource`].
//!
//! One upload is one synchronous pass: extraction, classification, and
//! harvesting run sequentially on the calling thread. The async [`ingest`]
//! wrapper exists for callers living in a runtime — it resolves a path or
//! URL, moves the blocking work onto a dedicated thread, and persists the
//! result.

use crate::classifier::{MathClassifier, MathIndicators};
use crate::config::LecternConfig;
use crate::document::{DocumentMetadata, DocumentRecord, PageDimensions, PageRecord};
use crate::error::LecternError;
use crate::input;
use crate::pipeline::{capture, extract as extract_stage, flag, harvest};
use crate::source::pdf::PdfSource;
use crate::source::{PageSource, Rasterizer, SourceMetadata, SourcePage};
use crate::storage;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Extract a document's pages without classification or rasterization.
///
/// Every page gets `has_math_content = false` and no visual assets; use
/// [`build_enhanced`] for the full treatment.
pub fn extract(
    path: impl AsRef<Path>,
    config: &LecternConfig,
) -> Result<DocumentRecord, LecternError> {
    let path = path.as_ref();
    let source = PdfSource::open(path, config.password.as_deref())?;
    extract_from_source(&source, &display_name(path), config)
}

/// [`extract`] over any page source.
pub fn extract_from_source<S: PageSource>(
    source: &S,
    filename: &str,
    _config: &LecternConfig,
) -> Result<DocumentRecord, LecternError> {
    info!(filename, "extracting document");
    let total = source.page_count()?;
    let mut pages = Vec::with_capacity(total as usize);
    let mut dimensions = Vec::with_capacity(total as usize);
    for page_number in 1..=total {
        let sp = source.page(page_number)?;
        dimensions.push(sp.dimensions());
        pages.push(extract_stage::extract_page(page_number, &sp));
    }
    let metadata = derive_metadata(source.metadata()?, dimensions, &pages, false);
    Ok(assemble_record(filename, pages, metadata, vec![], vec![], vec![]))
}

/// Run the full pipeline: extract, flag (three signals + demotion),
/// harvest formulas and images, capture page images, derive metadata.
pub fn build_enhanced(
    path: impl AsRef<Path>,
    config: &LecternConfig,
) -> Result<DocumentRecord, LecternError> {
    let path = path.as_ref();
    let source = PdfSource::open(path, config.password.as_deref())?;
    build_enhanced_from_source(&source, &display_name(path), config)
}

/// [`build_enhanced`] over any page source that can also rasterize.
pub fn build_enhanced_from_source<S: PageSource + Rasterizer>(
    source: &S,
    filename: &str,
    config: &LecternConfig,
) -> Result<DocumentRecord, LecternError> {
    info!(filename, "building enhanced document");
    let classifier = MathClassifier::new(&config.domain_terms);

    // Fetch each source page once; extraction and harvesting share them.
    let total = source.page_count()?;
    let mut source_pages = Vec::with_capacity(total as usize);
    for page_number in 1..=total {
        source_pages.push(source.page(page_number)?);
    }

    let pages: Vec<PageRecord> = source_pages
        .iter()
        .enumerate()
        .map(|(i, sp)| extract_stage::extract_page(i as u32 + 1, sp))
        .collect();

    // Flagging is a pure two-pass pipeline over the extracted snapshot.
    let line_sets: Vec<Vec<String>> = source_pages
        .iter()
        .map(|sp| sp.layout_lines.iter().map(|l| l.text.clone()).collect())
        .collect();
    let flags = flag::flag_pages(&classifier, &pages, &line_sets);
    let flags = flag::demote_headings(&pages, &flags);
    let (pages, math_content_pages) = flag::annotate(pages, &flags);
    debug!(
        math_pages = math_content_pages.len(),
        total = pages.len(),
        "math flagging settled"
    );

    // Harvest visual assets. Per-asset failures are logged inside the
    // stage; nothing here can abort the document.
    let recognizer = config.recognizer.as_deref();
    let mut formulas = Vec::new();
    let mut images = Vec::new();
    for (i, sp) in source_pages.iter().enumerate() {
        let page_number = i as u32 + 1;
        formulas.extend(harvest::harvest_formulas(
            page_number,
            sp,
            &classifier,
            source,
            config,
        ));
        images.extend(harvest::harvest_images(page_number, sp, recognizer));
    }

    let pages = capture::capture_page_images(pages, source, config);

    let dimensions = source_pages.iter().map(SourcePage::dimensions).collect();
    let metadata = derive_metadata(
        source.metadata()?,
        dimensions,
        &pages,
        !math_content_pages.is_empty(),
    );

    info!(
        pages = pages.len(),
        formulas = formulas.len(),
        images = images.len(),
        math_pages = math_content_pages.len(),
        "enhanced document built"
    );
    Ok(assemble_record(
        filename,
        pages,
        metadata,
        formulas,
        images,
        math_content_pages,
    ))
}

/// Resolve a path or URL, process it fully, and persist the record to
/// `config.storage_dir`. The blocking pipeline runs off the async executor.
pub async fn ingest(
    input_str: impl AsRef<str>,
    config: &LecternConfig,
) -> Result<DocumentRecord, LecternError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let path = resolved.path().to_path_buf();
    let display = resolved
        .original_name()
        .unwrap_or_else(|| display_name(&path));

    let cfg = config.clone();
    let record = tokio::task::spawn_blocking(move || {
        let source = PdfSource::open(&path, cfg.password.as_deref())?;
        build_enhanced_from_source(&source, &display, &cfg)
    })
    .await
    .map_err(|e| LecternError::Internal(format!("processing task panicked: {e}")))??;

    let saved = storage::save_document(&record, &config.storage_dir)?;
    info!(path = %saved.display(), "document persisted");
    Ok(record)
}

// ── Math analysis report ─────────────────────────────────────────────────

/// Per-page math-detection diagnostics, as surfaced by `lectern analyze`.
#[derive(Debug, Clone, Serialize)]
pub struct PageMathAnalysis {
    pub page_number: u32,
    /// Preview of the page's first lines.
    pub first_lines: String,
    /// Raw classifier verdict on the full page text.
    pub math_detected: bool,
    pub symbol_count: usize,
    pub greek_letter_count: usize,
    pub equation_count: usize,
    /// Lines of the page that classify positive on their own.
    pub block_math_count: usize,
    pub is_title_page: bool,
    /// Final verdict after the three-signal OR and the demotion pass.
    pub likely_has_math: bool,
}

/// Re-run the detection stack over a (possibly reloaded) record and report
/// every indicator per page. Line-level signals use the stored content
/// lines, so the report works on persisted records without the original
/// layout.
pub fn analyze(document: &DocumentRecord, config: &LecternConfig) -> Vec<PageMathAnalysis> {
    let classifier = MathClassifier::new(&config.domain_terms);

    let line_sets: Vec<Vec<String>> = document
        .pages
        .iter()
        .map(|p| p.content_lines.clone())
        .collect();
    let flags = flag::flag_pages(&classifier, &document.pages, &line_sets);
    let flags = flag::demote_headings(&document.pages, &flags);

    document
        .pages
        .iter()
        .zip(flags.iter())
        .map(|(page, &likely)| {
            let MathIndicators {
                symbol_count,
                greek_letter_count,
                equation_count,
                ..
            } = classifier.indicators(&page.full_text);
            let block_math_count = page
                .content_lines
                .iter()
                .filter(|l| classifier.classify(l))
                .count();
            PageMathAnalysis {
                page_number: page.page_number,
                first_lines: preview(&page.full_text),
                math_detected: classifier.classify(&page.full_text),
                symbol_count,
                greek_letter_count,
                equation_count,
                block_math_count,
                is_title_page: is_title_page(&page.full_text, symbol_count),
                likely_has_math: likely,
            }
        })
        .collect()
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn basename(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => filename.to_string(),
    }
}

fn derive_metadata(
    source_meta: SourceMetadata,
    page_dimensions: Vec<PageDimensions>,
    pages: &[PageRecord],
    has_math: bool,
) -> DocumentMetadata {
    let has_table_of_contents = pages
        .iter()
        .any(|p| MathClassifier::looks_like_contents_page(&p.full_text));
    let has_hyperlinks = pages.iter().any(|p| {
        let t = &p.full_text;
        t.contains("http://") || t.contains("https://") || t.contains("www.")
    });

    DocumentMetadata {
        title: source_meta.title,
        author: source_meta.author,
        creation_date: source_meta.creation_date,
        modification_date: source_meta.modification_date,
        page_dimensions,
        has_table_of_contents,
        has_hyperlinks,
        has_form_fields: source_meta.has_form_fields,
        has_mathematical_content: has_math,
    }
}

fn assemble_record(
    filename: &str,
    pages: Vec<PageRecord>,
    metadata: DocumentMetadata,
    formulas: Vec<crate::document::FormulaRegion>,
    images: Vec<crate::document::ImageAsset>,
    math_content_pages: Vec<u32>,
) -> DocumentRecord {
    DocumentRecord {
        filename: filename.to_string(),
        basename: basename(filename),
        total_pages: pages.len() as u32,
        extraction_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        metadata,
        pages,
        formulas,
        images,
        math_content_pages,
    }
}

fn preview(full_text: &str) -> String {
    full_text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(" / ")
        .chars()
        .take(120)
        .collect()
}

fn is_title_page(full_text: &str, symbol_count: usize) -> bool {
    let lines = full_text.lines().filter(|l| !l.trim().is_empty()).count();
    lines <= 2 && symbol_count == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_strips_last_extension_only() {
        assert_eq!(basename("deck.pdf"), "deck");
        assert_eq!(basename("lecture.notes.pdf"), "lecture.notes");
        assert_eq!(basename("noext"), "noext");
        assert_eq!(basename(".hidden"), ".hidden");
    }

    #[test]
    fn preview_joins_first_lines() {
        assert_eq!(preview("Title\n\nBody line\nmore"), "Title / Body line");
    }
}
