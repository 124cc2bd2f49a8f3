//! Page-source and rasterizer abstractions.
//!
//! The pipeline never talks to a container format directly: it consumes a
//! [`PageSource`] (per-page text, shapes, layout lines, embedded images) and
//! a [`Rasterizer`] (page and region renders at a zoom factor). The PDF
//! implementation lives in [`pdf`]; [`memory::MemorySource`] provides an
//! in-memory implementation for tests and for embedders that already hold
//! extracted content (e.g. a slide-deck reader).
//!
//! Text recognition over embedded rasters is likewise behind a trait,
//! [`TextRecognizer`], because it is strictly best-effort: the default
//! pipeline runs without one and simply leaves `ocr_text` empty.

pub mod memory;
pub mod pdf;

use crate::document::{PageDimensions, Rect};
use crate::error::{AssetError, LecternError};
use image::DynamicImage;

/// A text-bearing shape on a slide. Page-based sources produce none.
#[derive(Debug, Clone)]
pub struct Shape {
    pub text: String,
    /// True for the deck's designated title placeholder.
    pub is_title_placeholder: bool,
}

/// One line of text with its position, as emitted by the layout engine.
///
/// Order follows the engine's traversal (top-to-bottom, left-to-right per
/// block); it is not guaranteed globally sorted.
#[derive(Debug, Clone)]
pub struct LayoutLine {
    pub text: String,
    pub bounds: Rect,
}

/// An embedded raster reference found in page content.
///
/// Carries the encoded bytes as extracted from the container; decoding is
/// deferred to the harvester so a corrupt stream costs one asset, not the
/// page.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    /// Declared encoding: "png" or "jpeg".
    pub format: String,
    /// Draw rectangle on the page, when the container could correlate the
    /// image reference with a position.
    pub bounds: Option<Rect>,
}

/// Everything the pipeline needs from one page of a source document.
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    /// Raw page text, lines separated by `\n`.
    pub text: String,
    /// Slide shapes; empty for page-based sources.
    pub shapes: Vec<Shape>,
    /// Layout lines for formula harvesting.
    pub layout_lines: Vec<LayoutLine>,
    /// Embedded raster images, in discovery order.
    pub images: Vec<EmbeddedImage>,
    /// Speaker notes; empty for page-based sources.
    pub notes: String,
    pub width: f32,
    pub height: f32,
}

impl SourcePage {
    pub fn dimensions(&self) -> PageDimensions {
        PageDimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// Container-level metadata as reported by the source.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub has_form_fields: bool,
}

/// A document made of sequential pages.
///
/// Failing to open or enumerate the source is fatal for the document;
/// implementations should be tolerant *within* a page (a shape that exposes
/// no text is skipped, not an error).
pub trait PageSource {
    fn page_count(&self) -> Result<u32, LecternError>;

    /// Fetch one page, 1-based.
    fn page(&self, page_number: u32) -> Result<SourcePage, LecternError>;

    fn metadata(&self) -> Result<SourceMetadata, LecternError>;
}

/// Renders pages and page regions to rasters.
///
/// `zoom` is pixels per page point: 2.0 doubles the nominal resolution.
/// Errors are per-asset ([`AssetError`]) — a failed render never aborts the
/// document.
pub trait Rasterizer {
    fn render_page(&self, page_number: u32, zoom: f32) -> Result<DynamicImage, AssetError>;

    fn render_region(
        &self,
        page_number: u32,
        region: &Rect,
        zoom: f32,
    ) -> Result<DynamicImage, AssetError>;
}

/// Best-effort text recognition over an embedded raster.
///
/// `Ok(None)` means "nothing recognized"; `Err` is logged and the asset is
/// emitted without OCR fields. Implementations must be `Send + Sync` so a
/// recognizer can be shared through [`crate::LecternConfig`].
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, raster: &DynamicImage) -> Result<Option<String>, AssetError>;
}

/// The built-in recognizer: recognizes nothing, never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecognizer;

impl TextRecognizer for NoopRecognizer {
    fn recognize(&self, _raster: &DynamicImage) -> Result<Option<String>, AssetError> {
        Ok(None)
    }
}
