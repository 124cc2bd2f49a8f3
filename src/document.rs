//! The persisted document model.
//!
//! A [`DocumentRecord`] is built once at upload time and is immutable
//! afterwards — reprocessing a file replaces the whole record, it never
//! patches one in place. The record owns every nested value; formula regions
//! and image assets refer back to their page by `page_number` (a lookup key,
//! not a live reference), so the serialized form has no cycles.
//!
//! Serialized field names are part of the on-disk contract: the JSON written
//! by [`crate::storage::save_document`] uses `slides` for the page list and
//! `extraction_time` for the timestamp, and embeds every raster inline as a
//! base64 data URI rather than as a sibling file.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page points, top-left origin.
///
/// All coordinates in the crate are top-down: `y0` is the distance from the
/// top edge of the page. Sources working in PDF space (bottom-left origin)
/// convert before handing rectangles out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Grow the rectangle by `pad` on every side, clamped to `0..=w`/`0..=h`.
    pub fn expanded(&self, pad: f32, page_width: f32, page_height: f32) -> Rect {
        Rect {
            x0: (self.x0 - pad).max(0.0),
            y0: (self.y0 - pad).max(0.0),
            x1: (self.x1 + pad).min(page_width),
            y1: (self.y1 + pad).min(page_height),
        }
    }

    /// Union of two rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One page (or slide) of a document.
///
/// `full_text` is the title (when the page has a real one) followed by the
/// content lines, trimmed; a synthetic `"Page N"` title is never folded into
/// `full_text`. `has_math_content` and `page_image` are filled in by the
/// flagging and capture stages; plain [`crate::process::extract`] leaves them
/// at their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based, unique and dense within a document.
    pub page_number: u32,
    pub title: String,
    pub content_lines: Vec<String>,
    /// Speaker notes for slide sources; empty for PDF pages.
    #[serde(default)]
    pub notes: String,
    pub full_text: String,
    #[serde(default)]
    pub has_math_content: bool,
    /// Full-page render (PNG data URI) for math-flagged pages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_image: Option<String>,
}

/// A sub-area of a page that the classifier judged to contain mathematical
/// notation, rendered as a crop. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaRegion {
    pub page_number: u32,
    /// The layout line that triggered the classifier.
    pub source_text: String,
    pub bounding_box: Rect,
    /// PNG data URI of the padded crop.
    pub rendered_image: String,
}

/// An embedded raster image found in page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    pub page_number: u32,
    /// Creation-order index within the page, 0-based.
    pub index: u32,
    pub width: u32,
    pub height: u32,
    /// Declared encoding of `rendered_image` ("png" or "jpeg").
    pub format: String,
    /// Draw position on the page; absent when the source could not correlate
    /// the image reference with a drawn rectangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Rect>,
    pub rendered_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// Width and height of one page, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

/// Document-level metadata and derived structural flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
    /// One entry per page, in page order.
    #[serde(default)]
    pub page_dimensions: Vec<PageDimensions>,
    #[serde(default)]
    pub has_table_of_contents: bool,
    #[serde(default)]
    pub has_hyperlinks: bool,
    #[serde(default)]
    pub has_form_fields: bool,
    /// OR over all pages' `has_math_content`.
    #[serde(default)]
    pub has_mathematical_content: bool,
}

/// The unit of persistence and the unit the context assembler consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Original file name, extension included.
    pub filename: String,
    /// File stem used to derive the storage path.
    pub basename: String,
    pub total_pages: u32,
    /// Local wall-clock time of extraction, `%Y-%m-%d %H:%M:%S`.
    pub extraction_time: String,
    pub metadata: DocumentMetadata,
    #[serde(rename = "slides")]
    pub pages: Vec<PageRecord>,
    #[serde(default)]
    pub formulas: Vec<FormulaRegion>,
    #[serde(default)]
    pub images: Vec<ImageAsset>,
    /// Page numbers with `has_math_content = true`, ascending.
    #[serde(default)]
    pub math_content_pages: Vec<u32>,
}

impl DocumentRecord {
    /// Look up a page by its 1-based number.
    pub fn page(&self, page_number: u32) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }

    /// Formula regions belonging to the given page, in harvest order.
    pub fn formulas_for_page(&self, page_number: u32) -> impl Iterator<Item = &FormulaRegion> {
        self.formulas
            .iter()
            .filter(move |f| f.page_number == page_number)
    }

    /// Image assets belonging to the given page, in creation order.
    pub fn images_for_page(&self, page_number: u32) -> impl Iterator<Item = &ImageAsset> {
        self.images
            .iter()
            .filter(move |i| i.page_number == page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_expand_clamps_to_page() {
        let r = Rect::new(5.0, 5.0, 100.0, 50.0);
        let e = r.expanded(10.0, 105.0, 55.0);
        assert_eq!(e, Rect::new(0.0, 0.0, 105.0, 55.0));
    }

    #[test]
    fn rect_union_covers_both() {
        let a = Rect::new(0.0, 10.0, 20.0, 30.0);
        let b = Rect::new(15.0, 0.0, 40.0, 25.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 40.0, 30.0));
    }

    #[test]
    fn record_serializes_pages_as_slides() {
        let record = DocumentRecord {
            filename: "deck.pdf".into(),
            basename: "deck".into(),
            total_pages: 1,
            extraction_time: "2025-01-01 00:00:00".into(),
            metadata: DocumentMetadata::default(),
            pages: vec![PageRecord {
                page_number: 1,
                title: "Intro".into(),
                content_lines: vec!["hello".into()],
                notes: String::new(),
                full_text: "Intro\nhello".into(),
                has_math_content: false,
                page_image: None,
            }],
            formulas: vec![],
            images: vec![],
            math_content_pages: vec![],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("slides").is_some(), "pages must serialize as 'slides'");
        assert!(json.get("pages").is_none());
        assert!(json.get("extraction_time").is_some());
        // Unset page image must not appear in the JSON at all.
        assert!(json["slides"][0].get("page_image").is_none());
    }

    #[test]
    fn page_lookup_by_number() {
        let mut record = DocumentRecord {
            filename: "d.pdf".into(),
            basename: "d".into(),
            total_pages: 2,
            extraction_time: String::new(),
            metadata: DocumentMetadata::default(),
            pages: vec![],
            formulas: vec![],
            images: vec![],
            math_content_pages: vec![],
        };
        for n in 1..=2 {
            record.pages.push(PageRecord {
                page_number: n,
                title: format!("Page {n}"),
                content_lines: vec![],
                notes: String::new(),
                full_text: String::new(),
                has_math_content: false,
                page_image: None,
            });
        }
        assert_eq!(record.page(2).unwrap().page_number, 2);
        assert!(record.page(3).is_none());
    }
}
