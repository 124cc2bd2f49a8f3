//! PDF-backed [`PageSource`] + [`Rasterizer`] via pdfium.
//!
//! ## Why reopen the document per call?
//!
//! `pdfium-render` documents borrow the `Pdfium` binding, which makes a
//! long-lived self-referential source struct awkward. Reopening per call
//! keeps the type simple and the cost is negligible next to rasterization;
//! pdfium itself caches parsed objects.
//!
//! ## Coordinates
//!
//! pdfium reports positions in PDF space (origin bottom-left, y up). All
//! rectangles leaving this module are converted to the crate's top-down
//! convention so that crops map directly onto raster pixels.

use crate::document::Rect;
use crate::error::{AssetError, LecternError};
use crate::pipeline::encode;
use crate::source::{
    EmbeddedImage, LayoutLine, PageSource, Rasterizer, SourceMetadata, SourcePage,
};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Vertical distance (points) beyond which a character starts a new layout
/// line rather than extending the current one.
const LINE_MERGE_TOLERANCE: f32 = 5.0;

/// A PDF document on disk, opened through pdfium.
pub struct PdfSource {
    pdfium: Pdfium,
    path: PathBuf,
    password: Option<String>,
}

impl PdfSource {
    /// Open a PDF, validating existence and the `%PDF` magic bytes up front
    /// so callers get a typed error rather than a pdfium parse failure.
    pub fn open(
        path: impl AsRef<Path>,
        password: Option<&str>,
    ) -> Result<Self, LecternError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(LecternError::FileNotFound { path });
        }
        match std::fs::File::open(&path) {
            Ok(mut f) => {
                use std::io::Read;
                let mut magic = [0u8; 4];
                if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                    return Err(LecternError::NotAPdf { path, magic });
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(LecternError::PermissionDenied { path });
            }
            Err(_) => {
                return Err(LecternError::FileNotFound { path });
            }
        }

        let source = Self {
            pdfium: Pdfium::default(),
            path,
            password: password.map(|s| s.to_string()),
        };
        // Probe once so corrupt or password-protected files fail at open
        // time, not on the first page fetch.
        source.document()?;
        Ok(source)
    }

    fn document(&self) -> Result<PdfDocument<'_>, LecternError> {
        self.pdfium
            .load_pdf_from_file(&self.path, self.password.as_deref())
            .map_err(|e| LecternError::SourceRead {
                path: self.path.clone(),
                detail: format!("{e:?}"),
            })
    }

    fn page_at<'a>(
        &self,
        document: &'a PdfDocument<'_>,
        page_number: u32,
    ) -> Result<PdfPage<'a>, LecternError> {
        let pages = document.pages();
        let total = pages.len() as u32;
        if page_number < 1 || page_number > total {
            return Err(LecternError::PageOutOfRange {
                page: page_number,
                total,
            });
        }
        pages
            .get((page_number - 1) as u16)
            .map_err(|e| LecternError::SourceRead {
                path: self.path.clone(),
                detail: format!("page {page_number}: {e:?}"),
            })
    }

    /// Merge character boxes into line-level text + bounds.
    ///
    /// Characters arrive in content order; a vertical jump larger than
    /// [`LINE_MERGE_TOLERANCE`] flushes the current line. Resulting order is
    /// the engine's traversal order, not a global visual sort.
    fn layout_lines(page: &PdfPage<'_>, page_height: f32) -> Vec<LayoutLine> {
        let text = match page.text() {
            Ok(t) => t,
            Err(e) => {
                debug!(error = ?e, "no text object for page; skipping layout lines");
                return Vec::new();
            }
        };

        let mut lines = Vec::new();
        let mut current_text = String::new();
        let mut current_bounds: Option<Rect> = None;
        let mut last_top: Option<f32> = None;

        let mut flush = |text: &mut String, bounds: &mut Option<Rect>| {
            if let Some(b) = bounds.take() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(LayoutLine {
                        text: trimmed.to_string(),
                        bounds: b,
                    });
                }
            }
            text.clear();
        };

        let chars = text.chars();
        for ch in chars.iter() {
            let Some(s) = ch.unicode_string() else {
                continue;
            };
            if s.chars().all(|c| c == '\r' || c == '\n') {
                flush(&mut current_text, &mut current_bounds);
                last_top = None;
                continue;
            }
            let Ok(b) = ch.loose_bounds() else { continue };

            // Convert to top-down page coordinates.
            let rect = Rect::new(
                b.left().value,
                page_height - b.top().value,
                b.right().value,
                page_height - b.bottom().value,
            );

            if let Some(prev) = last_top {
                if (rect.y0 - prev).abs() > LINE_MERGE_TOLERANCE {
                    flush(&mut current_text, &mut current_bounds);
                }
            }

            current_text.push_str(&s);
            current_bounds = Some(match current_bounds {
                Some(cur) => cur.union(&rect),
                None => rect,
            });
            last_top = Some(rect.y0);
        }
        flush(&mut current_text, &mut current_bounds);

        lines
    }

    /// Collect embedded image objects with best-effort draw positions.
    ///
    /// Decoded pixels are re-encoded to PNG bytes here; the harvester treats
    /// them like any other container's raw stream. An image object that
    /// fails to yield pixels is skipped with a warning.
    fn embedded_images(page: &PdfPage<'_>, page_number: u32, page_height: f32) -> Vec<EmbeddedImage> {
        let mut images = Vec::new();

        for object in page.objects().iter() {
            let PdfPageObject::Image(image_obj) = &object else {
                continue;
            };

            let bounds = image_obj.bounds().ok().map(|quad| {
                let r = quad.to_rect();
                Rect::new(
                    r.left().value,
                    page_height - r.top().value,
                    r.right().value,
                    page_height - r.bottom().value,
                )
            });

            let pixels = match image_obj.get_raw_image() {
                Ok(img) => img,
                Err(e) => {
                    warn!(page = page_number, error = ?e, "embedded image yielded no pixels; skipping");
                    continue;
                }
            };

            match encode::png_bytes(&pixels) {
                Ok(bytes) => images.push(EmbeddedImage {
                    bytes,
                    format: "png".to_string(),
                    bounds,
                }),
                Err(e) => {
                    warn!(page = page_number, error = %e, "embedded image re-encode failed; skipping");
                }
            }
        }

        images
    }
}

impl PageSource for PdfSource {
    fn page_count(&self) -> Result<u32, LecternError> {
        Ok(self.document()?.pages().len() as u32)
    }

    fn page(&self, page_number: u32) -> Result<SourcePage, LecternError> {
        let document = self.document()?;
        let page = self.page_at(&document, page_number)?;

        let width = page.width().value;
        let height = page.height().value;

        // A page that exposes no text object is an empty page, not an error.
        let text = page
            .text()
            .map(|t| t.all().replace("\r\n", "\n").replace('\r', "\n"))
            .unwrap_or_default();

        Ok(SourcePage {
            text: text.trim().to_string(),
            shapes: Vec::new(),
            layout_lines: Self::layout_lines(&page, height),
            images: Self::embedded_images(&page, page_number, height),
            notes: String::new(),
            width,
            height,
        })
    }

    fn metadata(&self) -> Result<SourceMetadata, LecternError> {
        let document = self.document()?;
        let metadata = document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(SourceMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            has_form_fields: document.form().is_some(),
        })
    }
}

impl Rasterizer for PdfSource {
    fn render_page(&self, page_number: u32, zoom: f32) -> Result<DynamicImage, AssetError> {
        let document = self.document().map_err(|e| AssetError::PageRender {
            detail: e.to_string(),
        })?;
        let page = self.page_at(&document, page_number).map_err(|e| AssetError::PageRender {
            detail: e.to_string(),
        })?;

        let target_width = (page.width().value * zoom).ceil() as i32;
        let target_height = (page.height().value * zoom).ceil() as i32;

        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .set_target_height(target_height);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| AssetError::PageRender {
                detail: format!("{e:?}"),
            })?;

        let image = bitmap.as_image();
        debug!(
            page = page_number,
            width = image.width(),
            height = image.height(),
            "rendered page"
        );
        Ok(image)
    }

    fn render_region(
        &self,
        page_number: u32,
        region: &Rect,
        zoom: f32,
    ) -> Result<DynamicImage, AssetError> {
        // Render the whole page at the requested zoom, then crop. Rendering
        // a sub-rectangle directly would require driving pdfium's clip
        // matrix; a crop of the full-page raster is exact and simpler.
        let full = self.render_page(page_number, zoom)?;

        let left = (region.x0 * zoom).floor().max(0.0) as u32;
        let top = (region.y0 * zoom).floor().max(0.0) as u32;
        let left = left.min(full.width().saturating_sub(1));
        let top = top.min(full.height().saturating_sub(1));
        let width = ((region.width() * zoom).ceil() as u32)
            .min(full.width() - left)
            .max(1);
        let height = ((region.height() * zoom).ceil() as u32)
            .min(full.height() - top)
            .max(1);

        let rgba = full.to_rgba8();
        let cropped = image::imageops::crop_imm(&rgba, left, top, width, height).to_image();
        Ok(DynamicImage::ImageRgba8(cropped))
    }
}
