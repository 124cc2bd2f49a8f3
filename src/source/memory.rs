//! In-memory [`PageSource`] + [`Rasterizer`].
//!
//! Serves two audiences: embedders that already hold extracted slide
//! content (a deck reader, an office-suite bridge) and the test suite,
//! which needs deterministic pages and injectable render failures without
//! a real container on disk.

use crate::document::Rect;
use crate::error::{AssetError, LecternError};
use crate::source::{
    EmbeddedImage, LayoutLine, PageSource, Rasterizer, Shape, SourceMetadata, SourcePage,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::HashSet;

/// A fully materialized in-memory document.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: Vec<SourcePage>,
    metadata: SourceMetadata,
    /// Page numbers whose renders fail, for exercising the non-fatal paths.
    failing_render_pages: HashSet<u32>,
}

impl MemorySource {
    pub fn new(pages: Vec<SourcePage>) -> Self {
        Self {
            pages,
            metadata: SourceMetadata::default(),
            failing_render_pages: HashSet::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Make every render call for `page_number` fail.
    pub fn with_failing_render(mut self, page_number: u32) -> Self {
        self.failing_render_pages.insert(page_number);
        self
    }

    /// Convenience: a text-only page sized like a 4:3 slide, with one
    /// layout line per text line stacked top to bottom.
    pub fn text_page(text: &str) -> SourcePage {
        let mut layout_lines = Vec::new();
        let mut y = 40.0_f32;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            layout_lines.push(LayoutLine {
                text: line.trim().to_string(),
                bounds: Rect::new(40.0, y, 40.0 + line.trim().len() as f32 * 6.0, y + 14.0),
            });
            y += 20.0;
        }
        SourcePage {
            text: text.trim().to_string(),
            shapes: Vec::new(),
            layout_lines,
            images: Vec::new(),
            notes: String::new(),
            width: 720.0,
            height: 540.0,
        }
    }

    /// Convenience: a slide-style page built from shapes.
    pub fn slide_page(shapes: Vec<Shape>, notes: &str) -> SourcePage {
        let text = shapes
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        SourcePage {
            text,
            shapes,
            layout_lines: Vec::new(),
            images: Vec::new(),
            notes: notes.to_string(),
            width: 720.0,
            height: 540.0,
        }
    }

    /// Attach an embedded image built from a solid-color raster.
    pub fn push_image(page: &mut SourcePage, width: u32, height: u32, bounds: Option<Rect>) {
        let raster = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([90, 120, 200, 255]),
        ));
        let bytes = crate::pipeline::encode::png_bytes(&raster).expect("encode solid raster");
        page.images.push(EmbeddedImage {
            bytes,
            format: "png".to_string(),
            bounds,
        });
    }
}

impl PageSource for MemorySource {
    fn page_count(&self) -> Result<u32, LecternError> {
        Ok(self.pages.len() as u32)
    }

    fn page(&self, page_number: u32) -> Result<SourcePage, LecternError> {
        self.pages
            .get(page_number.checked_sub(1).unwrap_or(u32::MAX) as usize)
            .cloned()
            .ok_or(LecternError::PageOutOfRange {
                page: page_number,
                total: self.pages.len() as u32,
            })
    }

    fn metadata(&self) -> Result<SourceMetadata, LecternError> {
        Ok(self.metadata.clone())
    }
}

impl Rasterizer for MemorySource {
    fn render_page(&self, page_number: u32, zoom: f32) -> Result<DynamicImage, AssetError> {
        if self.failing_render_pages.contains(&page_number) {
            return Err(AssetError::PageRender {
                detail: format!("injected failure for page {page_number}"),
            });
        }
        let page = self
            .pages
            .get((page_number as usize).saturating_sub(1))
            .ok_or(AssetError::PageRender {
                detail: format!("page {page_number} out of range"),
            })?;
        let w = ((page.width * zoom).ceil() as u32).max(1);
        let h = ((page.height * zoom).ceil() as u32).max(1);
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba([255, 255, 255, 255]),
        )))
    }

    fn render_region(
        &self,
        page_number: u32,
        region: &Rect,
        zoom: f32,
    ) -> Result<DynamicImage, AssetError> {
        if self.failing_render_pages.contains(&page_number) {
            return Err(AssetError::RegionRender {
                detail: format!("injected failure for page {page_number}"),
            });
        }
        let w = ((region.width() * zoom).ceil() as u32).max(1);
        let h = ((region.height() * zoom).ceil() as u32).max(1);
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba([255, 255, 255, 255]),
        )))
    }
}
