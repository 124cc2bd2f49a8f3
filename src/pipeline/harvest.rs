//! Visual asset harvesting: formula crops and embedded images.
//!
//! Every failure in here is an [`AssetError`]: logged, the asset (or just
//! its optional field) omitted, processing continues. Nothing in this
//! module can fail a document.

use crate::classifier::MathClassifier;
use crate::config::LecternConfig;
use crate::document::{FormulaRegion, ImageAsset};
use crate::pipeline::encode;
use crate::source::{Rasterizer, SourcePage, TextRecognizer};
use tracing::{debug, warn};

/// Crop a region for every layout line the classifier accepts.
///
/// Regions are padded by `config.formula_padding` points per side, clamped
/// to the page box, and rendered at `config.zoom`. Output order follows
/// layout traversal order; callers must not assume a global visual sort.
pub fn harvest_formulas<R: Rasterizer>(
    page_number: u32,
    page: &SourcePage,
    classifier: &MathClassifier,
    rasterizer: &R,
    config: &LecternConfig,
) -> Vec<FormulaRegion> {
    let mut regions = Vec::new();

    for line in &page.layout_lines {
        if !classifier.classify(&line.text) {
            continue;
        }
        if regions.len() >= config.max_formula_regions_per_page {
            warn!(
                page = page_number,
                cap = config.max_formula_regions_per_page,
                "formula region cap reached; remaining lines on this page skipped"
            );
            break;
        }

        let bbox = line
            .bounds
            .expanded(config.formula_padding, page.width, page.height);

        let raster = match rasterizer.render_region(page_number, &bbox, config.zoom) {
            Ok(r) => r,
            Err(e) => {
                warn!(page = page_number, error = %e, line = %line.text, "formula region skipped");
                continue;
            }
        };
        let rendered_image = match encode::png_data_uri(&raster) {
            Ok(uri) => uri,
            Err(e) => {
                warn!(page = page_number, error = %e, "formula region encoding skipped");
                continue;
            }
        };

        regions.push(FormulaRegion {
            page_number,
            source_text: line.text.clone(),
            bounding_box: bbox,
            rendered_image,
        });
    }

    debug!(
        page = page_number,
        regions = regions.len(),
        "harvested formula regions"
    );
    regions
}

/// Turn every embedded raster reference into an [`ImageAsset`].
///
/// Decode failures drop the single asset; recognition failures only drop
/// the OCR fields. Position is whatever the source could correlate —
/// absence is not an error.
pub fn harvest_images(
    page_number: u32,
    page: &SourcePage,
    recognizer: Option<&dyn TextRecognizer>,
) -> Vec<ImageAsset> {
    let mut assets = Vec::new();

    for (index, embedded) in page.images.iter().enumerate() {
        let index = index as u32;

        let pixels = match image::load_from_memory(&embedded.bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    page = page_number,
                    index,
                    error = %e,
                    "embedded image did not decode; asset omitted"
                );
                continue;
            }
        };

        let ocr_text = match recognizer {
            Some(r) => match r.recognize(&pixels) {
                Ok(text) => text.filter(|t| !t.trim().is_empty()),
                Err(e) => {
                    warn!(page = page_number, index, error = %e, "text recognition skipped");
                    None
                }
            },
            None => None,
        };

        let mime = encode::mime_for_format(&embedded.format);
        assets.push(ImageAsset {
            page_number,
            index,
            width: pixels.width(),
            height: pixels.height(),
            format: embedded.format.clone(),
            bounding_box: embedded.bounds,
            rendered_image: encode::data_uri(&embedded.bytes, mime),
            alt_text: ocr_text.clone(),
            ocr_text,
        });
    }

    debug!(
        page = page_number,
        assets = assets.len(),
        "harvested image assets"
    );
    assets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Rect;
    use crate::error::AssetError;
    use crate::source::memory::MemorySource;
    use crate::source::EmbeddedImage;
    use image::DynamicImage;

    fn config() -> LecternConfig {
        LecternConfig::default()
    }

    #[test]
    fn only_mathy_lines_become_regions() {
        let page = MemorySource::text_page("Overview\nnλ = 2d sinθ\nplain prose here");
        let source = MemorySource::new(vec![page.clone()]);
        let regions = harvest_formulas(1, &page, &MathClassifier::default(), &source, &config());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].source_text, "nλ = 2d sinθ");
        assert!(regions[0].rendered_image.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn region_bounds_are_padded_and_clamped() {
        let page = MemorySource::text_page("x = 1");
        let source = MemorySource::new(vec![page.clone()]);
        let regions = harvest_formulas(1, &page, &MathClassifier::default(), &source, &config());
        let bbox = regions[0].bounding_box;
        let line = &page.layout_lines[0].bounds;
        assert!(bbox.x0 <= line.x0 - 9.9 && bbox.x0 >= 0.0);
        assert!(bbox.y1 >= line.y1 + 9.9 && bbox.y1 <= page.height);
    }

    #[test]
    fn render_failure_skips_region_not_page() {
        let page = MemorySource::text_page("a = 1\nb = 2");
        let source = MemorySource::new(vec![page.clone()]).with_failing_render(1);
        let regions = harvest_formulas(1, &page, &MathClassifier::default(), &source, &config());
        assert!(regions.is_empty());
    }

    #[test]
    fn region_cap_is_enforced() {
        let mut text = String::new();
        for i in 0..30 {
            text.push_str(&format!("y = {i}\n"));
        }
        let page = MemorySource::text_page(&text);
        let source = MemorySource::new(vec![page.clone()]);
        let cfg = LecternConfig::builder()
            .max_formula_regions_per_page(5)
            .build()
            .unwrap();
        let regions = harvest_formulas(1, &page, &MathClassifier::default(), &source, &cfg);
        assert_eq!(regions.len(), 5);
    }

    #[test]
    fn images_are_stamped_with_page_and_index() {
        let mut page = MemorySource::text_page("with pictures");
        MemorySource::push_image(&mut page, 32, 16, Some(Rect::new(10.0, 10.0, 42.0, 26.0)));
        MemorySource::push_image(&mut page, 8, 8, None);
        let assets = harvest_images(5, &page, None);
        assert_eq!(assets.len(), 2);
        assert_eq!((assets[0].page_number, assets[0].index), (5, 0));
        assert_eq!((assets[1].page_number, assets[1].index), (5, 1));
        assert_eq!((assets[0].width, assets[0].height), (32, 16));
        assert!(assets[0].bounding_box.is_some());
        assert!(assets[1].bounding_box.is_none());
        assert!(assets[0].ocr_text.is_none());
    }

    #[test]
    fn undecodable_image_is_omitted_others_survive() {
        let mut page = MemorySource::text_page("with pictures");
        MemorySource::push_image(&mut page, 16, 16, None);
        page.images.push(EmbeddedImage {
            bytes: b"definitely not an image stream".to_vec(),
            format: "png".into(),
            bounds: None,
        });
        MemorySource::push_image(&mut page, 24, 24, None);

        let assets = harvest_images(5, &page, None);
        assert_eq!(assets.len(), 2, "only the corrupt asset is dropped");
        // Indexes keep creation order even across the dropped asset.
        assert_eq!(assets[0].index, 0);
        assert_eq!(assets[1].index, 2);
    }

    struct FailingRecognizer;
    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _: &DynamicImage) -> Result<Option<String>, AssetError> {
            Err(AssetError::Recognition {
                detail: "engine unavailable".into(),
            })
        }
    }

    struct EchoRecognizer;
    impl TextRecognizer for EchoRecognizer {
        fn recognize(&self, _: &DynamicImage) -> Result<Option<String>, AssetError> {
            Ok(Some("lattice diagram".into()))
        }
    }

    #[test]
    fn recognition_failure_keeps_the_asset() {
        let mut page = MemorySource::text_page("pic");
        MemorySource::push_image(&mut page, 16, 16, None);
        let assets = harvest_images(1, &page, Some(&FailingRecognizer));
        assert_eq!(assets.len(), 1);
        assert!(assets[0].ocr_text.is_none());
        assert!(assets[0].alt_text.is_none());
    }

    #[test]
    fn recognized_text_fills_both_fields() {
        let mut page = MemorySource::text_page("pic");
        MemorySource::push_image(&mut page, 16, 16, None);
        let assets = harvest_images(1, &page, Some(&EchoRecognizer));
        assert_eq!(assets[0].ocr_text.as_deref(), Some("lattice diagram"));
        assert_eq!(assets[0].alt_text.as_deref(), Some("lattice diagram"));
    }
}
