//! Raster encoding: `DynamicImage` → base64 data URI, and back apart.
//!
//! Everything the record embeds — formula crops, page captures, harvested
//! images — travels as an inline `data:image/...;base64,...` string inside
//! the persisted JSON, never as a sibling file. PNG is the default target
//! because it is lossless: compression artefacts on rendered text confuse
//! vision models far more than the larger payload costs.

use crate::error::AssetError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a raster as PNG bytes.
pub fn png_bytes(img: &DynamicImage) -> Result<Vec<u8>, AssetError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| AssetError::Encode {
            detail: e.to_string(),
        })?;
    Ok(buf)
}

/// Encode a raster as a PNG data URI.
pub fn png_data_uri(img: &DynamicImage) -> Result<String, AssetError> {
    let bytes = png_bytes(img)?;
    let uri = data_uri(&bytes, "image/png");
    debug!(bytes = uri.len(), "encoded raster to data URI");
    Ok(uri)
}

/// Wrap already-encoded bytes in a data URI with the given MIME type.
pub fn data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// MIME type for a declared image format. Unknown formats fall back to
/// PNG, the only thing this crate itself ever emits.
pub fn mime_for_format(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        _ => "image/png",
    }
}

/// Split a data URI into `(mime, base64_payload)`. Returns `None` for
/// anything that is not a base64 data URI.
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    Some((mime, payload))
}
