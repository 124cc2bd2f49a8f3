//! Error types for the lectern library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LecternError`] — **Fatal**: the document cannot be processed at all
//!   (missing file, unparseable container, provider not configured, storage
//!   write failure). Returned as `Err(LecternError)` from the top-level
//!   operations; no partial record is persisted.
//!
//! * [`AssetError`] — **Non-fatal**: one visual asset failed (a region
//!   render, an embedded-image decode, a text-recognition attempt). The
//!   pipeline logs it and omits the affected optional field; every other
//!   asset and every page survives.
//!
//! Classifier ambiguity is deliberately *not* an error: classification
//! always returns a boolean. LLM call failures are also absent here — they
//! surface as a textual error payload in the answer slot (see
//! [`crate::qa`]), so callers always receive a well-formed answer.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the lectern library.
///
/// Asset-level failures use [`AssetError`] and are logged-and-omitted
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum LecternError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Source errors ─────────────────────────────────────────────────────
    /// The page source could not be opened or parsed. Fatal for the whole
    /// document: no partial record is produced.
    #[error("Failed to read document '{path}': {detail}")]
    SourceRead { path: PathBuf, detail: String },

    /// A requested page number does not exist in the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// Could not create or write the persisted document file.
    #[error("Failed to write document file '{path}': {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read the persisted document file.
    #[error("Failed to read document file '{path}': {source}")]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted document file exists but does not deserialize.
    #[error("Document file '{path}' is not a valid record: {detail}")]
    InvalidDocument { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single visual asset.
///
/// Producers return `Result<_, AssetError>`; the harvest/capture stages
/// decide to log-and-omit, matching the documented policy that one bad
/// asset never escalates to a document-level failure.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    /// Rendering a formula-region crop failed.
    #[error("region render failed: {detail}")]
    RegionRender { detail: String },

    /// Rendering a full page failed.
    #[error("page render failed: {detail}")]
    PageRender { detail: String },

    /// An embedded image's bytes did not decode.
    #[error("image decode failed: {detail}")]
    ImageDecode { detail: String },

    /// Best-effort text recognition failed.
    #[error("text recognition failed: {detail}")]
    Recognition { detail: String },

    /// Encoding a raster to PNG/base64 failed.
    #[error("image encoding failed: {detail}")]
    Encode { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_display() {
        let e = LecternError::PageOutOfRange { page: 12, total: 9 };
        let msg = e.to_string();
        assert!(msg.contains("12"), "got: {msg}");
        assert!(msg.contains("9 pages"), "got: {msg}");
    }

    #[test]
    fn not_a_pdf_display() {
        let e = LecternError::NotAPdf {
            path: PathBuf::from("notes.txt"),
            magic: *b"hell",
        };
        assert!(e.to_string().contains("notes.txt"));
    }

    #[test]
    fn asset_error_display() {
        let e = AssetError::ImageDecode {
            detail: "truncated stream".into(),
        };
        assert!(e.to_string().contains("truncated stream"));
    }
}
