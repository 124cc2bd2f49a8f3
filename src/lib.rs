//! # lectern
//!
//! Ask natural-language questions about slide decks and PDF lecture notes
//! using multimodal LLMs.
//!
//! ## Why this crate?
//!
//! Plain text extraction loses exactly the material students ask about
//! most: formulas, diagrams, annotated figures. lectern extracts per-page
//! text, detects which pages carry mathematical notation with a layered
//! heuristic classifier, crops the formula regions and captures flagged
//! pages as images, and grounds each answer in that mixed text+raster
//! context. Answers come back as HTML with clickable slide references.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Extract   one PageRecord per page/slide (title, content, notes)
//!  ├─ 2. Flag      math detection: 3-signal OR, then heading demotion
//!  ├─ 3. Harvest   formula crops + embedded images (per-asset isolation)
//!  ├─ 4. Capture   full-page PNGs for the flagged set only
//!  ├─ 5. Persist   one JSON record, rasters inline as data URIs
//!  │
//!  └─ per question:
//!     Assemble ──▶ LLM ──▶ Postprocess
//!     (bounded ctx) (vision) (HTML + slide anchors)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lectern::{build_enhanced, ask, LecternConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = LecternConfig::default();
//!     let record = build_enhanced("lecture03.pdf", &config)?;
//!     let answer = ask(&record, "What does Bragg's law state?", None, true, &config).await;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lectern` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! lectern = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod classifier;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod postprocess;
pub mod process;
pub mod prompts;
pub mod qa;
pub mod source;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use classifier::MathClassifier;
pub use config::{LecternConfig, LecternConfigBuilder, DEFAULT_DOMAIN_TERMS};
pub use context::{assemble_context, AttachmentKind, PromptContext, VisualAttachment};
pub use document::{
    DocumentMetadata, DocumentRecord, FormulaRegion, ImageAsset, PageDimensions, PageRecord, Rect,
};
pub use error::{AssetError, LecternError};
pub use postprocess::postprocess_answer;
pub use process::{
    analyze, build_enhanced, build_enhanced_from_source, extract, extract_from_source, ingest,
    PageMathAnalysis,
};
pub use qa::{ask, ask_sync};
pub use source::{
    memory::MemorySource, pdf::PdfSource, NoopRecognizer, PageSource, Rasterizer, TextRecognizer,
};
pub use storage::{document_path, load_document, load_document_from, save_document};
