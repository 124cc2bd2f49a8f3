//! Pipeline stages for document processing.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different container backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ flag ──▶ harvest ──▶ capture
//! (pages)    (math?)   (crops)    (page PNGs)
//! ```
//!
//! 1. [`extract`] — turn source pages into ordered [`crate::document::PageRecord`]s
//! 2. [`flag`]    — pure multi-pass math flagging (3-signal OR, then the
//!    heading demotion pass); each pass returns a new flag vector over an
//!    immutable snapshot
//! 3. [`harvest`] — formula crops and embedded-image assets, per-asset
//!    failure isolation
//! 4. [`capture`] — full-page renders for the final positive set only
//! 5. [`encode`]  — raster → base64 data URI plumbing shared by 3 and 4

pub mod capture;
pub mod encode;
pub mod extract;
pub mod flag;
pub mod harvest;
