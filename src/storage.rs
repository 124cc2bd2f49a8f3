//! Persistence: one JSON file per document.
//!
//! The record serializes to `<storage_dir>/<basename>_slides.json`, with
//! every raster embedded inline as a base64 data URI. Writes go through a
//! temp file plus rename so a crash mid-write never leaves a truncated
//! record behind — reprocessing replaces the file wholesale.

use crate::document::DocumentRecord;
use crate::error::LecternError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The on-disk path for a document's record.
pub fn document_path(dir: impl AsRef<Path>, basename: &str) -> PathBuf {
    dir.as_ref().join(format!("{basename}_slides.json"))
}

/// Serialize and persist a record atomically. Returns the final path.
pub fn save_document(
    record: &DocumentRecord,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, LecternError> {
    let dir = dir.as_ref();
    let path = document_path(dir, &record.basename);

    std::fs::create_dir_all(dir).map_err(|e| LecternError::StorageWrite {
        path: path.clone(),
        source: e,
    })?;

    let json = serde_json::to_vec_pretty(record)
        .map_err(|e| LecternError::Internal(format!("record serialization failed: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &json).map_err(|e| LecternError::StorageWrite {
        path: path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, &path).map_err(|e| LecternError::StorageWrite {
        path: path.clone(),
        source: e,
    })?;

    info!(path = %path.display(), bytes = json.len(), "saved document record");
    Ok(path)
}

/// Load a record from an explicit file path.
pub fn load_document(path: impl AsRef<Path>) -> Result<DocumentRecord, LecternError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| LecternError::StorageRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let record: DocumentRecord =
        serde_json::from_slice(&bytes).map_err(|e| LecternError::InvalidDocument {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    debug!(
        path = %path.display(),
        pages = record.pages.len(),
        "loaded document record"
    );
    Ok(record)
}

/// Load a record by basename from a storage directory.
pub fn load_document_from(
    dir: impl AsRef<Path>,
    basename: &str,
) -> Result<DocumentRecord, LecternError> {
    load_document(document_path(dir, basename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentMetadata, PageRecord};

    fn sample_record() -> DocumentRecord {
        DocumentRecord {
            filename: "optics.pdf".into(),
            basename: "optics".into(),
            total_pages: 1,
            extraction_time: "2025-06-01 10:00:00".into(),
            metadata: DocumentMetadata::default(),
            pages: vec![PageRecord {
                page_number: 1,
                title: "Snell's law".into(),
                content_lines: vec!["n1 sinθ1 = n2 sinθ2".into()],
                notes: String::new(),
                full_text: "Snell's law\nn1 sinθ1 = n2 sinθ2".into(),
                has_math_content: true,
                page_image: None,
            }],
            formulas: vec![],
            images: vec![],
            math_content_pages: vec![1],
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let record = sample_record();
        let path = save_document(&record, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("optics_slides.json"));

        let loaded = load_document_from(dir.path(), "optics").unwrap();
        assert_eq!(loaded.filename, record.filename);
        assert_eq!(loaded.pages[0].full_text, record.pages[0].full_text);
        assert_eq!(loaded.math_content_pages, vec![1]);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        save_document(&sample_record(), dir.path()).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn loading_missing_record_fails_typed() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document_from(dir.path(), "ghost").unwrap_err();
        assert!(matches!(err, LecternError::StorageRead { .. }));
    }

    #[test]
    fn loading_garbage_fails_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_slides.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, LecternError::InvalidDocument { .. }));
    }
}
