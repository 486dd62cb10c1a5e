//! PDF access through lopdf
//!
//! `LopdfSource` loads the source document once and serves page text, page
//! geometry and page copies from the same in-memory object graph. Rendering
//! and layout-aware text extraction need poppler and live in `backends`.

pub mod backends;

use crate::error::{SieveError, SieveResult};
use crate::preprocessors::traits::{PageRasterizer, PageSource, TextExtractor};
use crate::splitter::artifact::inherited_attribute;
use crate::splitter::{PdfArtifact, RasterImage};
use lopdf::{Document, ObjectId};
use std::path::{Path, PathBuf};

pub struct LopdfSource {
    path: PathBuf,
    doc: Document,
    /// Page object ids in page order
    pages: Vec<ObjectId>,
}

impl LopdfSource {
    /// Load the source PDF. An unreadable or unparsable file is `MissingInput`.
    pub fn open(path: &Path) -> SieveResult<Self> {
        let doc = Document::load(path).map_err(|e| SieveError::missing_input(path, e))?;
        Ok(Self::from_document(path, doc))
    }

    pub fn from_document(path: &Path, doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self {
            path: path.to_path_buf(),
            doc,
            pages,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

impl PageSource for LopdfSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> SieveResult<String> {
        if index >= self.pages.len() {
            return Err(SieveError::missing_input(
                &self.path,
                format!("page {} out of range", index + 1),
            ));
        }
        self.doc
            .extract_text(&[index as u32 + 1])
            .map_err(|e| SieveError::missing_input(&self.path, format!("page {}: {e}", index + 1)))
    }

    fn media_box(&self, index: usize) -> Option<[f32; 4]> {
        let page_id = *self.pages.get(index)?;
        let object = inherited_attribute(&self.doc, page_id, b"MediaBox")?;
        let values = object.as_array().ok()?;
        if values.len() != 4 {
            return None;
        }
        let mut rect = [0.0f32; 4];
        for (slot, value) in rect.iter_mut().zip(values) {
            *slot = value.as_float().ok()?;
        }
        Some(rect)
    }

    fn copy_page_into(&self, index: usize, artifact: &mut PdfArtifact) -> SieveResult<()> {
        let page_id = *self.pages.get(index).ok_or_else(|| SieveError::CopyFailure {
            page: index + 1,
            reason: "page out of range".to_string(),
        })?;
        artifact
            .add_copied_page(&self.doc, page_id)
            .map_err(|e| SieveError::CopyFailure {
                page: index + 1,
                reason: e.to_string(),
            })
    }
}

/// Embedded text layer, every page in order.
#[derive(Debug, Default, Clone)]
pub struct LopdfTextExtractor;

impl TextExtractor for LopdfTextExtractor {
    fn extract(&self, path: &Path) -> SieveResult<String> {
        let doc = Document::load(path).map_err(|e| SieveError::TextExtraction {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let pages: Vec<u32> = doc.get_pages().into_keys().collect();
        doc.extract_text(&pages).map_err(|e| SieveError::TextExtraction {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

/// Rasterizer used when no renderer is available.
#[derive(Debug, Default, Clone)]
pub struct NoRasterizer;

impl PageRasterizer for NoRasterizer {
    fn rasterize(&self, _pdf: &Path, index: usize, _dpi: u32) -> SieveResult<RasterImage> {
        Err(SieveError::RasterizeFailure {
            page: index + 1,
            reason: "no rasterizer configured".to_string(),
        })
    }

    fn name(&self) -> &str {
        "none"
    }
}
