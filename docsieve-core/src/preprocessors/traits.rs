// Collaborator seams around the engines
//
// The classifier needs page text, the splitter needs page copies and page
// renders, the validator needs whole-document text. Each comes through a
// trait so the pipeline can run against lopdf, poppler tools, pre-extracted
// text files or test doubles.

use crate::error::SieveResult;
use crate::splitter::{PdfArtifact, RasterImage};
use std::path::Path;

/// A source PDF opened once for a whole scan-and-split run.
pub trait PageSource {
    fn path(&self) -> &Path;

    fn page_count(&self) -> usize;

    /// Raw text of a 0-based page, line breaks preserved.
    fn page_text(&self, index: usize) -> SieveResult<String>;

    /// `[x0, y0, x1, y1]` in points, inherited values resolved.
    fn media_box(&self, index: usize) -> Option<[f32; 4]>;

    /// Deep-copy a 0-based page into `artifact`. On failure the artifact is
    /// left as it was.
    fn copy_page_into(&self, index: usize, artifact: &mut PdfArtifact) -> SieveResult<()>;
}

/// Renders a single page to pixels.
pub trait PageRasterizer {
    fn rasterize(&self, pdf: &Path, index: usize, dpi: u32) -> SieveResult<RasterImage>;

    fn name(&self) -> &str;
}

/// Turns a whole PDF into plain text.
pub trait TextExtractor {
    fn extract(&self, path: &Path) -> SieveResult<String>;

    /// Stable identifier, part of text cache keys
    fn name(&self) -> &str;

    /// Content hash of any input read besides the artifact itself. Goes
    /// into the text cache key so edits to that input are never masked.
    fn input_fingerprint(&self, _artifact: &Path) -> Option<String> {
        None
    }
}
