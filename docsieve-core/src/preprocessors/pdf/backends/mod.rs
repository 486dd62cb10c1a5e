//! External rendering/extraction backends
//!
//! poppler-utils (`pdftoppm`, `pdftotext`) driven as subprocesses. Enabled by
//! the `poppler` feature; without it the splitter has no rasterize step and
//! text comes from lopdf or sidecar files.

#[cfg(feature = "poppler")]
pub mod poppler;

#[cfg(feature = "poppler")]
pub use poppler::{PdftoppmRasterizer, PdftotextExtractor};
