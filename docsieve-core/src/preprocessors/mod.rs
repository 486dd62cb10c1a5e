//! Document access layer
//!
//! Everything that touches PDF bytes or external tools lives here; the
//! engines above only see text and page indices.
//!
//! ## Architecture
//!
//! ```text
//! source PDF
//!     ↓
//! [PageSource]  ── page text ──→ BoundaryClassifier
//!     │
//!     ├── page copy ──→ PdfArtifact
//!     └── [PageRasterizer] ── page image ──→ PdfArtifact (fallback)
//!
//! artifact PDF ──→ [TextExtractor] ──→ EntityExtractor
//! ```
//!
//! ## Available implementations
//!
//! - `LopdfSource` - source pages via lopdf
//! - `LopdfTextExtractor` - embedded text layer via lopdf
//! - `SidecarTextExtractor` - pre-extracted `<stem>.txt` files
//! - `PdftoppmRasterizer`, `PdftotextExtractor` - poppler tools (feature `poppler`)
//! - `NoRasterizer` - always fails, sends the splitter straight to placeholders

pub mod pdf;
pub mod sidecar;
pub mod traits;

pub use pdf::{LopdfSource, LopdfTextExtractor, NoRasterizer};
pub use sidecar::SidecarTextExtractor;
pub use traits::{PageRasterizer, PageSource, TextExtractor};

#[cfg(feature = "poppler")]
pub use pdf::backends::{PdftoppmRasterizer, PdftotextExtractor};
