// Splitter - one PDF per detected document
// - ranges.rs: boundary records -> half-open page ranges
// - artifact.rs: lopdf output document (copied, rendered and placeholder pages)

pub mod artifact;
pub mod ranges;

pub use artifact::{placeholder_text, PdfArtifact, RasterImage};
pub use ranges::compute_ranges;

use crate::config::SplitterConfig;
use crate::error::SieveResult;
use crate::preprocessors::{PageRasterizer, PageSource};
use crate::types::DocumentRange;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory created next to the source when no output dir is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "documentos_separados";

/// Used when a label sanitizes to nothing.
pub const UNTYPED_LABEL: &str = "UNTYPED";

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactOutcome {
    pub range: DocumentRange,
    /// Set only when the file was written
    pub path: Option<PathBuf>,
    pub copied: usize,
    pub rasterized: usize,
    pub placeholders: usize,
    pub error: Option<String>,
}

impl ArtifactOutcome {
    pub fn page_count(&self) -> usize {
        self.copied + self.rasterized + self.placeholders
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitReport {
    pub output_dir: PathBuf,
    pub artifacts: Vec<ArtifactOutcome>,
}

impl SplitReport {
    pub fn written(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.artifacts.iter().filter(|a| a.path.is_some())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.artifacts.iter().filter(|a| a.error.is_some())
    }
}

/// `01_RELATORIO_DE_FISCALIZACAO.pdf`
pub fn artifact_file_name(sequence: usize, label: &str) -> String {
    let sanitized: String = label
        .trim()
        .chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .map(|c| match c {
            ' ' | '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();
    let sanitized = if sanitized.is_empty() {
        UNTYPED_LABEL
    } else {
        sanitized.as_str()
    };
    format!("{sequence:02}_{sanitized}.pdf")
}

/// Writes one artifact per range, degrading page by page:
/// copy, then render, then a placeholder page.
pub struct Splitter {
    rasterizer: Box<dyn PageRasterizer>,
    output_dir: Option<PathBuf>,
    dpi: u32,
    rasterize: bool,
}

impl Splitter {
    pub fn new(config: &SplitterConfig, rasterizer: Box<dyn PageRasterizer>) -> Self {
        Self {
            rasterizer,
            output_dir: config.output_dir.clone(),
            dpi: config.raster_dpi,
            rasterize: config.rasterize,
        }
    }

    pub fn output_dir_for(&self, source: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_OUTPUT_DIR),
        }
    }

    /// Split `source` along `ranges`. Only failing to create the output
    /// directory is an error; per-artifact failures are recorded in the report.
    pub fn split(&self, source: &dyn PageSource, ranges: &[DocumentRange]) -> SieveResult<SplitReport> {
        let output_dir = self.output_dir_for(source.path());
        std::fs::create_dir_all(&output_dir)?;

        let artifacts = ranges
            .iter()
            .map(|range| self.write_artifact(source, range, &output_dir))
            .collect();

        Ok(SplitReport {
            output_dir,
            artifacts,
        })
    }

    fn write_artifact(&self, source: &dyn PageSource, range: &DocumentRange, output_dir: &Path) -> ArtifactOutcome {
        let mut artifact = PdfArtifact::new();
        let mut outcome = ArtifactOutcome {
            range: range.clone(),
            path: None,
            copied: 0,
            rasterized: 0,
            placeholders: 0,
            error: None,
        };

        for page in range.pages() {
            self.add_page(source, page, &mut artifact, &mut outcome);
        }

        let path = output_dir.join(artifact_file_name(range.sequence, &range.label));
        match artifact.save(&path) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    pages = outcome.page_count(),
                    copied = outcome.copied,
                    rasterized = outcome.rasterized,
                    placeholders = outcome.placeholders,
                    "artifact written"
                );
                outcome.path = Some(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "artifact not written");
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }

    fn add_page(&self, source: &dyn PageSource, page: usize, artifact: &mut PdfArtifact, outcome: &mut ArtifactOutcome) {
        let copy_error = match source.copy_page_into(page, artifact) {
            Ok(()) => {
                outcome.copied += 1;
                return;
            }
            Err(e) => e,
        };
        warn!(page = page + 1, error = %copy_error, "page copy failed");

        if self.rasterize {
            let rendered = self
                .rasterizer
                .rasterize(source.path(), page, self.dpi)
                .and_then(|image| artifact.add_image_page(page + 1, &image));
            match rendered {
                Ok(()) => {
                    outcome.rasterized += 1;
                    return;
                }
                Err(e) => {
                    warn!(page = page + 1, rasterizer = self.rasterizer.name(), error = %e, "page render failed");
                }
            }
        }

        match artifact.add_placeholder_page(page + 1, source.media_box(page)) {
            Ok(()) => {
                warn!(page = page + 1, "placeholder page inserted");
                outcome.placeholders += 1;
            }
            Err(e) => {
                warn!(page = page + 1, error = %e, "placeholder page failed");
                outcome.error.get_or_insert_with(|| format!("page {}: {e}", page + 1));
            }
        }
    }
}
