use crate::error::{SieveError, SieveResult};
use crate::preprocessors::traits::{PageRasterizer, TextExtractor};
use crate::splitter::RasterImage;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use tracing::debug;

const PDFTOPPM: &str = "pdftoppm (install poppler-utils)";
const PDFTOTEXT: &str = "pdftotext (install poppler-utils)";

/// stdout on success; a missing binary becomes `ToolNotFound`.
fn command_stdout(
    result: std::io::Result<Output>,
    tool: &str,
    on_failure: impl FnOnce(String) -> SieveError,
) -> SieveResult<Vec<u8>> {
    match result {
        Ok(output) if output.status.success() => Ok(output.stdout),
        Ok(output) => Err(on_failure(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SieveError::ToolNotFound(tool.to_string()))
        }
        Err(e) => Err(SieveError::Io(e)),
    }
}

/// Renders one page with `pdftoppm -png` into a scratch directory and
/// decodes it with `image`.
#[derive(Debug, Default, Clone)]
pub struct PdftoppmRasterizer;

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &Path, index: usize, dpi: u32) -> SieveResult<RasterImage> {
        let page = index + 1;
        let failure = |reason: String| SieveError::RasterizeFailure { page, reason };

        let scratch = TempDir::new()?;
        let prefix = scratch.path().join("page");
        let page_str = page.to_string();
        let dpi_str = dpi.to_string();

        let output = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi_str, "-f", &page_str, "-l", &page_str, "-singlefile"])
            .arg(pdf)
            .arg(&prefix)
            .output();
        command_stdout(output, PDFTOPPM, failure)?;

        let image = load_raster(&prefix.with_extension("png"), dpi).map_err(failure)?;
        debug!(page, width = image.width, height = image.height, dpi, "page rasterized");
        Ok(image)
    }

    fn name(&self) -> &str {
        "pdftoppm"
    }
}

/// Decode a rendered page into 8-bit RGB.
fn load_raster(path: &Path, dpi: u32) -> Result<RasterImage, String> {
    let rgb = image::open(path)
        .map_err(|e| format!("failed to load rendered page: {e}"))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(RasterImage {
        width,
        height,
        dpi,
        rgb: rgb.into_raw(),
    })
}

/// `pdftotext -layout`, whole document or one page.
#[derive(Debug, Default, Clone)]
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Text of a 0-based page.
    pub fn extract_page(&self, path: &Path, index: usize) -> SieveResult<String> {
        let page_str = (index + 1).to_string();
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(path)
            .arg("-")
            .output();
        let stdout = command_stdout(output, PDFTOTEXT, |reason| {
            SieveError::missing_input(path, format!("page {page_str}: {reason}"))
        })?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

impl TextExtractor for PdftotextExtractor {
    fn extract(&self, path: &Path) -> SieveResult<String> {
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .output();
        let stdout = command_stdout(output, PDFTOTEXT, |reason| SieveError::TextExtraction {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn name(&self) -> &str {
        "pdftotext"
    }
}
