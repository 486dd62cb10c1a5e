use crate::error::{SieveError, SieveResult};
use crate::preprocessors::traits::TextExtractor;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Reads text produced by a separate extraction stage: `<dir>/<stem>.txt` for
/// an artifact `<anything>/<stem>.pdf`.
#[derive(Debug, Clone)]
pub struct SidecarTextExtractor {
    dir: PathBuf,
}

impl SidecarTextExtractor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sidecar_path(&self, artifact: &Path) -> Option<PathBuf> {
        let stem = artifact.file_stem()?;
        Some(self.dir.join(format!("{}.txt", stem.to_string_lossy())))
    }
}

impl TextExtractor for SidecarTextExtractor {
    fn extract(&self, path: &Path) -> SieveResult<String> {
        let sidecar = self
            .sidecar_path(path)
            .ok_or_else(|| SieveError::TextExtraction {
                path: path.to_path_buf(),
                reason: "artifact path has no file name".to_string(),
            })?;
        std::fs::read_to_string(&sidecar).map_err(|e| SieveError::TextExtraction {
            path: path.to_path_buf(),
            reason: format!("{}: {e}", sidecar.display()),
        })
    }

    fn name(&self) -> &str {
        "sidecar"
    }

    /// Whole-file SHA-256 of the sidecar; None when it cannot be read.
    fn input_fingerprint(&self, artifact: &Path) -> Option<String> {
        let bytes = std::fs::read(self.sidecar_path(artifact)?).ok()?;
        Some(format!("{:x}", Sha256::digest(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_matching_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("01_OFICIO.txt"), "OFÍCIO Nº 1").unwrap();

        let extractor = SidecarTextExtractor::new(dir.path());
        let text = extractor
            .extract(Path::new("/elsewhere/documentos_separados/01_OFICIO.pdf"))
            .unwrap();
        assert_eq!(text, "OFÍCIO Nº 1");
    }

    #[test]
    fn test_fingerprint_follows_sidecar_content() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = SidecarTextExtractor::new(dir.path());
        let artifact = Path::new("01_OFICIO.pdf");
        assert_eq!(extractor.input_fingerprint(artifact), None);

        std::fs::write(dir.path().join("01_OFICIO.txt"), "sem nada").unwrap();
        let before = extractor.input_fingerprint(artifact).unwrap();
        std::fs::write(dir.path().join("01_OFICIO.txt"), "sem tudo").unwrap();
        let after = extractor.input_fingerprint(artifact).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_sidecar_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = SidecarTextExtractor::new(dir.path());
        let err = extractor.extract(Path::new("02_PARECER.pdf")).unwrap_err();
        assert!(matches!(err, SieveError::TextExtraction { .. }));
        assert!(!err.is_fatal());
    }
}
