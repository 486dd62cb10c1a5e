use crate::rules::{ProximitySpec, RuleSpec};
use crate::types::AUTO_START_LABEL;
use crate::validator::Checklist;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_lines_per_page() -> usize {
    12
}

fn default_max_offset() -> usize {
    10
}

fn default_max_line_len() -> usize {
    90
}

fn default_min_header_len() -> usize {
    5
}

fn default_auto_start_label() -> String {
    AUTO_START_LABEL.to_string()
}

fn default_raster_dpi() -> u32 {
    144
}

fn default_report_path() -> PathBuf {
    PathBuf::from("validation_report.txt")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

/// Whole-pipeline configuration, one YAML file. Every field has a default so
/// a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SieveConfig {
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub splitter: SplitterConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Required-field checklist applied to every extracted document
    #[serde(default)]
    pub checklist: Checklist,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// One document-type keyword. Without a label, one is derived from the pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl KeywordRule {
    pub fn new(pattern: &str, label: Option<&str>) -> Self {
        Self {
            pattern: pattern.to_string(),
            label: label.map(str::to_string),
        }
    }
}

/// Where the classifier reads page text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageTextMode {
    /// Text layer embedded in the PDF, read with lopdf
    #[default]
    Embedded,
    /// poppler's `pdftotext -layout`, one call per page
    Pdftotext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Only the first N raw lines of a page are inspected
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: usize,
    /// Keyword must start within this many characters of the line start
    #[serde(default = "default_max_offset")]
    pub max_offset: usize,
    /// Longer lines are body text, not headers
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
    #[serde(default = "default_min_header_len")]
    pub min_header_len: usize,
    /// Label forced on page 0 when it has no recognizable header
    #[serde(default = "default_auto_start_label")]
    pub auto_start_label: String,
    /// Ordered by priority; first matching rule wins
    #[serde(default = "default_keywords")]
    pub keywords: Vec<KeywordRule>,
    /// Lines matching any of these are dropped before keyword search
    #[serde(default = "default_noise_patterns")]
    pub noise_patterns: Vec<String>,
    /// A line matching any of these is a numbered section, never a header
    #[serde(default = "default_section_markers")]
    pub section_markers: Vec<String>,
    #[serde(default)]
    pub page_text: PageTextMode,
}

fn default_keywords() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(r"\bOF[IÍ]CIO", Some("OFICIO")),
        KeywordRule::new(r"\bRELAT[ÓO]RIO DE FISCALIZ", Some("RELATORIO DE FISCALIZACAO")),
        KeywordRule::new(r"\bPARECER\b", Some("PARECER")),
        KeywordRule::new(r"\bDESPACHO\b", Some("DESPACHO")),
        KeywordRule::new(r"\bMEMORANDO\b", Some("MEMORANDO")),
        KeywordRule::new(r"\bPORTARIA\b", Some("PORTARIA")),
        KeywordRule::new(r"\bCERTID[ÃA]O(?:\s+DE\b)?", Some("CERTIDAO")),
        KeywordRule::new(r"\bTERMO DE CANCELAMENTO DE DOCUMENTO\b", None),
        KeywordRule::new(r"\bRECIBO ELETR[OÔ]NICO DE PROTOCOLO\b", None),
    ]
}

fn default_noise_patterns() -> Vec<String> {
    [
        r"^ANEXOS?:",
        r"^REFER[ÊE]NCIA:",
        r"WWW\.",
        r"TELEFONE",
        r"\bCEP\b",
        r"SAUS|ASA SUL|BRAS[ÍI]LIA",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_section_markers() -> Vec<String> {
    [r"^[IVXLCDM]+\s*[-–]", r"^\d+\s*[-.–]", r"^[A-Z]\s*[-.–]", r"\bVIDE\b"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            lines_per_page: default_lines_per_page(),
            max_offset: default_max_offset(),
            max_line_len: default_max_line_len(),
            min_header_len: default_min_header_len(),
            auto_start_label: default_auto_start_label(),
            keywords: default_keywords(),
            noise_patterns: default_noise_patterns(),
            section_markers: default_section_markers(),
            page_text: PageTextMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// false = scan only, no artifacts written
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to `<source dir>/documentos_separados`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_raster_dpi")]
    pub raster_dpi: u32,
    /// Try rasterizing a page whose copy failed before using a placeholder
    #[serde(default = "default_true")]
    pub rasterize: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: None,
            raster_dpi: default_raster_dpi(),
            rasterize: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextBackend {
    #[default]
    Embedded,
    Pdftotext,
    /// Pre-extracted `<stem>.txt` files in `sidecar_dir`
    Sidecar,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub text_backend: TextBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar_dir: Option<PathBuf>,
    /// Replaces the built-in rule catalog when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleSpec>>,
    /// Replaces the built-in proximity rules when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proximity_rules: Option<Vec<ProximitySpec>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_path")]
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_cache_dir(),
        }
    }
}

impl SieveConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: SieveConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` when one is given, otherwise the built-in defaults.
    /// A file that is named but unreadable or malformed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
