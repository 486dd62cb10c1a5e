use crate::error::SieveResult;
use crate::types::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One validation result as recorded in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub run_id: Uuid,
    /// Source PDF (or text directory) the document came from
    pub source: String,
    /// Content hash of the source, when it was readable
    pub source_fingerprint: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub result: ValidationResult,
}

impl ReportEntry {
    pub fn new(run_id: Uuid, source: &str, source_fingerprint: Option<String>, result: ValidationResult) -> Self {
        Self {
            run_id,
            source: source.to_string(),
            source_fingerprint,
            recorded_at: Utc::now(),
            result,
        }
    }

    /// Human-readable block, blank line terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "==== {} run={} ====",
            self.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.run_id
        );
        match &self.source_fingerprint {
            Some(fingerprint) => {
                let _ = writeln!(out, "source: {} (sha256:{})", self.source, fingerprint);
            }
            None => {
                let _ = writeln!(out, "source: {}", self.source);
            }
        }
        let _ = writeln!(out, "document: {}", self.result.document);
        for field in &self.result.fields {
            let status = if field.present { "OK" } else { "MISSING" };
            let _ = writeln!(out, " - {}: {}", field.label, status);
        }
        let overall = if self.result.overall { "COMPLETE" } else { "INCOMPLETE" };
        let _ = writeln!(out, "overall: {overall}");
        out.push('\n');
        out
    }
}

/// Append-only sink for validation results. Recorded entries are never
/// rewritten.
pub trait ReportStore {
    fn append(&mut self, entry: &ReportEntry) -> SieveResult<()>;
}

/// Appends rendered entries to a text file, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileReportStore {
    path: PathBuf,
}

impl FileReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportStore for FileReportStore {
    fn append(&mut self, entry: &ReportEntry) -> SieveResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.render().as_bytes())?;
        Ok(())
    }
}

/// Keeps entries in memory, for library callers that want results back.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportStore {
    entries: Vec<ReportEntry>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }
}

impl ReportStore for MemoryReportStore {
    fn append(&mut self, entry: &ReportEntry) -> SieveResult<()> {
        self.entries.push(entry.clone());
        Ok(())
    }
}
