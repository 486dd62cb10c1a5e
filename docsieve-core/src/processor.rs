use crate::cache::{TextCacheKey, TextCacheValue};
use crate::classifier::BoundaryClassifier;
use crate::config::{PageTextMode, SieveConfig, TextBackend};
use crate::error::{SieveError, SieveResult};
use crate::extractor::EntityExtractor;
use crate::preprocessors::{
    LopdfSource, LopdfTextExtractor, NoRasterizer, PageRasterizer, PageSource,
    SidecarTextExtractor, TextExtractor,
};
use crate::report::{ReportEntry, ReportStore};
use crate::rules::{default_proximity_rules, default_rules};
use crate::splitter::{compute_ranges, SplitReport, Splitter};
use crate::storage::{calculate_pdf_hash, FileStorage, NoOpStorage, TextStorage};
use crate::types::*;
use crate::validator::validate;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[cfg(feature = "poppler")]
use crate::preprocessors::{PdftoppmRasterizer, PdftotextExtractor};

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        debug!(step = step_name, elapsed_ms = elapsed.as_millis() as u64, "step finished");
        self.timings.push((step_name.to_string(), elapsed));

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Entities and checklist outcome for one embedded document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub document: String,
    pub entities: EntityMap,
    pub validation: ValidationResult,
}

/// A document whose text could not be obtained.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedDocument {
    pub document: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisSummary {
    pub documents: Vec<DocumentReport>,
    pub skipped: Vec<SkippedDocument>,
}

impl AnalysisSummary {
    pub fn complete(&self) -> usize {
        self.documents.iter().filter(|d| d.validation.overall).count()
    }
}

/// Everything one `run` produced for one source PDF.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub source: PathBuf,
    pub source_fingerprint: String,
    pub scan: ScanOutcome,
    pub ranges: Vec<DocumentRange>,
    /// None when splitting is disabled
    pub split: Option<SplitReport>,
    pub analysis: AnalysisSummary,
}

/// The scan → split → extract → validate pipeline.
pub struct DocumentSieve {
    config: SieveConfig,
    classifier: BoundaryClassifier,
    extractor: EntityExtractor,
    splitter: Splitter,
    text_extractor: Box<dyn TextExtractor>,
    storage: Box<dyn TextStorage>,
    run_id: Uuid,
}

impl DocumentSieve {
    /// Create DocumentSieve with full dependency injection.
    /// Fails only on a malformed rule or pattern.
    pub fn new_with_dependencies(
        config: SieveConfig,
        rasterizer: Box<dyn PageRasterizer>,
        text_extractor: Box<dyn TextExtractor>,
        storage: Box<dyn TextStorage>,
    ) -> SieveResult<Self> {
        let classifier = BoundaryClassifier::new(&config.boundary)?;

        let rules = config.extraction.rules.clone().unwrap_or_else(default_rules);
        let proximity = config
            .extraction
            .proximity_rules
            .clone()
            .unwrap_or_else(default_proximity_rules);
        let extractor = EntityExtractor::from_specs(&rules, &proximity)?;

        for label in config.checklist.unknown_labels(extractor.labels()) {
            warn!(label, "checklist label has no extraction rule; it will always be missing");
        }

        let splitter = Splitter::new(&config.splitter, rasterizer);

        Ok(Self {
            config,
            classifier,
            extractor,
            splitter,
            text_extractor,
            storage,
            run_id: Uuid::new_v4(),
        })
    }

    /// Wire collaborators from configuration: poppler tools when built with
    /// the `poppler` feature, the configured text backend and cache.
    pub fn from_config(config: SieveConfig) -> Result<Self> {
        #[cfg(feature = "poppler")]
        let rasterizer: Box<dyn PageRasterizer> = if config.splitter.rasterize {
            Box::new(PdftoppmRasterizer::new())
        } else {
            Box::new(NoRasterizer)
        };
        #[cfg(not(feature = "poppler"))]
        let rasterizer: Box<dyn PageRasterizer> = Box::new(NoRasterizer);

        let text_extractor: Box<dyn TextExtractor> = match config.extraction.text_backend {
            TextBackend::Embedded => Box::new(LopdfTextExtractor),
            #[cfg(feature = "poppler")]
            TextBackend::Pdftotext => Box::new(PdftotextExtractor::new()),
            #[cfg(not(feature = "poppler"))]
            TextBackend::Pdftotext => {
                return Err(SieveError::Config(
                    "text_backend pdftotext requires the poppler feature".to_string(),
                )
                .into())
            }
            TextBackend::Sidecar => {
                let dir = config.extraction.sidecar_dir.clone().ok_or_else(|| {
                    SieveError::Config("text_backend sidecar requires sidecar_dir".to_string())
                })?;
                Box::new(SidecarTextExtractor::new(dir))
            }
        };

        let storage: Box<dyn TextStorage> = if config.cache.enabled {
            Box::new(
                FileStorage::new(&config.cache.dir)
                    .with_context(|| format!("creating cache dir {}", config.cache.dir.display()))?,
            )
        } else {
            Box::new(NoOpStorage::new())
        };

        Ok(Self::new_with_dependencies(config, rasterizer, text_extractor, storage)?)
    }

    pub fn config(&self) -> &SieveConfig {
        &self.config
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    /// Text of one page for boundary detection. Unreadable pages are logged
    /// and read as empty.
    fn page_text(&self, source: &dyn PageSource, index: usize) -> String {
        let text = match self.config.boundary.page_text {
            PageTextMode::Embedded => source.page_text(index),
            #[cfg(feature = "poppler")]
            PageTextMode::Pdftotext => PdftotextExtractor::new().extract_page(source.path(), index),
            #[cfg(not(feature = "poppler"))]
            PageTextMode::Pdftotext => Err(SieveError::ToolNotFound(
                "pdftotext (built without the poppler feature)".to_string(),
            )),
        };
        text.unwrap_or_else(|e| {
            warn!(page = index + 1, error = %e, "page text unavailable, treating page as blank");
            String::new()
        })
    }

    /// Boundary scan over every page of an open source.
    pub fn scan_source(&self, source: &dyn PageSource) -> ScanOutcome {
        let pages = (0..source.page_count()).map(|index| self.page_text(source, index));
        let outcome = self.classifier.scan(pages);
        info!(
            source = %source.path().display(),
            pages = outcome.total_pages,
            documents = outcome.records.len(),
            "boundary scan finished"
        );
        outcome
    }

    pub fn scan(&self, path: &Path) -> SieveResult<ScanOutcome> {
        let source = LopdfSource::open(path)?;
        Ok(self.scan_source(&source))
    }

    /// Write one artifact per detected document.
    pub fn split(&self, source: &dyn PageSource, outcome: &ScanOutcome) -> SieveResult<SplitReport> {
        let ranges = compute_ranges(&outcome.records, outcome.total_pages);
        self.splitter.split(source, &ranges)
    }

    /// Extract and validate one document's text.
    pub fn analyze_text(&self, document: &str, text: &str) -> DocumentReport {
        let entities = self.extractor.extract(text);
        let validation = validate(document, &entities, &self.config.checklist);
        debug!(document, overall = validation.overall, "document validated");
        DocumentReport {
            document: document.to_string(),
            entities,
            validation,
        }
    }

    /// Artifact text through the cache. Cache failures are logged, never fatal.
    pub fn artifact_text(&self, path: &Path) -> SieveResult<String> {
        let bytes = std::fs::read(path).map_err(|e| SieveError::TextExtraction {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let key = TextCacheKey::new(calculate_pdf_hash(&bytes), self.text_extractor.name())
            .with_input_hash(self.text_extractor.input_fingerprint(path));

        match self.storage.get_text(&key) {
            Ok(Some(cached)) => {
                debug!(path = %path.display(), "text cache hit");
                return Ok(cached.text);
            }
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "text cache read failed"),
        }

        let start = Instant::now();
        let text = self.text_extractor.extract(path)?;
        let value = TextCacheValue::new(text, start.elapsed().as_millis() as u64);
        if let Err(e) = self.storage.store_text(&key, &value) {
            warn!(path = %path.display(), error = %e, "text cache write failed");
        }
        Ok(value.text)
    }

    /// Validate every written artifact, appending each result to `store`.
    pub fn analyze_artifacts(
        &self,
        split: &SplitReport,
        source: &str,
        fingerprint: Option<&str>,
        store: &mut dyn ReportStore,
    ) -> Result<AnalysisSummary> {
        let mut summary = AnalysisSummary::default();

        for artifact in split.written() {
            let Some(path) = artifact.path.as_deref() else {
                continue;
            };
            let document = file_name(path);

            match self.artifact_text(path) {
                Ok(text) => {
                    let report = self.analyze_text(&document, &text);
                    let entry = ReportEntry::new(
                        self.run_id,
                        source,
                        fingerprint.map(str::to_string),
                        report.validation.clone(),
                    );
                    store
                        .append(&entry)
                        .with_context(|| format!("appending report entry for {document}"))?;
                    summary.documents.push(report);
                }
                Err(e) => {
                    warn!(document = %document, error = %e, "document skipped");
                    summary.skipped.push(SkippedDocument {
                        document,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Validate every `.txt` file in `dir` (name order).
    pub fn analyze_directory(&self, dir: &Path, store: &mut dyn ReportStore) -> Result<AnalysisSummary> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("reading text directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();

        let source = dir.display().to_string();
        let mut summary = AnalysisSummary::default();

        for path in files {
            let document = file_name(&path);
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    let report = self.analyze_text(&document, &text);
                    let entry = ReportEntry::new(self.run_id, &source, None, report.validation.clone());
                    store
                        .append(&entry)
                        .with_context(|| format!("appending report entry for {document}"))?;
                    summary.documents.push(report);
                }
                Err(e) => {
                    let skipped = SieveError::missing_input(&path, e);
                    warn!(error = %skipped, "text file skipped");
                    summary.skipped.push(SkippedDocument {
                        document,
                        reason: skipped.to_string(),
                    });
                }
            }
        }

        info!(
            dir = %dir.display(),
            documents = summary.documents.len(),
            complete = summary.complete(),
            skipped = summary.skipped.len(),
            "text directory analyzed"
        );
        Ok(summary)
    }

    pub fn run(&self, path: &Path, store: &mut dyn ReportStore) -> Result<BatchReport> {
        self.run_with_profiler(path, store, &mut StepProfiler::new(false))
    }

    /// Full pipeline for one source PDF.
    pub fn run_with_profiler(
        &self,
        path: &Path,
        store: &mut dyn ReportStore,
        profiler: &mut StepProfiler,
    ) -> Result<BatchReport> {
        let (source, fingerprint) = profiler.time_step("Open source", || {
            let bytes = std::fs::read(path).map_err(|e| SieveError::missing_input(path, e))?;
            let fingerprint = calculate_pdf_hash(&bytes);
            let source = LopdfSource::open(path)?;
            Ok::<_, SieveError>((source, fingerprint))
        })?;

        let scan = profiler.time_step("Boundary scan", || self.scan_source(&source));
        let ranges = compute_ranges(&scan.records, scan.total_pages);

        if !self.config.splitter.enabled {
            info!(source = %path.display(), "splitting disabled, stopping after scan");
            return Ok(BatchReport {
                run_id: self.run_id,
                source: path.to_path_buf(),
                source_fingerprint: fingerprint,
                scan,
                ranges,
                split: None,
                analysis: AnalysisSummary::default(),
            });
        }

        let split = profiler
            .time_step("Split", || self.splitter.split(&source, &ranges))
            .with_context(|| format!("splitting {}", path.display()))?;
        drop(source);

        let source_name = file_name(path);
        let analysis = profiler.time_step("Extraction & validation", || {
            self.analyze_artifacts(&split, &source_name, Some(fingerprint.as_str()), store)
        })?;

        info!(
            source = %path.display(),
            documents = analysis.documents.len(),
            complete = analysis.complete(),
            skipped = analysis.skipped.len(),
            "run finished"
        );

        Ok(BatchReport {
            run_id: self.run_id,
            source: path.to_path_buf(),
            source_fingerprint: fingerprint,
            scan,
            ranges,
            split: Some(split),
            analysis,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReportStore;
    use crate::validator::Checklist;

    fn sieve(config: SieveConfig) -> DocumentSieve {
        DocumentSieve::new_with_dependencies(
            config,
            Box::new(NoRasterizer),
            Box::new(LopdfTextExtractor),
            Box::new(NoOpStorage::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_analyze_text_uses_checklist() {
        let mut config = SieveConfig::default();
        config.checklist = Checklist::from_pairs(&[("NUM_PROCESSO", true), ("PRAZO", false)]);
        let report = sieve(config).analyze_text("doc.txt", "Processo nº 53500.053021/2018-91");
        assert!(report.validation.overall);
        assert_eq!(report.entities["NUM_PROCESSO"], vec!["53500.053021/2018-91"]);
    }

    #[test]
    fn test_malformed_catalog_is_fatal() {
        let mut config = SieveConfig::default();
        config.extraction.rules = Some(vec![crate::rules::RuleSpec::new("EMPTY", vec![])]);
        let err = DocumentSieve::new_with_dependencies(
            config,
            Box::new(NoRasterizer),
            Box::new(LopdfTextExtractor),
            Box::new(NoOpStorage::new()),
        )
        .err()
        .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_analyze_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02_B.txt"), "sem campos").unwrap();
        std::fs::write(dir.path().join("01_A.txt"), "Processo nº 1/2020").unwrap();
        std::fs::write(dir.path().join("ignored.md"), "Processo nº 9").unwrap();

        let mut config = SieveConfig::default();
        config.checklist = Checklist::from_pairs(&[("NUM_PROCESSO", true)]);
        let mut store = MemoryReportStore::new();
        let summary = sieve(config).analyze_directory(dir.path(), &mut store).unwrap();

        let names: Vec<&str> = summary.documents.iter().map(|d| d.document.as_str()).collect();
        assert_eq!(names, vec!["01_A.txt", "02_B.txt"]);
        assert_eq!(summary.complete(), 1);
        assert_eq!(store.entries().len(), 2);
    }

    #[test]
    fn test_missing_source_is_missing_input() {
        let err = sieve(SieveConfig::default())
            .scan(Path::new("/nonexistent/compilado.pdf"))
            .unwrap_err();
        assert!(matches!(err, SieveError::MissingInput { .. }));
    }

    #[test]
    fn test_profiler_records_steps() {
        let mut profiler = StepProfiler::new(true);
        let value = profiler.time_step("step", || 41 + 1);
        assert_eq!(value, 42);
        assert_eq!(profiler.timings().len(), 1);

        let mut disabled = StepProfiler::new(false);
        disabled.time_step("step", || ());
        assert!(disabled.timings().is_empty());
    }
}
