// Docsieve Core Library
//
// Splits a concatenated administrative PDF into its embedded documents,
// extracts labeled entities from each one and validates them against a
// checklist of mandatory fields.

pub mod types;
pub mod error;
pub mod text;
pub mod rules;
pub mod extractor;
pub mod classifier;
pub mod validator;
pub mod report;
pub mod preprocessors;
pub mod splitter;
pub mod processor;
pub mod cache;
pub mod config;
pub mod storage;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{SieveError, SieveResult};
pub use classifier::BoundaryClassifier;
pub use extractor::EntityExtractor;
pub use validator::{validate, Checklist, ChecklistEntry};
pub use report::{FileReportStore, MemoryReportStore, ReportEntry, ReportStore};
pub use preprocessors::{LopdfSource, PageRasterizer, PageSource, TextExtractor};
pub use splitter::{compute_ranges, SplitReport, Splitter};
pub use processor::{BatchReport, DocumentReport, DocumentSieve, StepProfiler};
pub use config::SieveConfig;

// Re-export backends for direct use
#[cfg(feature = "poppler")]
pub use preprocessors::{PdftoppmRasterizer, PdftotextExtractor};
