use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

// ===== TOKEN LEVEL =====
// Tokens are produced once from normalized text and never mutated.
// Spans are byte offsets into the normalized text they came from.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub lower: String,
    pub span: Range<usize>,
    pub is_digit: bool,
    pub is_punct: bool,
    pub is_space: bool,
    pub is_title: bool,
}

impl Token {
    pub fn has_flag(&self, flag: TokenFlag) -> bool {
        match flag {
            TokenFlag::Digit => self.is_digit,
            TokenFlag::Punct => self.is_punct,
            TokenFlag::Space => self.is_space,
            TokenFlag::Title => self.is_title,
        }
    }
}

/// Boolean token shape flags a rule constraint can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFlag {
    Digit,
    Punct,
    Space,
    Title,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub label: String,
    /// Token indices covered by the span
    pub tokens: Range<usize>,
    /// Byte offsets into the normalized text
    pub span: Range<usize>,
    pub text: String,
}

/// Label -> matched raw texts, in discovery order. Duplicates are kept.
pub type EntityMap = BTreeMap<String, Vec<String>>;

// ===== SEGMENTATION =====

/// Label used when the first page carries no recognizable header.
pub const AUTO_START_LABEL: &str = "INICIO AUTOMATICO";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    /// 0-based page index in the source PDF
    pub page: usize,
    pub label: String,
}

impl BoundaryRecord {
    pub fn new(page: usize, label: impl Into<String>) -> Self {
        Self {
            page,
            label: label.into(),
        }
    }
}

/// What the classifier concluded for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PageDecision {
    NoUsableLines,
    NoMatch,
    NewDocument { label: String, line: String },
    Continuation { label: String },
    ForcedStart { label: String },
}

impl PageDecision {
    pub fn starts_document(&self) -> bool {
        matches!(
            self,
            PageDecision::NewDocument { .. } | PageDecision::ForcedStart { .. }
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub total_pages: usize,
    pub records: Vec<BoundaryRecord>,
    pub decisions: Vec<PageDecision>,
}

/// Half-open page range `[start, end)` of one embedded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRange {
    /// 1-based position of the document inside the source
    pub sequence: usize,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl DocumentRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pages(&self) -> Range<usize> {
        self.start..self.end
    }
}

// ===== VALIDATION =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStatus {
    pub label: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub document: String,
    /// Required labels only, in checklist order
    pub fields: Vec<FieldStatus>,
    pub overall: bool,
}

impl ValidationResult {
    pub fn field(&self, label: &str) -> Option<bool> {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.present)
    }

    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| !field.present)
            .map(|field| field.label.as_str())
    }
}
