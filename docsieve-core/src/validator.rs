use crate::types::{EntityMap, FieldStatus, ValidationResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub label: String,
    pub required: bool,
}

/// Ordered required-field checklist. Optional entries are carried for
/// documentation and ignored by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist {
    entries: Vec<ChecklistEntry>,
}

/// Fields every administrative document is expected to carry. `PRAZO` only
/// shows up in notices and summons.
const DEFAULT_CHECKLIST: &[(&str, bool)] = &[
    ("INTERESSADO", true),
    ("RELATORIO_FISC", true),
    ("NUM_SEI", true),
    ("NUM_PROC_FISC", true),
    ("ARTIGO", true),
    ("RESOLUCAO", true),
    ("ASSINATURA_ELETRONICA", true),
    ("DATA_ASSINATURA", true),
    ("CODIGO_VERIFICADOR", true),
    ("CRC", true),
    ("DESPACHO", true),
    ("NUM_PROCESSO", true),
    ("NUM_PASTA", true),
    ("CNPJ", true),
    ("CPF", true),
    ("PRAZO", false),
    ("BOLETIM_INFORMATIVO", true),
];

impl Default for Checklist {
    fn default() -> Self {
        Self::new(
            DEFAULT_CHECKLIST
                .iter()
                .map(|(label, required)| ChecklistEntry {
                    label: label.to_string(),
                    required: *required,
                })
                .collect(),
        )
    }
}

impl Checklist {
    pub fn new(entries: Vec<ChecklistEntry>) -> Self {
        Self { entries }
    }

    pub fn from_pairs(pairs: &[(&str, bool)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(label, required)| ChecklistEntry {
                    label: label.to_string(),
                    required: *required,
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[ChecklistEntry] {
        &self.entries
    }

    pub fn required_labels(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.required)
            .map(|entry| entry.label.as_str())
    }

    /// Labels absent from `known`; a checklist entry no rule can emit is
    /// always missing.
    pub fn unknown_labels<'a>(&'a self, known: &'a [String]) -> Vec<&'a str> {
        self.entries
            .iter()
            .map(|entry| entry.label.as_str())
            .filter(|label| !known.iter().any(|k| k == label))
            .collect()
    }
}

/// Check a document's entities against the checklist.
///
/// A field is present when it has at least one span; values are not checked.
/// `overall` is the conjunction over required fields (true for an empty
/// required set).
pub fn validate(document: &str, entities: &EntityMap, checklist: &Checklist) -> ValidationResult {
    let fields: Vec<FieldStatus> = checklist
        .required_labels()
        .map(|label| FieldStatus {
            label: label.to_string(),
            present: entities.get(label).is_some_and(|values| !values.is_empty()),
        })
        .collect();
    let overall = fields.iter().all(|field| field.present);

    ValidationResult {
        document: document.to_string(),
        fields,
        overall,
    }
}
