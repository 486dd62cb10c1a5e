use crate::error::{SieveError, SieveResult};
use crate::types::{EntitySpan, Token};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::engine::span_for;

/// Two adjacent tokens that together form one value.
///
/// Covers identifiers broken by a line wrap, where the tokenizer sees
/// `40.432.544/` and `0001-47` as separate tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximitySpec {
    pub label: String,
    /// Regex the first token's raw text must match
    pub prefix: String,
    /// Regex the second token's raw text must match
    pub suffix: String,
}

impl ProximitySpec {
    pub fn new(label: &str, prefix: &str, suffix: &str) -> Self {
        Self {
            label: label.to_string(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

pub fn default_proximity_rules() -> Vec<ProximitySpec> {
    vec![
        ProximitySpec::new("CNPJ", r"^\d{2}\.\d{3}\.\d{3}/$", r"^\d{4}-\d{2}$"),
        ProximitySpec::new("CPF", r"^\d{3}\.\d{3}\.\d{3}-$", r"^\d{2}$"),
    ]
}

#[derive(Debug, Clone)]
pub struct ProximityRule {
    pub label: String,
    prefix: Regex,
    suffix: Regex,
}

impl ProximityRule {
    pub fn compile(spec: &ProximitySpec) -> SieveResult<Self> {
        if spec.label.trim().is_empty() {
            return Err(SieveError::malformed_rule(&spec.label, "empty label"));
        }
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                SieveError::malformed_rule(&spec.label, format!("bad regex {pattern:?}: {e}"))
            })
        };
        Ok(Self {
            label: spec.label.trim().to_string(),
            prefix: compile(&spec.prefix)?,
            suffix: compile(&spec.suffix)?,
        })
    }

    /// Every adjacent (prefix, suffix) pair; a matched pair is not reused.
    pub fn find_iter(&self, tokens: &[Token], text: &str) -> Vec<EntitySpan> {
        let mut spans = Vec::new();
        let mut i = 0;

        while i + 1 < tokens.len() {
            if self.prefix.is_match(&tokens[i].text) && self.suffix.is_match(&tokens[i + 1].text) {
                spans.push(span_for(&self.label, tokens, i..i + 2, text));
                i += 2;
            } else {
                i += 1;
            }
        }

        spans
    }
}
