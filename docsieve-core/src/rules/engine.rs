use crate::error::{SieveError, SieveResult};
use crate::types::{EntitySpan, Token, TokenFlag};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::catalog::{ConstraintSpec, PredicateSpec, RuleSpec};

/// Repetition attached to a constraint.
///
/// Repetition is greedy and never gives tokens back: a constraint that
/// consumed too much is not retried with fewer tokens. Catalog rules are
/// written against exactly this behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    #[default]
    #[serde(alias = "!")]
    One,
    #[serde(alias = "?")]
    Optional,
    #[serde(alias = "*")]
    ZeroOrMore,
    #[serde(alias = "+")]
    OneOrMore,
}

#[derive(Debug, Clone)]
pub enum TokenPredicate {
    /// Exact raw text
    Text(String),
    /// Lowercase text equals the (lowercased) literal
    Lower(String),
    /// Lowercase text is one of the (lowercased) literals
    LowerIn(Vec<String>),
    TextRegex(Regex),
    LowerRegex(Regex),
    Flag(TokenFlag),
}

impl TokenPredicate {
    pub fn matches(&self, token: &Token) -> bool {
        match self {
            TokenPredicate::Text(literal) => token.text == *literal,
            TokenPredicate::Lower(literal) => token.lower == *literal,
            TokenPredicate::LowerIn(set) => set.iter().any(|item| *item == token.lower),
            TokenPredicate::TextRegex(regex) => regex.is_match(&token.text),
            TokenPredicate::LowerRegex(regex) => regex.is_match(&token.lower),
            TokenPredicate::Flag(flag) => token.has_flag(*flag),
        }
    }

    fn compile(label: &str, spec: &PredicateSpec) -> SieveResult<Self> {
        let compile_regex = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| SieveError::malformed_rule(label, format!("bad regex {pattern:?}: {e}")))
        };

        Ok(match spec {
            PredicateSpec::Text(literal) => TokenPredicate::Text(literal.clone()),
            PredicateSpec::Lower(literal) => TokenPredicate::Lower(literal.to_lowercase()),
            PredicateSpec::LowerIn(set) => {
                if set.is_empty() {
                    return Err(SieveError::malformed_rule(label, "empty lower_in set"));
                }
                TokenPredicate::LowerIn(set.iter().map(|item| item.to_lowercase()).collect())
            }
            PredicateSpec::TextRegex(pattern) => TokenPredicate::TextRegex(compile_regex(pattern)?),
            PredicateSpec::LowerRegex(pattern) => {
                TokenPredicate::LowerRegex(compile_regex(pattern)?)
            }
            PredicateSpec::Flag(flag) => TokenPredicate::Flag(*flag),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub predicate: TokenPredicate,
    pub quantifier: Quantifier,
    /// Tokens consumed by capturing constraints form the emitted span
    pub capture: bool,
}

/// One successful evaluation of a rule's constraint chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Tokens consumed by the whole chain
    pub matched: Range<usize>,
    /// Tokens consumed by the capturing constraints
    pub captured: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub label: String,
    pub constraints: Vec<Constraint>,
}

impl Rule {
    /// Compile a rule definition.
    ///
    /// A rule is malformed when it has no label, no constraints, an invalid
    /// regex, no capturing constraint, or capturing constraints separated by a
    /// non-capturing one.
    pub fn compile(spec: &RuleSpec) -> SieveResult<Self> {
        let label = spec.label.trim();
        if label.is_empty() {
            return Err(SieveError::malformed_rule(&spec.label, "empty label"));
        }
        if spec.pattern.is_empty() {
            return Err(SieveError::malformed_rule(label, "no constraints"));
        }

        let captures: Vec<usize> = spec
            .pattern
            .iter()
            .enumerate()
            .filter(|(_, constraint)| constraint.capture)
            .map(|(i, _)| i)
            .collect();
        match (captures.first(), captures.last()) {
            (None, _) | (_, None) => {
                return Err(SieveError::malformed_rule(label, "no capturing constraint"));
            }
            (Some(first), Some(last)) if last - first + 1 != captures.len() => {
                return Err(SieveError::malformed_rule(
                    label,
                    "capturing constraints are not contiguous",
                ));
            }
            _ => {}
        }

        let constraints = spec
            .pattern
            .iter()
            .map(|c: &ConstraintSpec| {
                Ok(Constraint {
                    predicate: TokenPredicate::compile(label, &c.predicate)?,
                    quantifier: c.op,
                    capture: c.capture,
                })
            })
            .collect::<SieveResult<Vec<_>>>()?;

        Ok(Self {
            label: label.to_string(),
            constraints,
        })
    }

    /// Run the constraint chain once, starting at `start`.
    pub fn match_at(&self, tokens: &[Token], start: usize) -> Option<RuleMatch> {
        let mut cursor = start;
        let mut captured: Option<Range<usize>> = None;

        for constraint in &self.constraints {
            let begin = cursor;
            let accepts = |i: usize| i < tokens.len() && constraint.predicate.matches(&tokens[i]);

            match constraint.quantifier {
                Quantifier::One => {
                    if !accepts(cursor) {
                        return None;
                    }
                    cursor += 1;
                }
                Quantifier::Optional => {
                    if accepts(cursor) {
                        cursor += 1;
                    }
                }
                Quantifier::ZeroOrMore => {
                    while accepts(cursor) {
                        cursor += 1;
                    }
                }
                Quantifier::OneOrMore => {
                    while accepts(cursor) {
                        cursor += 1;
                    }
                    if cursor == begin {
                        return None;
                    }
                }
            }

            if constraint.capture && cursor > begin {
                captured = Some(match captured {
                    Some(range) => range.start..cursor,
                    None => begin..cursor,
                });
            }
        }

        captured.map(|captured| RuleMatch {
            matched: start..cursor,
            captured,
        })
    }

    /// All non-overlapping matches, leftmost first.
    pub fn find_iter(&self, tokens: &[Token]) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        let mut position = 0;

        while position < tokens.len() {
            match self.match_at(tokens, position) {
                Some(found) => {
                    position = found.matched.end.max(position + 1);
                    matches.push(found);
                }
                None => position += 1,
            }
        }

        matches
    }
}

/// Ordered rule library evaluated against a token sequence.
#[derive(Debug, Clone, Default)]
pub struct PatternEngine {
    rules: Vec<Rule>,
}

impl PatternEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Compile every definition; the first malformed rule aborts.
    pub fn compile(specs: &[RuleSpec]) -> SieveResult<Self> {
        let rules = specs.iter().map(Rule::compile).collect::<SieveResult<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Labels in rule order, first occurrence only.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for rule in &self.rules {
            if !labels.contains(&rule.label) {
                labels.push(rule.label.clone());
            }
        }
        labels
    }

    /// Every rule's matches merged into one list ordered by start token, then
    /// rule order. Spans from different rules may overlap; all are kept.
    pub fn find_all(&self, tokens: &[Token], text: &str) -> Vec<EntitySpan> {
        let mut found: Vec<(usize, usize, EntitySpan)> = Vec::new();

        for (rule_index, rule) in self.rules.iter().enumerate() {
            for m in rule.find_iter(tokens) {
                let span = span_for(&rule.label, tokens, m.captured, text);
                found.push((span.tokens.start, rule_index, span));
            }
        }

        found.sort_by_key(|(start, rule_index, _)| (*start, *rule_index));
        found.into_iter().map(|(_, _, span)| span).collect()
    }
}

/// Build the span covering `token_range` (non-empty) of `tokens`.
pub(crate) fn span_for(
    label: &str,
    tokens: &[Token],
    token_range: Range<usize>,
    text: &str,
) -> EntitySpan {
    let start = tokens[token_range.start].span.start;
    let end = tokens[token_range.end - 1].span.end;
    EntitySpan {
        label: label.to_string(),
        tokens: token_range,
        span: start..end,
        text: text[start..end].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize;

    fn c(predicate: PredicateSpec, op: Quantifier) -> ConstraintSpec {
        ConstraintSpec {
            predicate,
            op,
            capture: true,
        }
    }

    fn ctx(predicate: PredicateSpec, op: Quantifier) -> ConstraintSpec {
        ConstraintSpec {
            predicate,
            op,
            capture: false,
        }
    }

    fn rule(label: &str, pattern: Vec<ConstraintSpec>) -> Rule {
        Rule::compile(&RuleSpec {
            label: label.to_string(),
            pattern,
        })
        .unwrap()
    }

    fn texts(engine: &PatternEngine, text: &str) -> Vec<(String, String)> {
        let tokens = tokenize(text);
        engine
            .find_all(&tokens, text)
            .into_iter()
            .map(|span| (span.label, span.text))
            .collect()
    }

    #[test]
    fn test_literal_and_one_or_more() {
        let engine = PatternEngine::new(vec![rule(
            "ART",
            vec![
                c(PredicateSpec::Lower("artigo".into()), Quantifier::One),
                c(PredicateSpec::Flag(TokenFlag::Digit), Quantifier::OneOrMore),
            ],
        )]);
        assert_eq!(
            texts(&engine, "conforme Artigo 5 e artigo 12 13"),
            vec![
                ("ART".to_string(), "Artigo 5".to_string()),
                ("ART".to_string(), "artigo 12 13".to_string()),
            ]
        );
    }

    #[test]
    fn test_optional_consumes_only_on_match() {
        let engine = PatternEngine::new(vec![rule(
            "SEI",
            vec![
                ctx(PredicateSpec::Lower("sei".into()), Quantifier::One),
                ctx(
                    PredicateSpec::LowerIn(vec!["nº".into(), "no".into()]),
                    Quantifier::Optional,
                ),
                c(PredicateSpec::Flag(TokenFlag::Digit), Quantifier::OneOrMore),
            ],
        )]);
        assert_eq!(
            texts(&engine, "SEI nº 123 e SEI 456"),
            vec![
                ("SEI".to_string(), "123".to_string()),
                ("SEI".to_string(), "456".to_string()),
            ]
        );
    }

    #[test]
    fn test_greedy_repetition_never_backtracks() {
        // A backtracking matcher would give "b" back to the final constraint.
        let engine = PatternEngine::new(vec![rule(
            "GREEDY",
            vec![
                c(PredicateSpec::Lower("a".into()), Quantifier::One),
                c(PredicateSpec::LowerRegex("^[a-z]$".into()), Quantifier::ZeroOrMore),
                c(PredicateSpec::Lower("b".into()), Quantifier::One),
            ],
        )]);
        assert!(texts(&engine, "a x b").is_empty());
        assert_eq!(
            texts(&engine, "a x b 7"),
            Vec::<(String, String)>::new()
        );
    }

    #[test]
    fn test_matches_do_not_overlap_within_rule() {
        let engine = PatternEngine::new(vec![rule(
            "PAIR",
            vec![
                c(PredicateSpec::Lower("x".into()), Quantifier::One),
                c(PredicateSpec::Lower("x".into()), Quantifier::One),
            ],
        )]);
        let found = texts(&engine, "x x x x x");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_cross_rule_overlap_is_kept() {
        let engine = PatternEngine::new(vec![
            rule(
                "LONG",
                vec![
                    c(PredicateSpec::Lower("processo".into()), Quantifier::One),
                    c(PredicateSpec::Lower("de".into()), Quantifier::One),
                    c(PredicateSpec::Lower("fiscalização".into()), Quantifier::One),
                ],
            ),
            rule(
                "SHORT",
                vec![c(PredicateSpec::Lower("processo".into()), Quantifier::One)],
            ),
        ]);
        let found = texts(&engine, "Processo de Fiscalização");
        assert_eq!(
            found,
            vec![
                ("LONG".to_string(), "Processo de Fiscalização".to_string()),
                ("SHORT".to_string(), "Processo".to_string()),
            ]
        );
    }

    #[test]
    fn test_spans_are_ordered_by_start() {
        let engine = PatternEngine::new(vec![
            rule("B", vec![c(PredicateSpec::Lower("b".into()), Quantifier::One)]),
            rule("A", vec![c(PredicateSpec::Lower("a".into()), Quantifier::One)]),
        ]);
        let labels: Vec<String> = texts(&engine, "a b a")
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        assert_eq!(labels, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_bad_regex_is_malformed() {
        let err = Rule::compile(&RuleSpec {
            label: "BROKEN".into(),
            pattern: vec![c(PredicateSpec::TextRegex("[0-9".into()), Quantifier::One)],
        })
        .unwrap_err();
        assert!(matches!(err, SieveError::PatternEngine { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_non_contiguous_capture_is_malformed() {
        let err = Rule::compile(&RuleSpec {
            label: "GAP".into(),
            pattern: vec![
                c(PredicateSpec::Lower("a".into()), Quantifier::One),
                ctx(PredicateSpec::Lower("b".into()), Quantifier::One),
                c(PredicateSpec::Lower("c".into()), Quantifier::One),
            ],
        })
        .unwrap_err();
        assert!(matches!(err, SieveError::PatternEngine { .. }));
    }

    #[test]
    fn test_empty_rule_is_malformed() {
        assert!(Rule::compile(&RuleSpec {
            label: "EMPTY".into(),
            pattern: vec![],
        })
        .is_err());
        assert!(Rule::compile(&RuleSpec {
            label: " ".into(),
            pattern: vec![c(PredicateSpec::Lower("a".into()), Quantifier::One)],
        })
        .is_err());
    }

    #[test]
    fn test_zero_width_capture_is_not_a_match() {
        let engine = PatternEngine::new(vec![rule(
            "OPT",
            vec![
                ctx(PredicateSpec::Lower("prazo".into()), Quantifier::One),
                c(PredicateSpec::Flag(TokenFlag::Digit), Quantifier::Optional),
            ],
        )]);
        assert!(texts(&engine, "prazo indefinido").is_empty());
        assert_eq!(texts(&engine, "prazo 10").len(), 1);
    }
}
