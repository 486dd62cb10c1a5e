// Rule definitions as data, plus the built-in catalog for Brazilian
// administrative documents. Definitions are plain serde types so a config file
// can replace the catalog; `PatternEngine::compile` turns them into rules.

use crate::types::TokenFlag;
use serde::{Deserialize, Serialize};

use super::engine::Quantifier;

/// Bumped whenever the built-in catalog changes; part of cache keys.
pub const CATALOG_VERSION: &str = "2";

/// Token predicate as written in configuration.
///
/// ```yaml
/// - match: { lower_in: ["nº", "no"] }
///   op: "?"
///   capture: false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateSpec {
    Text(String),
    Lower(String),
    LowerIn(Vec<String>),
    TextRegex(String),
    LowerRegex(String),
    Flag(TokenFlag),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    #[serde(rename = "match", with = "serde_yaml::with::singleton_map")]
    pub predicate: PredicateSpec,
    #[serde(default)]
    pub op: Quantifier,
    #[serde(default = "default_capture")]
    pub capture: bool,
}

fn default_capture() -> bool {
    true
}

impl ConstraintSpec {
    pub fn new(predicate: PredicateSpec) -> Self {
        Self {
            predicate,
            op: Quantifier::One,
            capture: true,
        }
    }

    pub fn op(mut self, op: Quantifier) -> Self {
        self.op = op;
        self
    }

    /// Must match but stays out of the emitted span.
    pub fn context(mut self) -> Self {
        self.capture = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub label: String,
    pub pattern: Vec<ConstraintSpec>,
}

impl RuleSpec {
    pub fn new(label: &str, pattern: Vec<ConstraintSpec>) -> Self {
        Self {
            label: label.to_string(),
            pattern,
        }
    }
}

// ===== BUILDERS =====

fn text(literal: &str) -> ConstraintSpec {
    ConstraintSpec::new(PredicateSpec::Text(literal.to_string()))
}

fn lower(literal: &str) -> ConstraintSpec {
    ConstraintSpec::new(PredicateSpec::Lower(literal.to_string()))
}

fn lower_in(set: &[&str]) -> ConstraintSpec {
    ConstraintSpec::new(PredicateSpec::LowerIn(
        set.iter().map(|s| s.to_string()).collect(),
    ))
}

fn text_regex(pattern: &str) -> ConstraintSpec {
    ConstraintSpec::new(PredicateSpec::TextRegex(pattern.to_string()))
}

fn lower_regex(pattern: &str) -> ConstraintSpec {
    ConstraintSpec::new(PredicateSpec::LowerRegex(pattern.to_string()))
}

fn flag(flag: TokenFlag) -> ConstraintSpec {
    ConstraintSpec::new(PredicateSpec::Flag(flag))
}

/// "nº" and the ways OCR and typists spell it
const NUMBER_SIGN: &[&str] = &["nº", "n°", "no", "n.º", "nr", "número", "numero"];

fn number_sign() -> ConstraintSpec {
    lower_in(NUMBER_SIGN).op(Quantifier::Optional)
}

fn spaces() -> ConstraintSpec {
    flag(TokenFlag::Space).op(Quantifier::ZeroOrMore)
}

/// Dotted/slashed process numbers: `53500.053021/2018-91`
const PROCESS_NUMBER: &str = r"^[0-9][0-9./-]*$";

/// The built-in catalog, in evaluation order.
///
/// Identifier rules capture only the value (`Processo nº X` yields `X`);
/// phrase rules (`RELATORIO_FISC`, `ASSINATURA_ELETRONICA`, `DATA_ASSINATURA`,
/// `DESPACHO`, `PRAZO`, `BOLETIM_INFORMATIVO`) capture the whole match.
pub fn default_rules() -> Vec<RuleSpec> {
    use Quantifier::*;

    vec![
        RuleSpec::new(
            "INTERESSADO",
            vec![
                lower_in(&["interessado", "interessada", "interessados"]).context(),
                flag(TokenFlag::Punct).op(Optional).context(),
                spaces().context(),
                text_regex(r"^[A-ZÀ-Ý][A-Za-zÀ-ÿ.&-]+$").op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "RELATORIO_FISC",
            vec![
                lower_in(&["relatório", "relatorio"]),
                lower("de"),
                lower_in(&["fiscalização", "fiscalizacao"]),
                spaces(),
                number_sign(),
                spaces(),
                text_regex(r"^[0-9][0-9A-Za-z./-]*$").op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "NUM_SEI",
            vec![
                lower("sei").context(),
                number_sign().context(),
                flag(TokenFlag::Digit).op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "NUM_PROC_FISC",
            vec![
                lower("processo").context(),
                lower("de").context(),
                lower_in(&["fiscalização", "fiscalizacao"]).context(),
                spaces().context(),
                number_sign().context(),
                spaces().context(),
                text_regex(PROCESS_NUMBER).op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "ARTIGO",
            vec![
                lower_in(&["artigo", "art"]).context(),
                text(".").op(Optional).context(),
                text_regex(r"^[0-9]+[º°]?$").op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "RESOLUCAO",
            vec![
                lower_in(&["resolução", "resolucao"]).context(),
                number_sign().context(),
                text_regex(PROCESS_NUMBER),
                text_regex(r"^[/.-]$").op(Optional),
                flag(TokenFlag::Digit).op(Optional),
            ],
        ),
        RuleSpec::new(
            "ASSINATURA_ELETRONICA",
            vec![
                lower("assinado"),
                lower("eletronicamente"),
                lower("por"),
                flag(TokenFlag::Title).op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "DATA_ASSINATURA",
            vec![
                lower("em"),
                text_regex(r"^\d{2}/\d{2}/\d{4}$"),
                text(",").op(Optional),
                lower_in(&["às", "as"]),
                text_regex(r"^\d{1,2}:\d{2}$"),
            ],
        ),
        RuleSpec::new(
            "CODIGO_VERIFICADOR",
            vec![
                lower_in(&["código", "codigo"]).context(),
                lower("verificador").context(),
                flag(TokenFlag::Punct).op(Optional).context(),
                flag(TokenFlag::Digit).op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "CRC",
            vec![
                lower("crc").context(),
                flag(TokenFlag::Punct).op(Optional).context(),
                text_regex(r"^[A-Za-z0-9]+$"),
            ],
        ),
        RuleSpec::new(
            "DESPACHO",
            vec![
                lower("despacho"),
                lower_in(&["ordinatório", "ordinatorio"]).op(Optional),
                lower("de"),
                lower_in(&["instauração", "instauracao"]),
                number_sign(),
                text_regex(r"^[0-9][0-9/A-Z]*$").op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "NUM_PROCESSO",
            vec![
                lower("processo").context(),
                number_sign().context(),
                text_regex(PROCESS_NUMBER).op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "NUM_PASTA",
            vec![
                lower("pasta").context(),
                number_sign().context(),
                text_regex(r"^[A-Z0-9]*[0-9][A-Z0-9]*$").op(OneOrMore),
            ],
        ),
        RuleSpec::new(
            "CNPJ",
            vec![
                lower_in(&["cnpj", "cnpj/mf"]).context(),
                number_sign().context(),
                text(":").op(Optional).context(),
                text_regex(r"^\d{2}\.\d{3}\.\d{3}[./]\d{4}-\d{2}$"),
            ],
        ),
        RuleSpec::new(
            "CPF",
            vec![
                lower_in(&["cpf", "cpf/mf"]).context(),
                number_sign().context(),
                text(":").op(Optional).context(),
                text_regex(r"^\d{3}\.\d{3}\.\d{3}-\d{2}$"),
            ],
        ),
        // Two PRAZO rules: greedy word repetition would otherwise swallow "dias".
        RuleSpec::new(
            "PRAZO",
            vec![
                lower("no").op(Optional),
                lower("prazo"),
                lower("de"),
                flag(TokenFlag::Digit),
                text("("),
                lower_regex(r"^[a-zà-ÿ]+$").op(OneOrMore),
                text(")"),
                lower_in(&["dia", "dias"]),
            ],
        ),
        RuleSpec::new(
            "PRAZO",
            vec![
                lower("no").op(Optional),
                lower("prazo"),
                lower("de"),
                flag(TokenFlag::Digit),
                lower_in(&["dia", "dias"]),
            ],
        ),
        RuleSpec::new(
            "BOLETIM_INFORMATIVO",
            vec![
                lower("boletim"),
                lower("informativo"),
                number_sign(),
                text_regex(r"^[0-9][0-9A-Za-z./-]*$").op(OneOrMore),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::engine::PatternEngine;

    #[test]
    fn test_default_catalog_compiles() {
        let engine = PatternEngine::compile(&default_rules()).unwrap();
        let labels = engine.labels();
        assert_eq!(labels.first().map(String::as_str), Some("INTERESSADO"));
        assert_eq!(labels.iter().filter(|l| *l == "PRAZO").count(), 1);
        assert!(labels.contains(&"BOLETIM_INFORMATIVO".to_string()));
    }

    #[test]
    fn test_rule_spec_from_yaml() {
        let yaml = r#"
- label: OFICIO_NUM
  pattern:
    - match: { lower: "ofício" }
      capture: false
    - match: { lower_in: ["nº", "no"] }
      op: "?"
      capture: false
    - match: { text_regex: "^[0-9]+/[0-9]{4}$" }
      op: "+"
"#;
        let specs: Vec<RuleSpec> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].pattern[1].op, Quantifier::Optional);
        assert!(!specs[0].pattern[0].capture);
        assert!(specs[0].pattern[2].capture);
        assert_eq!(specs[0].pattern[2].op, Quantifier::OneOrMore);
        assert!(PatternEngine::compile(&specs).is_ok());
    }

    #[test]
    fn test_flag_predicate_from_yaml() {
        let yaml = "match: { flag: digit }\nop: one_or_more\n";
        let spec: ConstraintSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.predicate, PredicateSpec::Flag(TokenFlag::Digit));
        assert_eq!(spec.op, Quantifier::OneOrMore);
    }
}
