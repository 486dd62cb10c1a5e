use crate::error::SieveResult;
use crate::rules::{
    default_proximity_rules, default_rules, PatternEngine, ProximityRule, ProximitySpec, RuleSpec,
};
use crate::text::{normalize, tokenize};
use crate::types::{EntityMap, EntitySpan};
use tracing::debug;

/// Labels entities in document text.
///
/// Primary rules run through the pattern engine; proximity rules run as a
/// second pass over the same tokens and their spans are merged into the same
/// ordered list. Nothing is deduplicated.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    engine: PatternEngine,
    proximity: Vec<ProximityRule>,
    labels: Vec<String>,
}

impl EntityExtractor {
    pub fn with_default_catalog() -> SieveResult<Self> {
        Self::from_specs(&default_rules(), &default_proximity_rules())
    }

    pub fn from_specs(rules: &[RuleSpec], proximity: &[ProximitySpec]) -> SieveResult<Self> {
        let engine = PatternEngine::compile(rules)?;
        let proximity = proximity
            .iter()
            .map(ProximityRule::compile)
            .collect::<SieveResult<Vec<_>>>()?;

        let mut labels = engine.labels();
        for rule in &proximity {
            if !labels.contains(&rule.label) {
                labels.push(rule.label.clone());
            }
        }

        Ok(Self {
            engine,
            proximity,
            labels,
        })
    }

    /// Every label the extractor can emit, in catalog order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Spans over the normalized form of `text`, ordered by start token.
    /// Primary spans come before proximity spans starting at the same token.
    pub fn spans(&self, text: &str) -> Vec<EntitySpan> {
        let normalized = normalize(text);
        let tokens = tokenize(&normalized);

        let mut spans = self.engine.find_all(&tokens, &normalized);
        for rule in &self.proximity {
            spans.extend(rule.find_iter(&tokens, &normalized));
        }
        // stable: keeps primary-before-proximity within one start token
        spans.sort_by_key(|span| span.tokens.start);

        debug!(tokens = tokens.len(), spans = spans.len(), "entity pass");
        spans
    }

    /// Label -> matched texts. Every known label is present, possibly empty.
    pub fn extract(&self, text: &str) -> EntityMap {
        let mut map: EntityMap = self
            .labels
            .iter()
            .map(|label| (label.clone(), Vec::new()))
            .collect();

        for span in self.spans(text) {
            map.entry(span.label).or_default().push(span.text);
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::with_default_catalog().unwrap()
    }

    fn values(map: &EntityMap, label: &str) -> Vec<String> {
        map.get(label).cloned().unwrap_or_default()
    }

    #[test]
    fn test_process_number() {
        let map = extractor().extract("Processo nº 53500.053021/2018-91");
        assert_eq!(values(&map, "NUM_PROCESSO"), vec!["53500.053021/2018-91"]);
        assert!(values(&map, "NUM_PROC_FISC").is_empty());
    }

    #[test]
    fn test_every_label_is_present() {
        let ex = extractor();
        let map = ex.extract("");
        assert_eq!(map.len(), ex.labels().len());
        assert!(map.values().all(Vec::is_empty));
        assert!(map.contains_key("PRAZO"));
        assert!(map.contains_key("CPF"));
    }

    #[test]
    fn test_inspection_header_fields() {
        let text = "RELATÓRIO DE FISCALIZAÇÃO nº 12/2020\n\
                    Processo de Fiscalização nº 53504.003563/2016-11\n\
                    Interessado: ACME TELECOMUNICAÇÕES LTDA";
        let map = extractor().extract(text);
        assert_eq!(
            values(&map, "RELATORIO_FISC"),
            vec!["RELATÓRIO DE FISCALIZAÇÃO nº 12/2020"]
        );
        assert_eq!(values(&map, "NUM_PROC_FISC"), vec!["53504.003563/2016-11"]);
        assert_eq!(
            values(&map, "INTERESSADO"),
            vec!["ACME TELECOMUNICAÇÕES LTDA"]
        );
    }

    #[test]
    fn test_electronic_signature_block() {
        let text = "Documento assinado eletronicamente por Maria Souza, Fiscal, \
                    em 12/03/2020, às 14:35, conforme horário oficial. \
                    A autenticidade deste documento pode ser conferida informando o \
                    código verificador 4567890 e o código CRC 1A2B3C4D.";
        let map = extractor().extract(text);
        assert_eq!(
            values(&map, "ASSINATURA_ELETRONICA"),
            vec!["assinado eletronicamente por Maria Souza"]
        );
        assert_eq!(values(&map, "DATA_ASSINATURA"), vec!["em 12/03/2020, às 14:35"]);
        assert_eq!(values(&map, "CODIGO_VERIFICADOR"), vec!["4567890"]);
        assert_eq!(values(&map, "CRC"), vec!["1A2B3C4D"]);
    }

    #[test]
    fn test_crc_is_one_alphanumeric_token() {
        let map = extractor().extract("informando o código CRC 3f9a0c2e e o código verificador 12");
        assert_eq!(values(&map, "CRC"), vec!["3f9a0c2e"]);

        let map = extractor().extract("CRC: A1");
        assert_eq!(values(&map, "CRC"), vec!["A1"]);
    }

    #[test]
    fn test_deadline_both_shapes() {
        let text = "no prazo de 15 (quinze) dias e, depois, prazo de 30 dias úteis";
        let map = extractor().extract(text);
        assert_eq!(
            values(&map, "PRAZO"),
            vec!["no prazo de 15 (quinze) dias", "prazo de 30 dias"]
        );
    }

    #[test]
    fn test_cnpj_whole_and_split() {
        let text = "CNPJ/MF nº 40.432.544/0001-47 e filial 40.432.544/ 0002-28";
        let map = extractor().extract(text);
        assert_eq!(
            values(&map, "CNPJ"),
            vec!["40.432.544/0001-47", "40.432.544/ 0002-28"]
        );
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let text = "SEI nº 111 e SEI 222 e SEI nº 111";
        let map = extractor().extract(text);
        assert_eq!(values(&map, "NUM_SEI"), vec!["111", "222", "111"]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let ex = extractor();
        let text = "Despacho Ordinatório de Instauração nº 233/2018/SEI/CODI/SCO, \
                    Pasta nº RADARRCTS32016000006, art. 5º da Resolução nº 589/2012";
        let first = ex.extract(text);
        assert_eq!(first, ex.extract(text));
        assert_eq!(
            values(&first, "DESPACHO"),
            vec!["Despacho Ordinatório de Instauração nº 233/2018/SEI/CODI/SCO"]
        );
        assert_eq!(values(&first, "NUM_PASTA"), vec!["RADARRCTS32016000006"]);
        assert_eq!(values(&first, "ARTIGO"), vec!["5º"]);
        assert_eq!(values(&first, "RESOLUCAO"), vec!["589/2012"]);
    }

    #[test]
    fn test_extract_normalizes_input() {
        let map = extractor().extract("Processo\n  nº   53500.053021/2018–91");
        assert_eq!(values(&map, "NUM_PROCESSO"), vec!["53500.053021/2018-91"]);
    }
}
