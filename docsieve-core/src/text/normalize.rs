//! Text normalization shared by the boundary classifier and the entity extractor.
//!
//! Two distinct functions with distinct callers:
//! - `normalize`: whitespace collapse + dash canonicalization. Applied to every
//!   document text before tokenization.
//! - `strip_accents` / `fold_for_keywords`: NFD decomposition with combining
//!   marks removed. Only for keyword, noise and section-marker detection; entity
//!   rules see accented text because several of them depend on accented literals.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const EN_DASH: char = '\u{2013}';
const EM_DASH: char = '\u{2014}';

/// Collapse whitespace runs to a single space, map en/em dashes to `-`, trim.
///
/// ```
/// use docsieve_core::text::normalize;
///
/// assert_eq!(normalize("  Processo\n\tnº 12 – 2020 "), "Processo nº 12 - 2020");
/// ```
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(match c {
            EN_DASH | EM_DASH => '-',
            other => other,
        });
    }

    out
}

/// Remove diacritics: `"Relatório"` -> `"Relatorio"`.
pub fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// The form keyword patterns are searched in: accents stripped, uppercased.
pub fn fold_for_keywords(text: &str) -> String {
    strip_accents(text).to_uppercase()
}
