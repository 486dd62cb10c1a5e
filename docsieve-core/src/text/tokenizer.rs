use crate::types::Token;

/// Punctuation peeled off the front of a chunk.
const OPENING: &[char] = &['(', '[', '{', '"', '\'', '«', '“', '‘'];
/// Punctuation peeled off the back of a chunk.
const CLOSING: &[char] = &[')', ']', '}', '"', '\'', '»', '”', '’', ',', ';', ':', '!', '?', '.'];

/// Split text into tokens.
///
/// Chunks are whitespace-delimited. Leading opening punctuation and trailing
/// closing punctuation become single-character tokens; whatever is left in the
/// middle stays whole, so identifiers such as `53500.053021/2018-91`,
/// `CNPJ/MF` or `40.432.544/` are one token each. A whitespace run longer than
/// one character leaves a whitespace token holding the extra characters.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            let mut end = start;
            let mut count = 0;
            while let Some(&(i, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                end = i + w.len_utf8();
                count += 1;
                chars.next();
            }
            if count > 1 {
                // the first whitespace char is the separator
                let first_len = c.len_utf8();
                tokens.push(make_token(text, start + first_len..end));
            }
            continue;
        }

        let mut end = start;
        while let Some(&(i, w)) = chars.peek() {
            if w.is_whitespace() {
                break;
            }
            end = i + w.len_utf8();
            chars.next();
        }
        split_chunk(text, start, end, &mut tokens);
    }

    tokens
}

fn split_chunk(text: &str, start: usize, end: usize, tokens: &mut Vec<Token>) {
    let chunk = &text[start..end];

    let mut core_start = start;
    for c in chunk.chars() {
        if core_start >= end || !OPENING.contains(&c) {
            break;
        }
        tokens.push(make_token(text, core_start..core_start + c.len_utf8()));
        core_start += c.len_utf8();
    }

    let mut suffixes = Vec::new();
    let mut core_end = end;
    for c in text[core_start..end].chars().rev() {
        if core_end <= core_start || !CLOSING.contains(&c) {
            break;
        }
        // never peel the chunk down to nothing
        if core_end - c.len_utf8() == core_start {
            break;
        }
        core_end -= c.len_utf8();
        suffixes.push(core_end..core_end + c.len_utf8());
    }

    if core_end > core_start {
        tokens.push(make_token(text, core_start..core_end));
    }
    for span in suffixes.into_iter().rev() {
        tokens.push(make_token(text, span));
    }
}

fn make_token(text: &str, span: std::ops::Range<usize>) -> Token {
    let raw = &text[span.clone()];
    Token {
        text: raw.to_string(),
        lower: raw.to_lowercase(),
        is_digit: !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()),
        is_punct: !raw.is_empty()
            && raw.chars().all(|c| !c.is_alphanumeric() && !c.is_whitespace()),
        is_space: !raw.is_empty() && raw.chars().all(char::is_whitespace),
        is_title: is_title_case(raw),
        span,
    }
}

/// Title case in the cased/uncased transition sense: every uppercase char must
/// follow an uncased char, every lowercase char must follow a cased char, and
/// at least one cased char must exist.
fn is_title_case(text: &str) -> bool {
    let mut previous_cased = false;
    let mut any_cased = false;

    for c in text.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            any_cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            any_cased = true;
        } else {
            previous_cased = false;
        }
    }

    any_cased
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str) -> Vec<String> {
        tokenize(text).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_identifiers_stay_whole() {
        assert_eq!(
            texts("Processo nº 53500.053021/2018-91"),
            vec!["Processo", "nº", "53500.053021/2018-91"]
        );
        assert_eq!(
            texts("CNPJ/MF nº 40.432.544/0001-47,"),
            vec!["CNPJ/MF", "nº", "40.432.544/0001-47", ","]
        );
    }

    #[test]
    fn test_punctuation_is_peeled() {
        assert_eq!(
            texts("prazo de 15 (quinze) dias."),
            vec!["prazo", "de", "15", "(", "quinze", ")", "dias", "."]
        );
        assert_eq!(texts("Interessado: ACME"), vec!["Interessado", ":", "ACME"]);
    }

    #[test]
    fn test_pure_punctuation_chunk() {
        assert_eq!(texts("a - b"), vec!["a", "-", "b"]);
        assert_eq!(texts("..."), vec![".", ".", "."]);
        assert_eq!(texts(","), vec![","]);
    }

    #[test]
    fn test_spans_slice_source() {
        let text = "Relatório de Fiscalização nº 12/2020";
        for token in tokenize(text) {
            assert_eq!(&text[token.span.clone()], token.text);
        }
    }

    #[test]
    fn test_extra_whitespace_becomes_token() {
        let tokens = tokenize("a   b");
        assert_eq!(tokens.len(), 3);
        assert!(tokens[1].is_space);
        assert_eq!(tokens[1].text, "  ");
    }

    #[test]
    fn test_flags() {
        let tokens = tokenize("Fulano de Tal 2020 , CRC");
        assert!(tokens[0].is_title);
        assert!(!tokens[1].is_title);
        assert!(tokens[3].is_digit);
        assert!(tokens[4].is_punct);
        assert!(!tokens[5].is_title);
        assert_eq!(tokens[5].lower, "crc");
    }

    #[test]
    fn test_title_case_rules() {
        assert!(is_title_case("João"));
        assert!(is_title_case("D'Ávila"));
        assert!(!is_title_case("SILVA"));
        assert!(!is_title_case("silva"));
        assert!(!is_title_case("123"));
    }
}
