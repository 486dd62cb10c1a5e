use crate::config::BoundaryConfig;
use crate::error::{SieveError, SieveResult};
use crate::text::{fold_for_keywords, strip_accents};
use crate::types::{BoundaryRecord, PageDecision, ScanOutcome};
use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone)]
struct Keyword {
    regex: Regex,
    label: String,
}

/// Accumulator threaded through the page fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    pub current_type: Option<String>,
    pub records: Vec<BoundaryRecord>,
}

/// A keyword hit that passed every filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub line: String,
}

/// Decides, page by page, where embedded documents begin.
///
/// A page starts a new document when one of its first lines looks like a
/// header and carries a document-type keyword near the line start. A page
/// whose header repeats the type of the running document is a continuation.
/// Page 0 always starts a document.
#[derive(Debug, Clone)]
pub struct BoundaryClassifier {
    lines_per_page: usize,
    max_offset: usize,
    max_line_len: usize,
    min_header_len: usize,
    auto_start_label: String,
    keywords: Vec<Keyword>,
    noise: Vec<Regex>,
    section_markers: Vec<Regex>,
}

fn compile_folded(pattern: &str) -> SieveResult<Regex> {
    Regex::new(&format!("(?i){}", strip_accents(pattern)))
        .map_err(|e| SieveError::Config(format!("invalid pattern {pattern:?}: {e}")))
}

impl BoundaryClassifier {
    pub fn new(config: &BoundaryConfig) -> SieveResult<Self> {
        let keywords = config
            .keywords
            .iter()
            .map(|rule| {
                Ok(Keyword {
                    regex: compile_folded(&rule.pattern)?,
                    label: match &rule.label {
                        Some(label) if !label.trim().is_empty() => label.trim().to_string(),
                        _ => derive_keyword_label(&rule.pattern),
                    },
                })
            })
            .collect::<SieveResult<Vec<_>>>()?;

        if let Some(empty) = keywords.iter().find(|k| k.label.is_empty()) {
            return Err(SieveError::Config(format!(
                "keyword pattern {:?} yields an empty label",
                empty.regex.as_str()
            )));
        }

        Ok(Self {
            lines_per_page: config.lines_per_page,
            max_offset: config.max_offset,
            max_line_len: config.max_line_len,
            min_header_len: config.min_header_len,
            auto_start_label: config.auto_start_label.clone(),
            keywords,
            noise: config
                .noise_patterns
                .iter()
                .map(|p| compile_folded(p))
                .collect::<SieveResult<Vec<_>>>()?,
            section_markers: config
                .section_markers
                .iter()
                .map(|p| compile_folded(p))
                .collect::<SieveResult<Vec<_>>>()?,
        })
    }

    pub fn keyword_labels(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|k| k.label.as_str())
    }

    /// First N raw lines, trimmed, without blanks and noise lines.
    pub fn usable_lines<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.lines()
            .take(self.lines_per_page)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| {
                let folded = fold_for_keywords(line);
                !self.noise.iter().any(|noise| noise.is_match(&folded))
            })
            .collect()
    }

    /// Long enough, has a word, and is not a numbered/lettered section line.
    pub fn looks_like_header(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.chars().count() < self.min_header_len {
            return false;
        }
        if trimmed.split_whitespace().next().is_none() {
            return false;
        }
        let folded = fold_for_keywords(trimmed);
        !self.section_markers.iter().any(|marker| marker.is_match(&folded))
    }

    /// Scan lines in order, keywords in priority order; first accepted hit wins.
    pub fn find_candidate(&self, page: usize, lines: &[&str]) -> Option<Candidate> {
        for line in lines {
            let folded = fold_for_keywords(line);
            let line_len = folded.chars().count();

            for keyword in &self.keywords {
                let Some(hit) = keyword.regex.find(&folded) else {
                    continue;
                };
                let offset = folded[..hit.start()].chars().count();

                if offset > self.max_offset {
                    debug!(page, label = %keyword.label, offset, max = self.max_offset, "rejected: keyword too far from line start");
                    continue;
                }
                if line_len > self.max_line_len {
                    debug!(page, label = %keyword.label, line_len, max = self.max_line_len, "rejected: line too long");
                    continue;
                }
                if !self.looks_like_header(line) {
                    debug!(page, label = %keyword.label, line = %line, "rejected: not header-shaped");
                    continue;
                }

                return Some(Candidate {
                    label: keyword.label.clone(),
                    line: line.to_string(),
                });
            }
        }
        None
    }

    /// Classify one page and advance the scan state.
    pub fn step(&self, mut state: ScanState, page: usize, text: &str) -> (ScanState, PageDecision) {
        let lines = self.usable_lines(text);

        let mut decision = if lines.is_empty() {
            PageDecision::NoUsableLines
        } else {
            match self.find_candidate(page, &lines) {
                Some(candidate) if state.current_type.as_deref() == Some(candidate.label.as_str()) => {
                    PageDecision::Continuation {
                        label: candidate.label,
                    }
                }
                Some(candidate) => {
                    state.records.push(BoundaryRecord::new(page, candidate.label.clone()));
                    state.current_type = Some(candidate.label.clone());
                    PageDecision::NewDocument {
                        label: candidate.label,
                        line: candidate.line,
                    }
                }
                None => PageDecision::NoMatch,
            }
        };

        // the first page always opens a document, even a blank one
        if page == 0 && !decision.starts_document() {
            state
                .records
                .push(BoundaryRecord::new(0, self.auto_start_label.clone()));
            state.current_type = Some(self.auto_start_label.clone());
            decision = PageDecision::ForcedStart {
                label: self.auto_start_label.clone(),
            };
        }

        debug!(page, usable_lines = lines.len(), ?decision, "page classified");
        (state, decision)
    }

    /// Fold `step` over every page in order.
    pub fn scan<I, S>(&self, pages: I) -> ScanOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut decisions = Vec::new();
        let mut total_pages = 0;

        let state = pages
            .into_iter()
            .enumerate()
            .fold(ScanState::default(), |state, (page, text)| {
                total_pages += 1;
                let (state, decision) = self.step(state, page, text.as_ref());
                decisions.push(decision);
                state
            });

        ScanOutcome {
            total_pages,
            records: state.records,
            decisions,
        }
    }
}

/// Human label for a keyword pattern that has no explicit one.
///
/// Optional groups are dropped, character classes collapse to their first
/// member, `\b`/`\B` vanish, `\s` becomes a space, other metacharacters are
/// removed; the result is accent-stripped, uppercased and space-collapsed.
/// `\bRECIBO ELETR[OÔ]NICO DE PROTOCOLO\b` -> `RECIBO ELETRONICO DE PROTOCOLO`.
pub fn derive_keyword_label(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                match chars.get(i + 1) {
                    Some('s') => out.push(' '),
                    Some(c) if c.is_ascii_alphabetic() => {}
                    Some(c) => out.push(*c),
                    None => {}
                }
                i += 2;
            }
            '[' => match chars[i..].iter().position(|c| *c == ']') {
                Some(len) => {
                    if let Some(first) = chars[i + 1..i + len].iter().find(|c| **c != '^') {
                        out.push(*first);
                    }
                    i += len + 1;
                }
                None => i += 1,
            },
            '(' => {
                let close = matching_paren(&chars, i);
                let optional = close
                    .and_then(|c| chars.get(c + 1))
                    .is_some_and(|q| *q == '?' || *q == '*');
                match close {
                    Some(c) if optional => i = c + 2,
                    _ if chars.get(i + 1) == Some(&'?') => i += 3,
                    _ => i += 1,
                }
            }
            '{' => {
                i += chars[i..].iter().position(|c| *c == '}').unwrap_or(0) + 1;
            }
            ')' | '^' | '$' | '|' | '?' | '*' | '+' | '.' => i += 1,
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    fold_for_keywords(&out)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
