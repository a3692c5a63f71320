use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::is_stop_word;

/// Longest sub-phrase taken out of a noun-phrase run
const MAX_NGRAM: usize = 3;

/// Words allowed between capitalised tokens of one entity ("Ruby on Rails")
const ENTITY_CONNECTORS: &[&str] = &["of", "on", "for", "and", "&"];

/// Connectors that may also join two separate entities ("Ruby on Rails and Power BI")
const ENTITY_CONJUNCTIONS: &[&str] = &["and", "&"];

/// Output of a linguistic annotation pass
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    /// Content tokens (stop words removed)
    pub tokens: Vec<String>,
    pub noun_phrases: Vec<String>,
    pub entities: Vec<String>,
}

/// A linguistic annotation pass over raw text.
///
/// Implementations may be backed by a full NLP model; the pipeline only relies on
/// the three span lists in [`Annotation`].
pub trait Annotator: Send + Sync {
    fn annotate(&self, text: &str) -> Annotation;
}

/// Heuristic annotator: noun phrases are runs of non-stop-words inside a clause,
/// entities are runs of capitalised tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleAnnotator;

static CLAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[,;:!?()\[\]{}|•·"\n\r\t]+|\.(?:\s+|$)|\s[-–—]+\s"#).unwrap());

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.?[\p{L}\p{N}][\p{L}\p{N}+#./\-]*|&").unwrap());

impl RuleAnnotator {
    fn clause_tokens(clause: &str) -> Vec<&str> {
        TOKEN_RE
            .find_iter(clause)
            .map(|m| m.as_str().trim_end_matches(['.', '-', '/']))
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn is_capitalised(token: &str) -> bool {
        token
            .trim_start_matches('.')
            .chars()
            .next()
            .is_some_and(char::is_uppercase)
    }

    fn entities(tokens: &[&str], out: &mut Vec<String>) {
        let mut i = 0;
        while i < tokens.len() {
            if !Self::is_capitalised(tokens[i]) {
                i += 1;
                continue;
            }
            let mut end = i + 1;
            let mut j = i + 1;
            while j < tokens.len() {
                if Self::is_capitalised(tokens[j]) {
                    j += 1;
                    end = j;
                } else if ENTITY_CONNECTORS.contains(&tokens[j].to_lowercase().as_str())
                    && tokens.get(j + 1).is_some_and(|t| Self::is_capitalised(t))
                {
                    j += 1;
                } else {
                    break;
                }
            }
            let run = &tokens[i..end];
            out.push(run.join(" "));

            // Each conjunct is an entity in its own right
            let parts: Vec<&[&str]> = run
                .split(|t| ENTITY_CONJUNCTIONS.contains(&t.to_lowercase().as_str()))
                .filter(|part| !part.is_empty())
                .collect();
            if parts.len() > 1 {
                out.extend(parts.into_iter().map(|part| part.join(" ")));
            }
            i = end;
        }
    }

    fn noun_phrases(tokens: &[&str], out: &mut Vec<String>) {
        let runs = tokens
            .split(|t| *t == "&" || is_stop_word(&t.to_lowercase()))
            .filter(|run| !run.is_empty());

        for run in runs {
            if run.len() > 1 {
                out.push(run.join(" "));
            }
            for size in 2..=MAX_NGRAM.min(run.len().saturating_sub(1)) {
                for window in run.windows(size) {
                    out.push(window.join(" "));
                }
            }
        }
    }
}

impl Annotator for RuleAnnotator {
    fn annotate(&self, text: &str) -> Annotation {
        let mut annotation = Annotation::default();

        for clause in CLAUSE_RE.split(text) {
            let tokens = Self::clause_tokens(clause);
            if tokens.is_empty() {
                continue;
            }

            for token in &tokens {
                let lower = token.to_lowercase();
                if !token.chars().any(char::is_alphabetic) || is_stop_word(&lower) {
                    continue;
                }
                if token.contains('/') {
                    annotation
                        .tokens
                        .extend(token.split('/').filter(|p| !p.is_empty()).map(str::to_string));
                }
                annotation.tokens.push(token.to_string());
            }

            Self::noun_phrases(&tokens, &mut annotation.noun_phrases);
            Self::entities(&tokens, &mut annotation.entities);
        }

        annotation
    }
}
