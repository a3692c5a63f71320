use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

use super::annotator::{Annotator, RuleAnnotator};
use crate::config::ExtractionConfig;
use crate::text::{is_stop_word, scrub_contacts, SkillTerm};

/// List items with more tokens than this are prose, not skills
const MAX_LIST_ITEM_TOKENS: usize = 5;

/// Candidate skill phrases found in one document, kept sorted for deterministic matching.
///
/// May contain near-duplicates ("docker", "docker compose"); the matcher decides what counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSkillSet(BTreeSet<SkillTerm>);

impl CandidateSkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, term: SkillTerm) -> bool {
        self.0.insert(term)
    }

    pub fn contains(&self, term: &SkillTerm) -> bool {
        self.0.contains(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillTerm> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<SkillTerm> for CandidateSkillSet {
    fn from_iter<I: IntoIterator<Item = SkillTerm>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CandidateSkillSet {
    type Item = &'a SkillTerm;
    type IntoIter = std::collections::btree_set::Iter<'a, SkillTerm>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// "Skills: Rust, Go, Kubernetes" style section lines
static HEADER_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:technical |core |key |soft )?(?:skills?|skill set|technologies|technology stack|tech stack|stack|tools|languages|programming languages|frameworks|libraries|competencies|expertise|platforms|proficiencies|certifications)[ \t]*[:\-–][ \t]*(.+)$",
    )
    .unwrap()
});

// "experience with X, Y and Z" style requirement phrases
static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:proficien(?:t|cy) (?:in|with)|experience (?:in|with)|experienced (?:in|with)|knowledge of|familiar(?:ity)? with|expertise (?:in|with)|skilled in|skills in|background in|requires?|required|must have|nice to have|such as|including|like)\b:?[ \t]*([^.!?\n]+)",
    )
    .unwrap()
});

// "Amazon Web Services (AWS)"
static ACRONYM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([A-Za-z][A-Za-z0-9+#.\-]{0,14})\)").unwrap());

// C++, C#, F#, .NET, Node.js
static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z]+(?:\+\+|#)|\.net\b|\b[a-z0-9]+\.js\b").unwrap()
});

static LIST_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:[,;/|•·&]|\band\b|\bor\b)\s*").unwrap());

/// Skill candidate extractor: an annotation pass plus regex rules for list-style mentions.
///
/// Over-generation is fine here, the matcher filters everything against the vocabulary.
pub struct SkillExtractor {
    annotator: Box<dyn Annotator>,
    max_phrase_len: usize,
}

impl Default for SkillExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl SkillExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self::with_annotator(Box::new(RuleAnnotator), config)
    }

    pub fn with_annotator(annotator: Box<dyn Annotator>, config: &ExtractionConfig) -> Self {
        Self {
            annotator,
            max_phrase_len: config.max_phrase_len,
        }
    }

    /// Extract candidate skill phrases from text
    pub fn extract(&self, text: &str) -> CandidateSkillSet {
        if text.trim().is_empty() {
            return CandidateSkillSet::new();
        }

        debug!("Extracting skill candidates from text ({} chars)", text.len());

        let text = scrub_contacts(text);
        let annotation = self.annotator.annotate(&text);

        let mut candidates = CandidateSkillSet::new();
        let annotated = annotation
            .tokens
            .iter()
            .chain(&annotation.noun_phrases)
            .chain(&annotation.entities);
        for phrase in annotated {
            self.accept(phrase, &mut candidates);
        }
        let annotated_count = candidates.len();

        for item in self.rule_matches(&text) {
            self.accept(&item, &mut candidates);
        }

        debug!(
            "Extracted {} candidates ({} from annotation, {} tokens, {} noun phrases, {} entities)",
            candidates.len(),
            annotated_count,
            annotation.tokens.len(),
            annotation.noun_phrases.len(),
            annotation.entities.len()
        );

        candidates
    }

    /// Phrases caught by the regex rules
    fn rule_matches(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();

        for re in [&*HEADER_LIST_RE, &*REQUIREMENT_RE] {
            for cap in re.captures_iter(text) {
                if let Some(list) = cap.get(1) {
                    found.extend(Self::split_list(list.as_str()));
                }
            }
        }

        found.extend(
            ACRONYM_RE
                .captures_iter(text)
                .filter_map(|cap| cap.get(1))
                .map(|m| m.as_str().to_string()),
        );
        found.extend(SYMBOL_RE.find_iter(text).map(|m| m.as_str().to_string()));

        found
    }

    fn split_list(list: &str) -> impl Iterator<Item = String> + '_ {
        LIST_SPLIT_RE
            .split(list)
            .map(trim_stop_words)
            .filter(|item| {
                !item.is_empty() && item.split_whitespace().count() <= MAX_LIST_ITEM_TOKENS
            })
    }

    fn accept(&self, phrase: &str, candidates: &mut CandidateSkillSet) {
        let Some(term) = SkillTerm::new(phrase) else {
            return;
        };
        if term.char_len() > self.max_phrase_len || term.is_stop_word() || term.is_numeric() {
            return;
        }
        candidates.insert(term);
    }
}

/// Drop leading and trailing stop words ("the AWS" -> "AWS")
fn trim_stop_words(item: &str) -> String {
    let words: Vec<&str> = item.split_whitespace().collect();
    let is_stop = |w: &&str| is_stop_word(&w.to_lowercase());
    let start = words.iter().position(|w| !is_stop(w)).unwrap_or(words.len());
    let end = words.iter().rposition(|w| !is_stop(w)).map_or(start, |i| i + 1);
    words[start..end.max(start)].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> CandidateSkillSet {
        SkillExtractor::default().extract(text)
    }

    fn has(candidates: &CandidateSkillSet, term: &str) -> bool {
        candidates.contains(&SkillTerm::new(term).unwrap())
    }

    #[test]
    fn test_empty_text() {
        assert!(extract("").is_empty());
        assert!(extract("   \n\t").is_empty());
    }

    #[test]
    fn test_extract_tokens() {
        let candidates = extract("Proficient in Python and containerization with Docker");
        assert!(has(&candidates, "python"));
        assert!(has(&candidates, "docker"));
        assert!(has(&candidates, "containerization"));
        assert!(!has(&candidates, "with"));
        assert!(!has(&candidates, "and"));
    }

    #[test]
    fn test_skills_header_list() {
        let candidates = extract("Summary\nSkills: Rust, Kubernetes, CI/CD, Google Cloud Platform\n");
        assert!(has(&candidates, "rust"));
        assert!(has(&candidates, "kubernetes"));
        assert!(has(&candidates, "ci/cd"));
        assert!(has(&candidates, "google cloud platform"));
    }

    #[test]
    fn test_requirement_phrase_list() {
        let candidates = extract("Experience with the ELK stack or Apache Kafka is required.");
        assert!(has(&candidates, "elk stack"));
        assert!(has(&candidates, "apache kafka"));
    }

    #[test]
    fn test_multi_word_phrases() {
        let candidates = extract("Strong machine learning background; built Ruby on Rails apps.");
        assert!(has(&candidates, "machine learning"));
        assert!(has(&candidates, "ruby on rails"));
    }

    #[test]
    fn test_conjoined_entities() {
        let candidates = extract("Built services with Ruby on Rails and Power BI");
        assert!(has(&candidates, "ruby on rails"));
        assert!(has(&candidates, "power bi"));
    }

    #[test]
    fn test_symbols_and_acronyms() {
        let candidates = extract("Worked on Amazon Web Services (AWS) with C++, C# and .NET");
        assert!(has(&candidates, "aws"));
        assert!(has(&candidates, "amazon web services"));
        assert!(has(&candidates, "c++"));
        assert!(has(&candidates, "c#"));
        assert!(has(&candidates, ".net"));
    }

    #[test]
    fn test_contacts_and_numbers_dropped() {
        let candidates = extract("jane@example.com https://example.com 2019 Rust");
        assert!(has(&candidates, "rust"));
        assert!(candidates.iter().all(|c| !c.as_str().contains('@')));
        assert!(!has(&candidates, "2019"));
    }

    #[test]
    fn test_phrase_length_bound() {
        let extractor = SkillExtractor::new(&ExtractionConfig { max_phrase_len: 12 });
        let candidates = extractor.extract("Distributed systems engineering");
        assert!(has(&candidates, "distributed"));
        assert!(!has(&candidates, "distributed systems"));
        assert!(candidates.iter().all(|c| c.char_len() <= 12));
    }

    #[test]
    fn test_trim_stop_words() {
        assert_eq!(trim_stop_words("the AWS"), "AWS");
        assert_eq!(trim_stop_words("and the"), "");
        assert_eq!(trim_stop_words("Ruby on Rails"), "Ruby on Rails");
    }

    #[test]
    fn test_custom_annotator() {
        struct Fixed;
        impl Annotator for Fixed {
            fn annotate(&self, _text: &str) -> crate::ner::Annotation {
                crate::ner::Annotation {
                    entities: vec!["Power BI".to_string()],
                    ..Default::default()
                }
            }
        }

        let extractor = SkillExtractor::with_annotator(Box::new(Fixed), &ExtractionConfig::default());
        let candidates = extractor.extract("anything at all");
        assert_eq!(candidates.len(), 1);
        assert!(has(&candidates, "power bi"));
    }
}
