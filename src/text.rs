//! Text normalization shared by every pipeline stage.
//!
//! Vocabulary entries and candidate phrases are both turned into [`SkillTerm`]s,
//! so all comparisons downstream operate on the same canonical form.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A case-folded, whitespace-collapsed skill string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillTerm(String);

impl SkillTerm {
    /// Normalize `raw` into a term. Returns `None` when nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in Unicode scalar values
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn token_count(&self) -> usize {
        self.0.split(' ').count()
    }

    pub fn is_stop_word(&self) -> bool {
        is_stop_word(&self.0)
    }

    /// True when the term has no letters at all (years, counts, version numbers)
    pub fn is_numeric(&self) -> bool {
        !self.0.chars().any(char::is_alphabetic)
    }
}

impl fmt::Display for SkillTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SkillTerm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_term_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '+' | '#' | '.')
}

/// Lowercase, collapse whitespace, and strip surrounding punctuation.
///
/// `+`, `#` and a leading `.` survive so that `C++`, `C#` and `.NET` keep their identity.
pub fn normalize(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut s = collapsed.as_str();
    loop {
        let trimmed = s
            .trim_matches(|c: char| !is_term_char(c))
            .trim_end_matches('.');
        if trimmed.len() == s.len() {
            break;
        }
        s = trimmed;
    }
    s.to_string()
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://\S+|http\S+|www\.\S+").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d\s\-]{7,}\d").unwrap());
static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Aggressive cleanup used for whole-document embeddings.
///
/// Lowercases, removes emails, URLs and phone numbers, replaces everything outside
/// `[a-z0-9\s]` with a space and collapses runs of whitespace.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = text.to_lowercase();
    let text = EMAIL_RE.replace_all(&text, " ");
    let text = URL_RE.replace_all(&text, " ");
    let text = PHONE_RE.replace_all(&text, " ");
    let text = NON_ALNUM_RE.replace_all(&text, " ");
    let text = SPACES_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Replace contact details with line breaks while leaving the rest of the text intact.
///
/// Unlike [`clean_text`] this keeps casing and punctuation, which the candidate
/// extractor relies on for clause and entity detection.
pub fn scrub_contacts(text: &str) -> String {
    let text = EMAIL_RE.replace_all(text, "\n");
    let text = URL_RE.replace_all(&text, "\n");
    PHONE_RE.replace_all(&text, "\n").into_owned()
}

// English function words. Content words that double as skill names are left out on purpose.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
        "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
        "amongst", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
        "anywhere", "are", "around", "as", "at", "be", "became", "because", "become",
        "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below",
        "beside", "besides", "between", "beyond", "both", "but", "by", "can", "cannot",
        "could", "did", "do", "does", "doing", "done", "down", "due", "during", "each",
        "either", "else", "elsewhere", "enough", "etc", "even", "ever", "every", "everyone",
        "everything", "everywhere", "except", "few", "for", "former", "formerly", "from",
        "further", "had", "has", "have", "having", "he", "hence", "her", "here", "hereafter",
        "hereby", "herein", "hers", "herself", "him", "himself", "his", "how", "however",
        "i", "if", "in", "indeed", "into", "is", "it", "its", "itself", "just", "last",
        "latter", "least", "less", "many", "may", "me", "meanwhile", "might", "mine", "more",
        "moreover", "most", "mostly", "much", "must", "my", "myself", "namely", "neither",
        "never", "nevertheless", "next", "no", "nobody", "none", "noone", "nor", "not",
        "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only",
        "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out",
        "over", "own", "per", "perhaps", "please", "quite", "rather", "really", "same",
        "several", "she", "should", "since", "so", "some", "somehow", "someone", "something",
        "sometime", "sometimes", "somewhere", "still", "such", "than", "that", "the",
        "their", "theirs", "them", "themselves", "then", "thence", "there", "thereafter",
        "thereby", "therefore", "therein", "thereupon", "these", "they", "this", "those",
        "though", "through", "throughout", "thru", "thus", "to", "together", "too", "toward",
        "towards", "under", "unless", "until", "up", "upon", "us", "used", "using", "very",
        "via", "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever",
        "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
        "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose",
        "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
        "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}
