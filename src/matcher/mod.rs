mod fuzzy;

pub use fuzzy::{similarity, token_sort};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::MatchingConfig;
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{Result, SkillGapError};
use crate::ner::CandidateSkillSet;
use crate::text::SkillTerm;
use crate::vocabulary::SkillVocabulary;

use fuzzy::{sorted_similarity, similarity_upper_bound};

/// Which signal accepted a vocabulary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
    Semantic,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::Exact => write!(f, "exact"),
            MatchMethod::Fuzzy => write!(f, "fuzzy"),
            MatchMethod::Semantic => write!(f, "semantic"),
        }
    }
}

/// A vocabulary skill judged present in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    /// Canonical vocabulary spelling
    pub skill: String,
    pub method: MatchMethod,
    pub confidence: f32,
    /// Candidate phrase that triggered the match
    pub evidence: String,
}

/// Skills present in one document, in vocabulary order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    vocabulary: String,
    matches: Vec<SkillMatch>,
}

impl MatchResult {
    pub fn new(vocabulary_fingerprint: impl Into<String>, matches: Vec<SkillMatch>) -> Self {
        Self {
            vocabulary: vocabulary_fingerprint.into(),
            matches,
        }
    }

    /// Fingerprint of the vocabulary this result was computed against
    pub fn vocabulary_fingerprint(&self) -> &str {
        &self.vocabulary
    }

    pub fn matches(&self) -> &[SkillMatch] {
        &self.matches
    }

    pub fn skills(&self) -> impl Iterator<Item = &str> {
        self.matches.iter().map(|m| m.skill.as_str())
    }

    pub fn get(&self, skill: &str) -> Option<&SkillMatch> {
        self.matches.iter().find(|m| m.skill == skill)
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.get(skill).is_some()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Vocabulary embeddings, computed once and reused for every document
struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    vocabulary_embeddings: Vec<Vec<f32>>,
}

struct PreparedCandidate<'a> {
    term: &'a SkillTerm,
    sorted: String,
    len: usize,
}

/// Aligns candidate phrases with the vocabulary.
///
/// Signals are tried in order exact, fuzzy, semantic; the first that fires decides
/// the method. Ties between candidates go to the first in sort order.
pub struct SkillMatcher {
    vocabulary: Arc<SkillVocabulary>,
    sorted_terms: Vec<String>,
    thresholds: MatchingConfig,
    semantic: Option<SemanticIndex>,
}

impl SkillMatcher {
    pub fn new(vocabulary: Arc<SkillVocabulary>, thresholds: MatchingConfig) -> Result<Self> {
        thresholds.validate()?;
        let sorted_terms = vocabulary
            .entries()
            .iter()
            .map(|e| token_sort(e.term.as_str()))
            .collect();

        Ok(Self {
            vocabulary,
            sorted_terms,
            thresholds,
            semantic: None,
        })
    }

    /// Enable the semantic signal. Embeds the whole vocabulary in one batch.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let texts: Vec<String> = self
            .vocabulary
            .entries()
            .iter()
            .map(|e| e.term.as_str().to_string())
            .collect();

        info!(
            "Embedding {} vocabulary entries with {}",
            texts.len(),
            embedder.model_id()
        );
        let vocabulary_embeddings = embedder
            .embed_batch(&texts)
            .map_err(|e| SkillGapError::Embedding(e.to_string()))?;

        if vocabulary_embeddings.len() != texts.len() {
            return Err(SkillGapError::Embedding(format!(
                "expected {} vocabulary embeddings, got {}",
                texts.len(),
                vocabulary_embeddings.len()
            )));
        }

        self.semantic = Some(SemanticIndex {
            embedder,
            vocabulary_embeddings,
        });
        Ok(self)
    }

    pub fn vocabulary(&self) -> &SkillVocabulary {
        &self.vocabulary
    }

    pub fn thresholds(&self) -> &MatchingConfig {
        &self.thresholds
    }

    pub fn has_semantic(&self) -> bool {
        self.semantic.is_some()
    }

    /// Embedder backing the semantic signal, if any
    pub fn embedder(&self) -> Option<&Arc<dyn Embedder>> {
        self.semantic.as_ref().map(|s| &s.embedder)
    }

    /// Decide which vocabulary entries the candidates support
    pub fn match_candidates(&self, candidates: &CandidateSkillSet) -> Result<MatchResult> {
        let prepared: Vec<PreparedCandidate> = candidates
            .iter()
            .map(|term| PreparedCandidate {
                term,
                sorted: token_sort(term.as_str()),
                len: term.char_len(),
            })
            .collect();

        let mut candidate_embeddings: Option<Vec<Vec<f32>>> = None;
        let mut matches = Vec::new();

        for (idx, entry) in self.vocabulary.entries().iter().enumerate() {
            if candidates.contains(&entry.term) {
                matches.push(SkillMatch {
                    skill: entry.display.clone(),
                    method: MatchMethod::Exact,
                    confidence: 1.0,
                    evidence: entry.term.to_string(),
                });
                continue;
            }

            if prepared.is_empty() {
                continue;
            }

            if let Some((candidate, score)) =
                self.best_fuzzy(&self.sorted_terms[idx], entry.term.char_len(), &prepared)
            {
                matches.push(SkillMatch {
                    skill: entry.display.clone(),
                    method: MatchMethod::Fuzzy,
                    confidence: score,
                    evidence: candidate.to_string(),
                });
                continue;
            }

            let Some(semantic) = &self.semantic else {
                continue;
            };

            if candidate_embeddings.is_none() {
                let texts: Vec<String> =
                    prepared.iter().map(|c| c.term.as_str().to_string()).collect();
                let embeddings = semantic
                    .embedder
                    .embed_batch(&texts)
                    .map_err(|e| SkillGapError::Embedding(e.to_string()))?;
                if embeddings.len() != texts.len() {
                    return Err(SkillGapError::Embedding(format!(
                        "expected {} candidate embeddings, got {}",
                        texts.len(),
                        embeddings.len()
                    )));
                }
                candidate_embeddings = Some(embeddings);
            }
            let Some(embeddings) = candidate_embeddings.as_ref() else {
                continue;
            };

            let target = &semantic.vocabulary_embeddings[idx];
            let mut best: Option<(usize, f32)> = None;
            for (i, embedding) in embeddings.iter().enumerate() {
                let score = cosine_similarity(target, embedding);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((i, score));
                }
            }

            if let Some((i, score)) = best {
                if score >= self.thresholds.semantic_threshold {
                    matches.push(SkillMatch {
                        skill: entry.display.clone(),
                        method: MatchMethod::Semantic,
                        confidence: score.clamp(0.0, 1.0),
                        evidence: prepared[i].term.to_string(),
                    });
                }
            }
        }

        debug!(
            "Matched {} of {} vocabulary skills from {} candidates (exact={}, fuzzy={}, semantic={})",
            matches.len(),
            self.vocabulary.len(),
            candidates.len(),
            matches.iter().filter(|m| m.method == MatchMethod::Exact).count(),
            matches.iter().filter(|m| m.method == MatchMethod::Fuzzy).count(),
            matches.iter().filter(|m| m.method == MatchMethod::Semantic).count()
        );

        Ok(MatchResult::new(self.vocabulary.fingerprint(), matches))
    }

    /// Best candidate meeting the fuzzy threshold
    fn best_fuzzy<'c>(
        &self,
        sorted_entry: &str,
        entry_len: usize,
        candidates: &'c [PreparedCandidate],
    ) -> Option<(&'c SkillTerm, f32)> {
        let threshold = self.thresholds.fuzzy_threshold;
        let mut best: Option<(&SkillTerm, f32)> = None;

        for candidate in candidates {
            if similarity_upper_bound(entry_len, candidate.len) < threshold {
                continue;
            }
            let score = sorted_similarity(sorted_entry, &candidate.sorted);
            if score >= threshold && best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate.term, score));
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn vocabulary(entries: &[&str]) -> Arc<SkillVocabulary> {
        Arc::new(SkillVocabulary::from_entries(entries.iter().copied()).unwrap())
    }

    fn candidates(terms: &[&str]) -> CandidateSkillSet {
        terms.iter().filter_map(|t| SkillTerm::new(t)).collect()
    }

    fn thresholds(fuzzy: f32, semantic: f32) -> MatchingConfig {
        MatchingConfig {
            fuzzy_threshold: fuzzy,
            semantic_threshold: semantic,
        }
    }

    /// Fixed vectors: "containerization" sits next to "docker", everything else is orthogonal
    struct StaticEmbedder {
        calls: AtomicUsize,
    }

    impl StaticEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for StaticEmbedder {
        fn model_id(&self) -> &str {
            "static-test"
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "containerization" => vec![1.0, 0.0],
                    "docker" => vec![0.9, 0.1],
                    _ => vec![0.0, 1.0],
                })
                .collect())
        }
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let matcher = SkillMatcher::new(
            vocabulary(&["Python", "SQL", "Docker"]),
            MatchingConfig::default(),
        )
        .unwrap();
        let result = matcher.match_candidates(&candidates(&["PYTHON", "docker"])).unwrap();

        assert_eq!(result.skills().collect::<Vec<_>>(), vec!["Python", "Docker"]);
        for m in result.matches() {
            assert_eq!(m.method, MatchMethod::Exact);
            assert_eq!(m.confidence, 1.0);
        }
    }

    #[test]
    fn test_pytorch_does_not_fuzzy_match_torch_at_default() {
        let matcher =
            SkillMatcher::new(vocabulary(&["Torch"]), MatchingConfig::default()).unwrap();
        let result = matcher.match_candidates(&candidates(&["PyTorch"])).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_pytorch_fuzzy_matches_torch_at_lower_threshold() {
        let matcher = SkillMatcher::new(vocabulary(&["Torch"]), thresholds(0.7, 0.7)).unwrap();
        let result = matcher.match_candidates(&candidates(&["PyTorch"])).unwrap();

        let m = result.get("Torch").unwrap();
        assert_eq!(m.method, MatchMethod::Fuzzy);
        assert!((m.confidence - 5.0 / 7.0).abs() < 1e-6);
        assert_eq!(m.evidence, "pytorch");
    }

    #[test]
    fn test_fuzzy_typo_and_word_order() {
        let matcher = SkillMatcher::new(
            vocabulary(&["Kubernetes", "Machine Learning"]),
            MatchingConfig::default(),
        )
        .unwrap();
        let result = matcher
            .match_candidates(&candidates(&["kubernete", "learning machine"]))
            .unwrap();

        let k8s = result.get("Kubernetes").unwrap();
        assert_eq!(k8s.method, MatchMethod::Fuzzy);
        assert!((k8s.confidence - 0.9).abs() < 1e-6);

        let ml = result.get("Machine Learning").unwrap();
        assert_eq!(ml.method, MatchMethod::Fuzzy);
        assert_eq!(ml.confidence, 1.0);
    }

    #[test]
    fn test_fuzzy_threshold_monotonic() {
        let vocab = vocabulary(&["Kubernetes", "Torch", "PostgreSQL", "Terraform", "Rust"]);
        let cands = candidates(&["kubernete", "pytorch", "postgres", "terraforms", "rusty"]);

        let mut previous: Option<HashSet<String>> = None;
        for step in 0..=10 {
            let fuzzy = step as f32 / 10.0;
            let matcher = SkillMatcher::new(vocab.clone(), thresholds(fuzzy, 0.7)).unwrap();
            let skills: HashSet<String> = matcher
                .match_candidates(&cands)
                .unwrap()
                .skills()
                .map(str::to_string)
                .collect();
            if let Some(prev) = &previous {
                assert!(skills.is_subset(prev), "threshold {} added matches", fuzzy);
            }
            previous = Some(skills);
        }
    }

    #[test]
    fn test_idempotent() {
        let matcher = SkillMatcher::new(
            vocabulary(&["Python", "Kubernetes", "Docker"]),
            MatchingConfig::default(),
        )
        .unwrap()
        .with_embedder(Arc::new(StaticEmbedder::new()))
        .unwrap();
        let cands = candidates(&["python", "kubernete", "containerization"]);

        let first = matcher.match_candidates(&cands).unwrap();
        let second = matcher.match_candidates(&cands).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_semantic_match() {
        let matcher = SkillMatcher::new(vocabulary(&["Docker", "SQL"]), MatchingConfig::default())
            .unwrap()
            .with_embedder(Arc::new(StaticEmbedder::new()))
            .unwrap();
        let result = matcher.match_candidates(&candidates(&["containerization"])).unwrap();

        assert_eq!(result.len(), 1);
        let m = result.get("Docker").unwrap();
        assert_eq!(m.method, MatchMethod::Semantic);
        assert!(m.confidence > 0.99);
        assert_eq!(m.evidence, "containerization");
    }

    #[test]
    fn test_semantic_threshold_respected() {
        let matcher = SkillMatcher::new(vocabulary(&["Docker"]), thresholds(0.85, 1.0))
            .unwrap()
            .with_embedder(Arc::new(StaticEmbedder::new()))
            .unwrap();
        let result = matcher.match_candidates(&candidates(&["containerization"])).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_exact_wins_over_semantic() {
        let matcher = SkillMatcher::new(vocabulary(&["Docker"]), MatchingConfig::default())
            .unwrap()
            .with_embedder(Arc::new(StaticEmbedder::new()))
            .unwrap();
        let result = matcher
            .match_candidates(&candidates(&["containerization", "docker"]))
            .unwrap();
        assert_eq!(result.get("Docker").unwrap().method, MatchMethod::Exact);
    }

    #[test]
    fn test_candidate_embeddings_are_lazy() {
        let embedder = Arc::new(StaticEmbedder::new());
        let matcher = SkillMatcher::new(vocabulary(&["Docker"]), MatchingConfig::default())
            .unwrap()
            .with_embedder(embedder.clone())
            .unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        matcher.match_candidates(&candidates(&["docker"])).unwrap();
        matcher.match_candidates(&CandidateSkillSet::new()).unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        matcher.match_candidates(&candidates(&["containerization"])).unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    /// Returns the right count for the vocabulary, then two extra vectors per batch
    struct MiscountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for MiscountingEmbedder {
        fn model_id(&self) -> &str {
            "miscounting-test"
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            let extra = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                0
            } else {
                2
            };
            let mut embeddings: Vec<Vec<f32>> = texts.iter().map(|_| vec![0.0, 1.0]).collect();
            embeddings.extend((0..extra).map(|_| vec![1.0, 0.0]));
            Ok(embeddings)
        }
    }

    #[test]
    fn test_candidate_embedding_count_checked() {
        let matcher = SkillMatcher::new(vocabulary(&["Docker"]), MatchingConfig::default())
            .unwrap()
            .with_embedder(Arc::new(MiscountingEmbedder {
                calls: AtomicUsize::new(0),
            }))
            .unwrap();

        let err = matcher
            .match_candidates(&candidates(&["containerization"]))
            .err()
            .unwrap();
        assert!(matches!(err, SkillGapError::Embedding(_)));
    }

    #[test]
    fn test_empty_candidates() {
        let matcher =
            SkillMatcher::new(vocabulary(&["Python"]), MatchingConfig::default()).unwrap();
        let result = matcher.match_candidates(&CandidateSkillSet::new()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.vocabulary_fingerprint(), matcher.vocabulary().fingerprint());
    }

    #[test]
    fn test_invalid_thresholds() {
        let err = SkillMatcher::new(vocabulary(&["Python"]), thresholds(-0.1, 0.7))
            .err()
            .unwrap();
        assert!(matches!(err, SkillGapError::Config(_)));
    }
}
