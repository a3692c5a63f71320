use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedding::{cosine_similarity, init_embedder, Embedder};
use crate::error::{Result, SkillGapError};
use crate::extract::{extract_text, Artifact};
use crate::matcher::{MatchResult, SkillMatcher};
use crate::ner::{CandidateSkillSet, SkillExtractor};
use crate::report::{compare, ComparisonReport};
use crate::text::clean_text;
use crate::vocabulary::SkillVocabulary;

/// Everything a run needs, built once and shared read-only.
///
/// Holds the vocabulary (with its embeddings when semantic matching is on), the
/// candidate extractor, and the thresholds.
pub struct SkillGapAnalyzer {
    extractor: SkillExtractor,
    matcher: SkillMatcher,
    min_char_count: usize,
}

impl SkillGapAnalyzer {
    pub fn new(
        vocabulary: Arc<SkillVocabulary>,
        config: &Config,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut matcher = SkillMatcher::new(vocabulary, config.matching.clone())?;
        if let Some(embedder) = embedder {
            matcher = matcher.with_embedder(embedder)?;
        }

        info!(
            "Analyzer ready: {} vocabulary skills, fuzzy>={}, semantic={}",
            matcher.vocabulary().len(),
            config.matching.fuzzy_threshold,
            if matcher.has_semantic() {
                format!(">={}", config.matching.semantic_threshold)
            } else {
                "off".to_string()
            }
        );

        Ok(Self {
            extractor: SkillExtractor::new(&config.extraction),
            matcher,
            min_char_count: config.pipeline.min_char_count,
        })
    }

    /// Load the vocabulary and embedder named by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let vocabulary = SkillVocabulary::load(&config.vocabulary.path, &config.vocabulary)?;
        let embedder = init_embedder(&config.models, &config.cache)
            .map_err(|e| SkillGapError::Embedding(format!("{:#}", e)))?;
        Self::new(Arc::new(vocabulary), config, embedder)
    }

    pub fn vocabulary(&self) -> &SkillVocabulary {
        self.matcher.vocabulary()
    }

    pub fn matcher(&self) -> &SkillMatcher {
        &self.matcher
    }

    pub fn extract_candidates(&self, text: &str) -> CandidateSkillSet {
        self.extractor.extract(text)
    }

    /// Vocabulary skills present in a single document
    pub fn analyze_text(&self, text: &str) -> Result<MatchResult> {
        let candidates = self.extractor.extract(text);
        self.matcher.match_candidates(&candidates)
    }

    /// Cosine similarity of the two cleaned documents, when an embedder is configured
    pub fn document_similarity(&self, resume: &str, job: &str) -> Result<Option<f32>> {
        let Some(embedder) = self.matcher.embedder() else {
            return Ok(None);
        };

        let texts = vec![clean_text(resume), clean_text(job)];
        if texts.iter().any(|t| t.is_empty()) {
            debug!("Skipping document similarity for empty text");
            return Ok(None);
        }

        let embeddings = embedder
            .embed_batch(&texts)
            .map_err(|e| SkillGapError::Embedding(e.to_string()))?;
        match embeddings.as_slice() {
            [a, b] => Ok(Some(cosine_similarity(a, b))),
            _ => Err(SkillGapError::Embedding(format!(
                "expected 2 document embeddings, got {}",
                embeddings.len()
            ))),
        }
    }

    fn check_length(&self, label: &str, text: &str) {
        let chars = text.chars().count();
        if chars < self.min_char_count {
            warn!(
                "{} text is short ({} chars, at least {} recommended); results may be unreliable",
                label, chars, self.min_char_count
            );
        }
    }
}

/// Extract, match, and compare a resume against a job description.
pub fn run(
    resume: &Artifact,
    job: &Artifact,
    analyzer: &SkillGapAnalyzer,
) -> Result<ComparisonReport> {
    let resume_text = extract_text(resume)?;
    let job_text = extract_text(job)?;
    analyzer.check_length("Resume", &resume_text);
    analyzer.check_length("Job description", &job_text);

    let resume_skills = analyzer.analyze_text(&resume_text)?;
    let job_skills = analyzer.analyze_text(&job_text)?;
    info!(
        "Resume shows {} skills, job requires {}",
        resume_skills.len(),
        job_skills.len()
    );

    let report = compare(&resume_skills, &job_skills)?;

    match analyzer.document_similarity(&resume_text, &job_text)? {
        Some(similarity) => Ok(report.with_document_similarity(similarity)),
        None => Ok(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashedEmbedder;
    use crate::extract::DocumentFormat;
    use crate::report::Verdict;

    fn analyzer(skills: &[&str], embedder: Option<Arc<dyn Embedder>>) -> SkillGapAnalyzer {
        let vocabulary = SkillVocabulary::from_entries(skills.iter().copied()).unwrap();
        SkillGapAnalyzer::new(Arc::new(vocabulary), &Config::default(), embedder).unwrap()
    }

    #[test]
    fn test_python_sql_docker_scenario() {
        let analyzer = analyzer(&["Python", "SQL", "Docker", "Kubernetes"], None);
        let resume = Artifact::plain_text("Experienced developer skilled in Python and Docker.");
        let job = Artifact::plain_text("We need Python, SQL and Docker experience.");

        let report = run(&resume, &job, &analyzer).unwrap();
        assert_eq!(report.matched, vec!["Python", "Docker"]);
        assert_eq!(report.missing, vec!["SQL"]);
        assert_eq!(report.skill_score, 0.67);
        assert!(report.document_similarity.is_none());
        assert!(report.verdict.is_none());
    }

    #[test]
    fn test_containerization_resume_against_requirements() {
        let analyzer = analyzer(&["Python", "SQL", "Docker"], None);
        let resume =
            Artifact::plain_text("Proficient in Python and containerization with Docker");
        let job = Artifact::plain_text("Requires Python, SQL, Docker");

        let report = run(&resume, &job, &analyzer).unwrap();
        assert_eq!(report.matched, vec!["Python", "Docker"]);
        assert_eq!(report.missing, vec!["SQL"]);
    }

    #[test]
    fn test_empty_resume_misses_all_job_skills() {
        let analyzer = analyzer(&["Python", "SQL", "Docker"], None);
        let resume = Artifact::plain_text("");
        let job = Artifact::plain_text("Requirements: Python, SQL");

        let report = run(&resume, &job, &analyzer).unwrap();
        assert!(report.matched.is_empty());
        assert_eq!(report.missing, vec!["Python", "SQL"]);
    }

    #[test]
    fn test_run_is_idempotent() {
        let analyzer = analyzer(
            &["Python", "SQL", "Docker", "Machine Learning"],
            Some(Arc::new(HashedEmbedder::new())),
        );
        let resume = Artifact::plain_text("Built machine learning pipelines in Python.");
        let job = Artifact::plain_text("Proficient in Python, SQL and machine learning.");

        let first = run(&resume, &job, &analyzer).unwrap();
        let second = run(&resume, &job, &analyzer).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_document_similarity_sets_verdict() {
        let analyzer = analyzer(&["Python"], Some(Arc::new(HashedEmbedder::new())));
        let text = "Senior Python engineer with data pipeline experience.";

        let report = run(
            &Artifact::plain_text(text),
            &Artifact::plain_text(text),
            &analyzer,
        )
        .unwrap();
        let similarity = report.document_similarity.unwrap();
        assert!((similarity - 1.0).abs() < 1e-5);
        assert_eq!(report.verdict, Some(Verdict::Excellent));
    }

    #[test]
    fn test_extraction_error_aborts_run() {
        let analyzer = analyzer(&["Python"], None);
        let resume = Artifact::new(
            b"definitely not a zip archive".to_vec(),
            DocumentFormat::WordProcessor,
        );
        let job = Artifact::plain_text("Python");

        let err = run(&resume, &job, &analyzer).err().unwrap();
        assert!(matches!(err, SkillGapError::Extraction(_)));
    }

    #[test]
    fn test_analyzer_rejects_bad_thresholds() {
        let vocabulary = SkillVocabulary::from_entries(["Python"]).unwrap();
        let mut config = Config::default();
        config.matching.semantic_threshold = 1.5;

        let err = SkillGapAnalyzer::new(Arc::new(vocabulary), &config, None)
            .err()
            .unwrap();
        assert!(matches!(err, SkillGapError::Config(_)));
    }

    #[test]
    fn test_analyzer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SkillGapAnalyzer>();
    }
}
