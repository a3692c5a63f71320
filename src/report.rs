use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SkillGapError};
use crate::matcher::MatchResult;

/// Overall fit derived from whole-document similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Excellent,
    Good,
    Partial,
    Weak,
}

impl Verdict {
    pub fn from_similarity(score: f32) -> Self {
        if score >= 0.8 {
            Verdict::Excellent
        } else if score >= 0.65 {
            Verdict::Good
        } else if score >= 0.5 {
            Verdict::Partial
        } else {
            Verdict::Weak
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Verdict::Excellent => "Excellent match. You should definitely apply for this job.",
            Verdict::Good => "Good match. You stand a strong chance, applying is recommended.",
            Verdict::Partial => {
                "Partial match. Consider improving your resume by adding missing relevant skills."
            }
            Verdict::Weak => {
                "Weak match. Your resume and the job description differ significantly. Tailor your resume."
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Excellent => write!(f, "excellent"),
            Verdict::Good => write!(f, "good"),
            Verdict::Partial => write!(f, "partial"),
            Verdict::Weak => write!(f, "weak"),
        }
    }
}

/// Resume vs job description, by skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Job skills the resume also shows
    pub matched: Vec<String>,
    /// Job skills the resume lacks
    pub missing: Vec<String>,
    /// `|matched| / |job skills|`, two decimals
    pub skill_score: f32,
    pub document_similarity: Option<f32>,
    pub verdict: Option<Verdict>,
}

impl ComparisonReport {
    /// Attach the whole-document similarity and the verdict it implies
    pub fn with_document_similarity(mut self, similarity: f32) -> Self {
        self.document_similarity = Some(similarity);
        self.verdict = Some(Verdict::from_similarity(similarity));
        self
    }
}

/// Compare two match results computed against the same vocabulary.
///
/// Both lists follow the job result's order, which is vocabulary order.
pub fn compare(resume: &MatchResult, job: &MatchResult) -> Result<ComparisonReport> {
    if resume.vocabulary_fingerprint() != job.vocabulary_fingerprint() {
        return Err(SkillGapError::VocabularyMismatch {
            resume: resume.vocabulary_fingerprint().to_string(),
            job: job.vocabulary_fingerprint().to_string(),
        });
    }

    let (matched, missing): (Vec<String>, Vec<String>) = job
        .skills()
        .map(str::to_string)
        .partition(|skill| resume.contains(skill));

    let skill_score = if job.is_empty() {
        0.0
    } else {
        round2(matched.len() as f32 / job.len() as f32)
    };

    Ok(ComparisonReport {
        matched,
        missing,
        skill_score,
        document_similarity: None,
        verdict: None,
    })
}

fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matched skills ({}):", self.matched.len())?;
        if self.matched.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for skill in &self.matched {
            writeln!(f, "  + {}", skill)?;
        }

        writeln!(f, "Missing skills ({}):", self.missing.len())?;
        if self.missing.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for skill in &self.missing {
            writeln!(f, "  - {}", skill)?;
        }

        write!(f, "Skill score: {:.2}", self.skill_score)?;

        if let (Some(similarity), Some(verdict)) = (self.document_similarity, self.verdict) {
            writeln!(f)?;
            writeln!(f, "Document similarity: {:.2} ({})", similarity, verdict)?;
            write!(f, "{}", verdict.advice())?;
        }

        Ok(())
    }
}
