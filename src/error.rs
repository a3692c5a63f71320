use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillGapError {
    #[error("Failed to load skill vocabulary: {0}")]
    VocabularyLoad(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Match results were computed against different vocabularies ({resume} vs {job})")]
    VocabularyMismatch { resume: String, job: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SkillGapError>;
