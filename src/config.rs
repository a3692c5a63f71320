use serde::Deserialize;

use crate::error::{Result, SkillGapError};

pub const DEFAULT_FUZZY_THRESHOLD: f32 = 0.85;
pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub vocabulary: VocabularyConfig,
    pub extraction: ExtractionConfig,
    pub matching: MatchingConfig,
    pub models: ModelsConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyConfig {
    pub path: String,
    /// Entries shorter than this many characters are ignored
    pub min_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub max_phrase_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub fuzzy_threshold: f32,
    pub semantic_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// One of `onnx`, `hashed`, `none`
    pub embedding_backend: String,
    pub embedding_model: String,
    pub models_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Extracted texts shorter than this are flagged in the logs
    pub min_char_count: usize,
}

/// Which embedder backs the semantic signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Onnx,
    Hashed,
    Disabled,
}

impl Config {
    /// Build configuration from defaults, an optional config file, and `SKILL_GAP__*`
    /// environment variables, in increasing order of precedence. A file that is named
    /// explicitly must exist.
    pub fn load(path: Option<&str>) -> std::result::Result<Self, config::ConfigError> {
        // Load .env file
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            // Set defaults
            .set_default("vocabulary.path", "skills.csv")?
            .set_default("vocabulary.min_length", 3)?
            .set_default("extraction.max_phrase_len", 40)?
            .set_default("matching.fuzzy_threshold", DEFAULT_FUZZY_THRESHOLD as f64)?
            .set_default("matching.semantic_threshold", DEFAULT_SEMANTIC_THRESHOLD as f64)?
            .set_default("models.embedding_backend", "onnx")?
            .set_default("models.embedding_model", "all-MiniLM-L6-v2")?
            .set_default("models.models_dir", "./models")?
            .set_default("cache.enabled", true)?
            .set_default("cache.dir", ".cache/embeddings")?
            .set_default("pipeline.min_char_count", 300)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            // Load from environment
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .prefix("SKILL_GAP"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.models.backend()?;
        if self.extraction.max_phrase_len == 0 {
            return Err(SkillGapError::Config(
                "extraction.max_phrase_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
        }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("matching.fuzzy_threshold", self.fuzzy_threshold),
            ("matching.semantic_threshold", self.semantic_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SkillGapError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { max_phrase_len: 40 }
    }
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            path: "skills.csv".to_string(),
            min_length: 3,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding_backend: "onnx".to_string(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            models_dir: "./models".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: ".cache/embeddings".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { min_char_count: 300 }
    }
}

impl ModelsConfig {
    pub fn backend(&self) -> Result<EmbeddingBackend> {
        match self.embedding_backend.to_lowercase().as_str() {
            "onnx" => Ok(EmbeddingBackend::Onnx),
            "hashed" => Ok(EmbeddingBackend::Hashed),
            "none" | "disabled" | "off" => Ok(EmbeddingBackend::Disabled),
            other => Err(SkillGapError::Config(format!(
                "unknown embedding backend '{}'",
                other
            ))),
        }
    }
}
