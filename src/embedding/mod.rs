mod cache;
mod hashed;
mod model;

pub use cache::CachedEmbedder;
pub use hashed::HashedEmbedder;
pub use model::EmbeddingModel;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::{CacheConfig, EmbeddingBackend, ModelsConfig};

/// Text embedding model.
///
/// Implementations must be deterministic: the same text and the same `model_id`
/// always produce the same vector.
pub trait Embedder: Send + Sync {
    /// Identifies the exact model artifact. Used as part of every cache key.
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding generated"))
    }
}

/// Build the configured embedder, wrapped in the on-disk cache when enabled.
///
/// Returns `None` when the semantic signal is switched off.
pub fn init_embedder(
    models: &ModelsConfig,
    cache: &CacheConfig,
) -> Result<Option<Arc<dyn Embedder>>> {
    let embedder: Box<dyn Embedder> = match models.backend()? {
        EmbeddingBackend::Disabled => {
            info!("Semantic matching disabled");
            return Ok(None);
        }
        EmbeddingBackend::Onnx => Box::new(EmbeddingModel::new(models)?),
        EmbeddingBackend::Hashed => Box::new(HashedEmbedder::new()),
    };

    info!(
        "Embedder ready: {} (dim={})",
        embedder.model_id(),
        embedder.dimensions()
    );

    if cache.enabled {
        Ok(Some(Arc::new(CachedEmbedder::new(embedder, &cache.dir)?)))
    } else {
        Ok(Some(Arc::from(embedder)))
    }
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Normalize embedding to unit length
pub(crate) fn normalize(embedding: &mut [f32]) {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in embedding.iter_mut() {
            *x /= norm;
        }
    }
}
