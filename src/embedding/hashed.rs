use anyhow::Result;

use super::{normalize, Embedder};

const DIM: usize = 256;
const MODEL_ID: &str = "hashed-trigram-v1-256";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Character-trigram hashing embedder.
///
/// Needs no model files and is fully deterministic, which makes it a usable
/// semantic signal for lexically close terms when no ONNX model is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashedEmbedder;

impl HashedEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn embed_one(text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; DIM];
        let padded: Vec<char> = format!(
            " {} ",
            text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
        )
        .chars()
        .collect();

        if padded.len() <= 2 {
            return embedding;
        }

        let mut buf = [0u8; 4];
        for window in padded.windows(3) {
            let mut hash = FNV_OFFSET;
            for c in window {
                for byte in c.encode_utf8(&mut buf).bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(FNV_PRIME);
                }
            }
            embedding[(hash % DIM as u64) as usize] += 1.0;
        }

        normalize(&mut embedding);
        embedding
    }
}

impl Embedder for HashedEmbedder {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_deterministic() {
        let embedder = HashedEmbedder::new();
        let a = embedder.embed("Kubernetes").unwrap();
        let b = embedder.embed("  kubernetes ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DIM);
    }

    #[test]
    fn test_lexical_neighbours_score_higher() {
        let embedder = HashedEmbedder::new();
        let base = embedder.embed("postgresql").unwrap();
        let close = embedder.embed("postgres").unwrap();
        let far = embedder.embed("photoshop").unwrap();
        assert!(cosine_similarity(&base, &close) > cosine_similarity(&base, &far));
        assert!(cosine_similarity(&base, &close) > 0.7);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedding = HashedEmbedder::new().embed("").unwrap();
        assert!(embedding.iter().all(|x| *x == 0.0));
    }
}
