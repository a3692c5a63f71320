use anyhow::{Context, Result};
use ndarray::{Array2, Ix2, Ix3};
use ort::{inputs, GraphOptimizationLevel, Session};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::{normalize, Embedder};
use crate::config::ModelsConfig;

const MAX_LENGTH: usize = 512;

/// Sentence-embedding model served through ONNX Runtime
pub struct EmbeddingModel {
    session: Session,
    tokenizer: Tokenizer,
    model_id: String,
    dim: usize,
}

impl EmbeddingModel {
    pub fn new(config: &ModelsConfig) -> Result<Self> {
        let model_path = Path::new(&config.models_dir).join(&config.embedding_model);

        info!("Loading embedding model from {:?}", model_path);

        let model_file = model_path.join("model.onnx");
        let tokenizer_file = model_path.join("tokenizer.json");
        if !model_file.exists() || !tokenizer_file.exists() {
            anyhow::bail!(
                "Embedding model files not found in {:?} (expected model.onnx and tokenizer.json)",
                model_path
            );
        }

        // The artifact digest pins the model version into every cache key
        let model_bytes = std::fs::read(&model_file)
            .with_context(|| format!("Failed to read {:?}", model_file))?;
        let digest = hex::encode(Sha256::digest(&model_bytes));
        let model_id = format!("{}@{}", config.embedding_model, &digest[..16]);

        // Load ONNX model
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_memory(&model_bytes)
            .context("Failed to load ONNX model")?;

        // Load tokenizer
        let tokenizer = Tokenizer::from_file(&tokenizer_file)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        // Determine embedding dimensions from model output
        let dim = session
            .outputs
            .first()
            .and_then(|o| o.output_type.tensor_dimensions())
            .and_then(|dims| dims.last().copied())
            .filter(|d| *d > 0)
            .unwrap_or(384) as usize;

        info!("Embedding model loaded: {} (dim={})", model_id, dim);

        Ok(Self {
            session,
            tokenizer,
            model_id,
            dim,
        })
    }
}

impl Embedder for EmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Embedding batch of {} texts", texts.len());

        // Tokenize all texts
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let batch_size = encodings.len();

        // Find max length in batch
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .clamp(1, MAX_LENGTH);

        // Prepare input tensors
        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let type_ids = encoding.get_type_ids();

            let len = ids.len().min(max_len);
            for j in 0..len {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = type_ids[j] as i64;
            }
        }

        let input_ids = Array2::from_shape_vec((batch_size, max_len), input_ids)?;
        let attention_mask = Array2::from_shape_vec((batch_size, max_len), attention_mask)?;
        let token_type_ids = Array2::from_shape_vec((batch_size, max_len), token_type_ids)?;

        // Run inference
        let outputs = self.session.run(inputs![
            "input_ids" => input_ids.view(),
            "attention_mask" => attention_mask.view(),
            "token_type_ids" => token_type_ids.view(),
        ]?)?;

        // Pooled sentence embeddings if the export provides them
        if let Some(pooled) = outputs.get("sentence_embedding") {
            let pooled = pooled.try_extract_tensor::<f32>()?.into_dimensionality::<Ix2>()?;
            let result = pooled
                .outer_iter()
                .map(|row| {
                    let mut embedding = row.to_vec();
                    normalize(&mut embedding);
                    embedding
                })
                .collect();
            return Ok(result);
        }

        let hidden = outputs
            .get("last_hidden_state")
            .ok_or_else(|| anyhow::anyhow!("No embedding output found"))?;
        let hidden = hidden.try_extract_tensor::<f32>()?.into_dimensionality::<Ix3>()?;
        let dim = hidden.shape()[2];

        // Mean pooling over non-padding tokens, then unit length
        let mut result = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mut embedding = vec![0.0f32; dim];
            let mut count = 0.0f32;

            for j in 0..max_len {
                if attention_mask[[i, j]] == 0 {
                    continue;
                }
                count += 1.0;
                for k in 0..dim {
                    embedding[k] += hidden[[i, j, k]];
                }
            }

            if count > 0.0 {
                for x in &mut embedding {
                    *x /= count;
                }
            }
            normalize(&mut embedding);
            result.push(embedding);
        }

        Ok(result)
    }
}
