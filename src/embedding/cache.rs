use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::Embedder;

/// Distinguishes concurrent writes of the same key within one process
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// On-disk embedding cache in front of another embedder.
///
/// One JSON file per text, named by `sha256(model_id \0 text)`, so vectors from a
/// different model artifact are never reused.
pub struct CachedEmbedder {
    inner: Box<dyn Embedder>,
    dir: PathBuf,
}

impl CachedEmbedder {
    pub fn new(inner: Box<dyn Embedder>, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create embedding cache dir {:?}", dir))?;
        Ok(Self { inner, dir })
    }

    fn key(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.inner.model_id().as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn load(&self, key: &str) -> Option<Vec<f32>> {
        let path = self.path_for(key);
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice::<Vec<f32>>(&bytes) {
            Ok(v) if v.len() == self.inner.dimensions() => Some(v),
            _ => {
                debug!("Ignoring unreadable cache entry {:?}", path);
                None
            }
        }
    }

    /// Unique per write: process id plus a process-wide sequence number
    fn tmp_path_for(&self, key: &str) -> PathBuf {
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!("{}.{}.{}.tmp", key, std::process::id(), seq))
    }

    /// Write to a temporary file first so readers never see a partial entry.
    fn store(&self, key: &str, embedding: &[f32]) {
        let path = self.path_for(key);
        let tmp = self.tmp_path_for(key);

        let result = serde_json::to_vec(embedding)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| fs::write(&tmp, bytes).map_err(anyhow::Error::from))
            .and_then(|_| fs::rename(&tmp, &path).map_err(anyhow::Error::from));

        if let Err(e) = result {
            debug!("Failed to save embedding cache at {:?}: {}", path, e);
            let _ = fs::remove_file(&tmp);
        }
    }
}

impl Embedder for CachedEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| self.key(t)).collect();
        let mut result: Vec<Option<Vec<f32>>> = keys.iter().map(|k| self.load(k)).collect();

        let missing: Vec<usize> = (0..texts.len()).filter(|&i| result[i].is_none()).collect();
        debug!(
            "Embedding cache: {} hits, {} misses",
            texts.len() - missing.len(),
            missing.len()
        );

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let computed = self.inner.embed_batch(&batch)?;
            if computed.len() != batch.len() {
                anyhow::bail!(
                    "Embedder returned {} vectors for {} texts",
                    computed.len(),
                    batch.len()
                );
            }
            for (&i, embedding) in missing.iter().zip(computed) {
                self.store(&keys[i], &embedding);
                result[i] = Some(embedding);
            }
        }

        Ok(result.into_iter().flatten().collect())
    }
}
