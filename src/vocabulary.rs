use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::config::VocabularyConfig;
use crate::error::{Result, SkillGapError};
use crate::text::SkillTerm;

/// Header cells that mark the skill column in a CSV with a header row
const HEADER_NAMES: &[&str] = &["skill", "skills", "skill_name", "name"];

/// A canonical skill: its normalized term plus the casing it first appeared with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub term: SkillTerm,
    pub display: String,
}

/// Ordered, deduplicated reference list of skills. Immutable once built.
#[derive(Debug, Clone)]
pub struct SkillVocabulary {
    entries: Vec<VocabularyEntry>,
    index: HashMap<SkillTerm, usize>,
    fingerprint: String,
}

impl SkillVocabulary {
    /// Build a vocabulary from raw strings, keeping the first casing of each skill.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary = Self {
            entries: Vec::new(),
            index: HashMap::new(),
            fingerprint: String::new(),
        };

        for raw in entries {
            let raw = raw.as_ref();
            let Some(term) = SkillTerm::new(raw) else {
                continue;
            };
            if vocabulary.index.contains_key(&term) {
                continue;
            }
            let display = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            vocabulary.index.insert(term.clone(), vocabulary.entries.len());
            vocabulary.entries.push(VocabularyEntry { term, display });
        }

        if vocabulary.entries.is_empty() {
            return Err(SkillGapError::VocabularyLoad(
                "no usable skill entries".to_string(),
            ));
        }

        vocabulary.fingerprint = fingerprint(&vocabulary.entries);
        Ok(vocabulary)
    }

    /// Load the vocabulary from a CSV file.
    pub fn load(path: impl AsRef<Path>, config: &VocabularyConfig) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading skill vocabulary from {:?}", path);

        if !path.exists() {
            return Err(SkillGapError::VocabularyLoad(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let file = File::open(path).map_err(|e| {
            SkillGapError::VocabularyLoad(format!("cannot open {}: {}", path.display(), e))
        })?;

        let vocabulary = Self::from_reader(file, config.min_length)?;
        info!(
            "Skill vocabulary loaded: {} entries (fingerprint={})",
            vocabulary.len(),
            &vocabulary.fingerprint[..12]
        );
        Ok(vocabulary)
    }

    /// Parse CSV content. Every cell is split on commas; with a recognised header row
    /// only the skill column is read.
    pub fn from_reader<R: Read>(reader: R, min_length: usize) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| SkillGapError::VocabularyLoad(format!("malformed CSV: {}", e)))?;
            records.push(record);
        }

        let Some(first) = records.first() else {
            return Err(SkillGapError::VocabularyLoad("source is empty".to_string()));
        };

        let column = first
            .iter()
            .position(|cell| HEADER_NAMES.contains(&cell.trim().to_lowercase().as_str()));
        let body = if column.is_some() {
            &records[1..]
        } else {
            &records[..]
        };

        let mut cells = Vec::new();
        for record in body {
            match column {
                Some(i) => cells.extend(record.get(i)),
                None => cells.extend(record.iter()),
            }
        }

        let candidates = cells
            .into_iter()
            .flat_map(|cell| cell.split(','))
            .map(str::trim)
            .filter(|piece| {
                SkillTerm::new(piece).is_some_and(|term| {
                    term.char_len() >= min_length && !term.is_stop_word()
                })
            });

        let vocabulary = Self::from_entries(candidates).map_err(|_| {
            SkillGapError::VocabularyLoad("no recognizable skill column".to_string())
        })?;

        debug!("Parsed {} skills from CSV", vocabulary.len());
        Ok(vocabulary)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn get(&self, term: &SkillTerm) -> Option<&VocabularyEntry> {
        self.index.get(term).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, term: &SkillTerm) -> bool {
        self.index.contains_key(term)
    }

    /// Identifies this exact snapshot of entries
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(entries: &[VocabularyEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.term.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
