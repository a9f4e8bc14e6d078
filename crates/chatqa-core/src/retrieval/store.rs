//! ============================================================================
//! Vector Store - Precomputed (chunk, embedding) table
//! ============================================================================
//! Loaded from a JSON array or JSON Lines file of
//! `{"Chunks": "...", "Embedding": [...]}` records.
//! ============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{QaError, Result};

/// One row of the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    #[serde(rename = "Chunks")]
    pub text: String,
    #[serde(rename = "Embedding")]
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// Ordered, immutable table of chunks sharing one embedding dimension
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    records: Vec<ChunkRecord>,
    dimension: Option<usize>,
}

impl VectorStore {
    /// Build from records, rejecting mixed dimensions
    pub fn new(records: Vec<ChunkRecord>) -> Result<Self> {
        let dimension = records.first().map(|r| r.embedding.len());

        if let Some(expected) = dimension {
            if expected == 0 {
                return Err(QaError::VectorStore("Row 0 has an empty embedding".into()));
            }
            if let Some((row, bad)) = records
                .iter()
                .enumerate()
                .find(|(_, r)| r.embedding.len() != expected)
            {
                return Err(QaError::VectorStore(format!(
                    "Row {} has dimension {}, expected {}",
                    row,
                    bad.embedding.len(),
                    expected
                )));
            }
        }

        Ok(Self { records, dimension })
    }

    /// Load a `.json` array or `.jsonl` file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading vector store from {}", path.display());

        let raw = std::fs::read_to_string(path).map_err(|e| {
            QaError::VectorStore(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_jsonl = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
            .unwrap_or(false);

        let records = if is_jsonl {
            parse_json_lines(&raw)?
        } else {
            serde_json::from_str::<Vec<ChunkRecord>>(&raw)
                .map_err(|e| QaError::VectorStore(format!("Invalid vector store JSON: {}", e)))?
        };

        let store = Self::new(records)?;
        info!(
            "Vector store ready: {} chunks, dimension {:?}",
            store.len(),
            store.dimension()
        );
        Ok(store)
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// None for an empty store
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

fn parse_json_lines(raw: &str) -> Result<Vec<ChunkRecord>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                QaError::VectorStore(format!("Invalid record on line {}: {}", n + 1, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "chatqa-store-{}-{}",
            uuid::Uuid::new_v4(),
            name
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_json_array() {
        let path = temp_file(
            "store.json",
            r#"[{"Chunks":"Arauco produce celulosa","Embedding":[1.0,0.0]},
                {"Chunks":"Otro texto","Embedding":[0.0,1.0]}]"#,
        );
        let store = VectorStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), Some(2));
        assert_eq!(store.records()[0].text, "Arauco produce celulosa");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_json_lines() {
        let path = temp_file(
            "store.jsonl",
            "{\"Chunks\":\"a\",\"Embedding\":[1.0]}\n\n{\"Chunks\":\"b\",\"Embedding\":[2.0]}\n",
        );
        let store = VectorStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[1].text, "b");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let err = VectorStore::load(Path::new("/nonexistent/store.json")).unwrap_err();
        assert!(matches!(err, QaError::VectorStore(_)));
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let err = VectorStore::new(vec![
            ChunkRecord::new("a", vec![1.0, 0.0]),
            ChunkRecord::new("b", vec![1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, QaError::VectorStore(_)));
    }

    #[test]
    fn test_empty_store() {
        let store = VectorStore::new(vec![]).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn test_duplicate_texts_allowed() {
        let store = VectorStore::new(vec![
            ChunkRecord::new("same", vec![1.0]),
            ChunkRecord::new("same", vec![2.0]),
        ])
        .unwrap();
        assert_eq!(store.len(), 2);
    }
}
