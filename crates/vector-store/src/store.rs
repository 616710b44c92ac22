use crate::embeddings::{EmbeddingModel, EmbeddingProvider};
use crate::error::{Result, VectorStoreError};
use crate::types::{EmbeddingRecord, SearchHit, StoredRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const DEFAULT_COLLECTION: &str = "codebase_embeddings";
pub const DEFAULT_INSERT_BATCH: usize = 200;

/// On-disk form of a collection
#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    name: String,
    dimension: Option<usize>,
    records: Vec<StoredRecord>,
}

/// A named, persistent collection of vectors with string metadata.
///
/// Search is exact: every query scores every stored vector.
pub struct VectorStore {
    name: String,
    path: PathBuf,
    dimension: Option<usize>,
    records: Vec<StoredRecord>,
    positions: HashMap<String, usize>,
}

impl VectorStore {
    /// Open `<persist_dir>/<collection>.json`, starting empty if it does not exist
    pub async fn open(persist_dir: impl AsRef<Path>, collection: &str) -> Result<Self> {
        if collection.is_empty() || collection.contains(['/', '\\']) {
            return Err(VectorStoreError::InvalidInput(format!(
                "invalid collection name '{collection}'"
            )));
        }

        let persist_dir = persist_dir.as_ref();
        tokio::fs::create_dir_all(persist_dir).await?;
        let path = persist_dir.join(format!("{collection}.json"));

        let file = if tokio::fs::try_exists(&path).await? {
            let data = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str::<CollectionFile>(&data)?
        } else {
            CollectionFile::default()
        };

        let positions = file
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();

        log::info!(
            "Using collection '{collection}' at {} ({} records)",
            path.display(),
            file.records.len()
        );

        Ok(Self {
            name: collection.to_string(),
            path,
            dimension: file.dimension,
            records: file.records,
            positions,
        })
    }

    /// Upsert `records` in batches of `batch_size`, then persist
    pub async fn insert(&mut self, records: Vec<StoredRecord>, batch_size: usize) -> Result<usize> {
        let total = records.len();
        let batch_size = batch_size.max(1);
        log::info!("Inserting {total} records into '{}'", self.name);

        let mut records = records.into_iter().peekable();
        let mut batch_number = 0;
        while records.peek().is_some() {
            batch_number += 1;
            let mut inserted = 0;
            for record in records.by_ref().take(batch_size) {
                self.upsert(record)?;
                inserted += 1;
            }
            log::info!("Inserted batch {batch_number} ({inserted} items)");
        }

        self.save().await?;
        log::info!("Stored {total} records; collection now holds {}", self.len());
        Ok(total)
    }

    fn upsert(&mut self, record: StoredRecord) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != record.vector.len() => {
                return Err(VectorStoreError::InvalidDimension {
                    expected,
                    actual: record.vector.len(),
                });
            }
            Some(_) => {}
            None => self.dimension = Some(record.vector.len()),
        }

        match self.positions.get(&record.id) {
            Some(&index) => self.records[index] = record,
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
        Ok(())
    }

    /// The `top_k` most similar records by cosine similarity
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if vector.len() != dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(f32, &StoredRecord)> = self
            .records
            .iter()
            .map(|record| (EmbeddingModel::cosine_similarity(vector, &record.vector), record))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, record)| SearchHit {
                id: record.id.clone(),
                score,
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    /// Embed `text` with `provider` and [`query`](Self::query) with the result
    pub async fn query_text<P: EmbeddingProvider>(
        &self,
        provider: &P,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        log::debug!("Searching for: '{text}' (top_k: {top_k})");
        let vector = provider.embed(text).await?;
        self.query(&vector, top_k)
    }

    pub fn get(&self, id: &str) -> Option<&StoredRecord> {
        self.positions.get(id).map(|&index| &self.records[index])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self) -> Result<()> {
        let file = CollectionFile {
            name: self.name.clone(),
            dimension: self.dimension,
            records: self.records.clone(),
        };
        let data = serde_json::to_string(&file)?;
        tokio::fs::write(&self.path, data).await?;
        log::debug!("Saved collection '{}' to {}", self.name, self.path.display());
        Ok(())
    }
}

/// Prepare raw embedding records for insertion.
///
/// Records without a vector are dropped. Metadata is flattened to strings and
/// gains a `path` entry. A record reusing an id already seen in this batch is
/// renamed `<id>_<n>` so both survive.
pub fn clean_records(records: Vec<EmbeddingRecord>) -> Vec<StoredRecord> {
    let total = records.len();
    let mut cleaned = Vec::with_capacity(total);
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, record) in records.into_iter().enumerate() {
        let Some(vector) = record.vector.filter(|v| !v.is_empty()) else {
            continue;
        };

        let base = if record.id.is_empty() {
            format!("id_{index}")
        } else {
            record.id
        };
        let id = unique_id(base, &mut seen);

        let mut metadata: BTreeMap<String, String> = record
            .metadata
            .into_iter()
            .map(|(key, value)| (key, sanitize(value)))
            .collect();
        if !record.path.is_empty() {
            metadata.entry("path".to_string()).or_insert(record.path);
        }

        cleaned.push(StoredRecord {
            id,
            vector,
            metadata,
        });
    }

    log::info!(
        "Cleaned {} valid embeddings (filtered out {})",
        cleaned.len(),
        total - cleaned.len()
    );
    cleaned
}

/// `seen` maps each id handed out to the last suffix tried for it
fn unique_id(base: String, seen: &mut HashMap<String, usize>) -> String {
    let Some(&last) = seen.get(&base) else {
        seen.insert(base.clone(), 0);
        return base;
    };
    let mut n = last;
    let candidate = loop {
        n += 1;
        let candidate = format!("{base}_{n}");
        if !seen.contains_key(&candidate) {
            break candidate;
        }
    };
    seen.insert(base, n);
    seen.insert(candidate.clone(), 0);
    candidate
}

/// Flat string form of a metadata value
fn sanitize(value: Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::String(s) => s,
        Value::Array(_) | Value::Object(_) => value.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: &str, vector: Vec<f32>) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            vector,
            metadata: BTreeMap::from([("name".to_string(), id.to_string())]),
        }
    }

    fn raw(id: &str, vector: Option<Vec<f32>>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            path: "src/a.py".to_string(),
            vector,
            metadata: json!({
                "language": "python",
                "type": "function",
                "name": null,
                "imports": ["os", "sys"],
                "loc": 3,
                "size": 42
            })
            .as_object()
            .cloned()
            .unwrap(),
        }
    }

    #[test]
    fn clean_drops_missing_vectors_and_sanitizes_metadata() {
        let cleaned = clean_records(vec![
            raw("a", Some(vec![1.0, 0.0])),
            raw("b", None),
            raw("c", Some(vec![])),
        ]);

        assert_eq!(cleaned.len(), 1);
        let meta = &cleaned[0].metadata;
        assert_eq!(meta["language"], "python");
        assert_eq!(meta["name"], "None");
        assert_eq!(meta["imports"], r#"["os","sys"]"#);
        assert_eq!(meta["loc"], "3");
        assert_eq!(meta["path"], "src/a.py");
    }

    #[test]
    fn clean_keeps_duplicate_ids_apart() {
        let cleaned = clean_records(vec![
            raw("x", Some(vec![1.0])),
            raw("x", Some(vec![2.0])),
            raw("x_1", Some(vec![3.0])),
            raw("", Some(vec![4.0])),
        ]);
        let ids: Vec<_> = cleaned.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "x_1", "x_1_1", "id_3"]);
    }

    #[tokio::test]
    async fn insert_query_and_reopen() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), DEFAULT_COLLECTION)
            .await
            .unwrap();
        assert!(store.is_empty());

        store
            .insert(
                vec![
                    record("east", vec![1.0, 0.0, 0.0]),
                    record("north-east", vec![0.9, 0.1, 0.0]),
                    record("north", vec![0.0, 1.0, 0.0]),
                ],
                2,
            )
            .await
            .unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.dimension(), Some(3));

        let hits = store.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "east");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].id, "north-east");
        assert_eq!(hits[1].field("name"), "north-east");

        let reopened = VectorStore::open(temp.path(), DEFAULT_COLLECTION)
            .await
            .unwrap();
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.query(&[0.0, 1.0, 0.0], 1).unwrap()[0].id, "north");
        assert!(temp.path().join("codebase_embeddings.json").exists());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "c").await.unwrap();
        store.insert(vec![record("a", vec![1.0, 0.0])], 10).await.unwrap();
        store.insert(vec![record("a", vec![0.0, 1.0])], 10).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "c").await.unwrap();
        store.insert(vec![record("a", vec![1.0, 0.0])], 10).await.unwrap();

        let err = store.insert(vec![record("b", vec![1.0])], 10).await;
        assert!(matches!(
            err,
            Err(VectorStoreError::InvalidDimension { expected: 2, actual: 1 })
        ));
        assert!(store.query(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[tokio::test]
    async fn ties_are_ordered_by_id() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "c").await.unwrap();
        store
            .insert(
                vec![record("b", vec![1.0, 0.0]), record("a", vec![2.0, 0.0])],
                10,
            )
            .await
            .unwrap();

        let ids: Vec<_> = store
            .query(&[1.0, 0.0], 5)
            .unwrap()
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_store_returns_no_hits() {
        let temp = TempDir::new().unwrap();
        let store = VectorStore::open(temp.path(), "c").await.unwrap();
        assert!(store.query(&[1.0], 3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_path_like_collection_names() {
        let temp = TempDir::new().unwrap();
        assert!(VectorStore::open(temp.path(), "../escape").await.is_err());
        assert!(VectorStore::open(temp.path(), "").await.is_err());
    }
}
