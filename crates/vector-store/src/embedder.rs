use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, VectorStoreError};
use crate::records::{chunk_id, chunk_path, chunk_text, METADATA_KEYS};
use crate::types::EmbeddingRecord;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Counts from one [`CodeEmbedder::generate`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedReport {
    pub written: usize,
    /// Records with no text, plus items whose encoding failed
    pub skipped: usize,
}

/// Turns chunk records into embedding records, batch by batch
pub struct CodeEmbedder<P> {
    provider: P,
    batch_size: usize,
    sample_size: Option<usize>,
}

impl<P: EmbeddingProvider> CodeEmbedder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
            sample_size: None,
        }
    }

    /// Builder: items per encode call (at least 1)
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Builder: only embed the first `sample_size` records
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: Option<usize>) -> Self {
        self.sample_size = sample_size.filter(|&n| n > 0);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Embed `records` and stream them to `writer` as a JSON array
    pub async fn generate<W: Write>(&self, records: &[Value], mut writer: W) -> Result<EmbedReport> {
        let records = match self.sample_size {
            Some(limit) if limit < records.len() => {
                log::warn!(
                    "sample_size={limit}: only using first {limit} / {} records",
                    records.len()
                );
                &records[..limit]
            }
            _ => records,
        };
        let total = records.len();
        log::info!(
            "Embedding {total} records (batch_size={})",
            self.batch_size
        );

        let started = Instant::now();
        let mut report = EmbedReport::default();
        writer.write_all(b"[\n")?;

        for (batch_index, batch) in records.chunks(self.batch_size).enumerate() {
            let mut texts = Vec::with_capacity(batch.len());
            let mut sources = Vec::with_capacity(batch.len());
            for record in batch {
                let text = chunk_text(record);
                if text.is_empty() {
                    report.skipped += 1;
                    continue;
                }
                texts.push(text.to_string());
                sources.push(record);
            }

            let processed = (batch_index * self.batch_size + batch.len()).min(total);
            if texts.is_empty() {
                log::info!("Batch ending at {processed}: nothing to encode");
                continue;
            }

            let vectors = self.encode(&texts).await;
            for (record, vector) in sources.into_iter().zip(vectors) {
                let Some(vector) = vector else {
                    report.skipped += 1;
                    continue;
                };
                if report.written > 0 {
                    writer.write_all(b",\n")?;
                }
                serde_json::to_writer(&mut writer, &embedding_record(record, vector))?;
                report.written += 1;
            }

            log::info!(
                "Processed {processed}/{total}, written {} (skipped {})",
                report.written,
                report.skipped
            );
        }

        writer.write_all(b"\n]\n")?;
        writer.flush()?;
        log::info!(
            "Finished embedding: written {}, skipped {}, {:.1}s",
            report.written,
            report.skipped,
            started.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    /// [`generate`](Self::generate) into a file, creating parent directories
    pub async fn generate_file(&self, records: &[Value], output: impl AsRef<Path>) -> Result<EmbedReport> {
        let output = output.as_ref();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(output)?);
        self.generate(records, writer).await
    }

    /// One vector slot per text; `None` where encoding failed
    async fn encode(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        match self.provider.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => return vectors.into_iter().map(Some).collect(),
            Ok(vectors) => log::warn!(
                "Batch encode returned {} vectors for {} texts; falling back to per-item encoding",
                vectors.len(),
                texts.len()
            ),
            Err(e) => log::warn!("Batch encode failed: {e}; falling back to per-item encoding"),
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            match self.provider.embed(text).await {
                Ok(vector) => vectors.push(Some(vector)),
                Err(e) => {
                    log::warn!("Single encode failed: {e}; skipping one item");
                    vectors.push(None);
                }
            }
        }
        vectors
    }
}

fn embedding_record(record: &Value, vector: Vec<f32>) -> EmbeddingRecord {
    let metadata: Map<String, Value> = METADATA_KEYS
        .iter()
        .map(|key| {
            let value = record.get(*key).cloned().unwrap_or(Value::Null);
            ((*key).to_string(), value)
        })
        .collect();
    EmbeddingRecord {
        id: chunk_id(record),
        path: chunk_path(record).to_string(),
        vector: Some(vector),
        metadata,
    }
}

/// Read a chunk file as loose JSON records; the top level must be an array
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    match serde_json::from_reader(reader)? {
        Value::Array(records) => {
            log::info!("Loaded {} records from {}", records.len(), path.display());
            Ok(records)
        }
        _ => Err(VectorStoreError::InvalidInput(format!(
            "{} must hold a JSON list of chunk objects",
            path.display()
        ))),
    }
}

/// Read an `embeddings.json` file
pub fn load_embeddings(path: impl AsRef<Path>) -> Result<Vec<EmbeddingRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let records: Vec<EmbeddingRecord> = serde_json::from_reader(reader)?;
    log::info!("Loaded {} raw embeddings from {}", records.len(), path.display());
    Ok(records)
}
