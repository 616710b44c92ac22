//! One function per pipeline stage. Each stage reads the previous stage's
//! artifact from the configured path and writes its own.

use crate::config::PipelineConfig;
use anyhow::{bail, Context, Result};
use codesift_code_chunker::{Chunker, ChunkingStats};
use codesift_ingest::{clone_repo, ingest_dir, load_ingested, save_ingested};
use codesift_vector_store::{
    clean_records, load_embeddings, load_records, CodeEmbedder, EmbedReport, EmbeddingModel,
    SearchHit, VectorStore,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// What the ingest stage reads from
#[derive(Debug, Clone)]
pub enum Source {
    Dir(PathBuf),
    /// Cloned into the configured clone directory first
    Repo(String),
}

pub async fn ingest(config: &PipelineConfig, source: &Source) -> Result<usize> {
    let root = match source {
        Source::Dir(path) => {
            if !path.is_dir() {
                bail!("{} is not a directory", path.display());
            }
            path.clone()
        }
        Source::Repo(url) => clone_repo(url, &config.paths.clone_dir)
            .await
            .with_context(|| format!("Failed to clone {url}"))?,
    };

    log::info!("Collecting source files under {}", root.display());
    let files = tokio::task::spawn_blocking(move || ingest_dir(root))
        .await
        .context("File collection task panicked")?;

    save_ingested(&config.paths.ingested, &files).with_context(|| {
        format!("Failed to write {}", config.paths.ingested.display())
    })?;
    log::info!(
        "Saved {} files to {}",
        files.len(),
        config.paths.ingested.display()
    );
    Ok(files.len())
}

pub fn parse(config: &PipelineConfig) -> Result<ChunkingStats> {
    let files = load_ingested(&config.paths.ingested).with_context(|| {
        format!(
            "Failed to read {} (run `codesift ingest` first)",
            config.paths.ingested.display()
        )
    })?;

    let output = &config.paths.chunks;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );

    let mut chunker = Chunker::new(config.chunker.clone()).context("Invalid chunker config")?;
    let written = chunker
        .parse_to_writer(&files, writer)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!("Saved {written} chunks to {}", output.display());
    Ok(chunker.take_stats())
}

pub async fn embed(config: &PipelineConfig) -> Result<EmbedReport> {
    let records = load_records(&config.paths.chunks).with_context(|| {
        format!(
            "Failed to read {} (run `codesift parse` first)",
            config.paths.chunks.display()
        )
    })?;
    log::info!("Loaded {} chunks", records.len());

    let model = EmbeddingModel::from_env(&config.embedding.model)
        .with_context(|| format!("Failed to load embedding model {}", config.embedding.model))?;
    log::info!(
        "Embedding with {} ({} mode, dimension {})",
        model.name(),
        model.mode().as_str(),
        model.dimension()
    );

    let embedder = CodeEmbedder::new(model)
        .with_batch_size(config.embedding.batch_size)
        .with_sample_size(config.embedding.sample_size);
    let report = embedder
        .generate_file(&records, &config.paths.embeddings)
        .await
        .with_context(|| format!("Failed to write {}", config.paths.embeddings.display()))?;
    Ok(report)
}

pub async fn store(config: &PipelineConfig) -> Result<usize> {
    let records = load_embeddings(&config.paths.embeddings).with_context(|| {
        format!(
            "Failed to read {} (run `codesift embed` first)",
            config.paths.embeddings.display()
        )
    })?;
    let loaded = records.len();
    let cleaned = clean_records(records);
    if cleaned.len() < loaded {
        log::warn!("Dropped {} records without a vector", loaded - cleaned.len());
    }

    let mut store = open_store(config).await?;
    store
        .insert(cleaned, config.store.insert_batch)
        .await
        .with_context(|| format!("Failed to insert into '{}'", store.name()))
}

pub async fn query(config: &PipelineConfig, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
    if text.trim().is_empty() {
        bail!("Query text is empty");
    }

    let store = open_store(config).await?;
    if store.is_empty() {
        log::warn!(
            "Collection '{}' is empty (run `codesift store` first)",
            store.name()
        );
        return Ok(Vec::new());
    }

    let model = EmbeddingModel::from_env(&config.embedding.model)
        .with_context(|| format!("Failed to load embedding model {}", config.embedding.model))?;
    store
        .query_text(&model, text, top_k)
        .await
        .context("Query failed")
}

async fn open_store(config: &PipelineConfig) -> Result<VectorStore> {
    VectorStore::open(&config.paths.persist_dir, &config.store.collection)
        .await
        .with_context(|| {
            format!(
                "Failed to open collection '{}' in {}",
                config.store.collection,
                config.paths.persist_dir.display()
            )
        })
}
