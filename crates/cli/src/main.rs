use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use config::PipelineConfig;
use stages::Source;
use std::io;
use std::path::PathBuf;

mod config;
mod report;
mod stages;

#[derive(Parser)]
#[command(name = "codesift")]
#[command(about = "Index a codebase for semantic search", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file (default: ./codesift.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect source files from a directory or a git repository
    Ingest(SourceArgs),

    /// Split ingested files into code chunks
    Parse(ParseArgs),

    /// Embed every chunk
    Embed(EmbedArgs),

    /// Insert embeddings into the vector store
    Store(StoreArgs),

    /// Search the stored chunks with a natural-language query
    Query(QueryArgs),

    /// Run every stage, optionally finishing with a query
    Run(RunArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Local directory to ingest
    #[arg(required_unless_present = "repo", conflicts_with = "repo")]
    path: Option<PathBuf>,

    /// Git URL to clone and ingest
    #[arg(long)]
    repo: Option<String>,
}

impl SourceArgs {
    fn source(self) -> Result<Source> {
        match (self.path, self.repo) {
            (Some(path), None) => Ok(Source::Dir(path)),
            (None, Some(url)) => Ok(Source::Repo(url)),
            _ => bail!("Pass either a directory or --repo <url>"),
        }
    }
}

#[derive(Args)]
struct ParseArgs {
    /// Route every file through the generic parser
    #[arg(long)]
    no_deep_parse: bool,

    /// Skip deep parsing for files larger than this many bytes
    #[arg(long)]
    max_file_bytes: Option<usize>,
}

#[derive(Args)]
struct EmbedArgs {
    /// Embedding model name
    #[arg(long)]
    model: Option<String>,

    /// Chunks per encode call
    #[arg(long)]
    batch_size: Option<usize>,

    /// Embed only the first N chunks
    #[arg(long)]
    sample: Option<usize>,
}

#[derive(Args)]
struct StoreArgs {
    /// Collection name
    #[arg(long)]
    collection: Option<String>,

    /// Records per insert batch
    #[arg(long)]
    insert_batch: Option<usize>,
}

#[derive(Args)]
struct QueryArgs {
    /// Query text
    text: String,

    /// Number of results
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Collection name
    #[arg(long)]
    collection: Option<String>,

    /// Embedding model name (must match the one used by `embed`)
    #[arg(long)]
    model: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    parse: ParseArgs,

    #[command(flatten)]
    embed: EmbedArgs,

    #[command(flatten)]
    store: StoreArgs,

    /// Query to run once the store is populated
    #[arg(long)]
    query: Option<String>,

    /// Number of results for --query
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Print --query results as JSON
    #[arg(long)]
    json: bool,
}

impl ParseArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if self.no_deep_parse {
            config.chunker.deep_parse = false;
        }
        if let Some(limit) = self.max_file_bytes {
            config.chunker.max_file_bytes = Some(limit);
        }
    }
}

impl EmbedArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(model) = &self.model {
            config.embedding.model.clone_from(model);
        }
        if let Some(batch_size) = self.batch_size {
            config.embedding.batch_size = batch_size;
        }
        if self.sample.is_some() {
            config.embedding.sample_size = self.sample;
        }
    }
}

impl StoreArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(collection) = &self.collection {
            config.store.collection.clone_from(collection);
        }
        if let Some(insert_batch) = self.insert_batch {
            config.store.insert_batch = insert_batch;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ONNX runtime logs are noise unless debugging
    if !cli.verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest(args) => {
            stages::ingest(&config, &args.source()?).await?;
        }
        Commands::Parse(args) => {
            args.apply(&mut config);
            config.validate()?;
            stages::parse(&config)?;
        }
        Commands::Embed(args) => {
            args.apply(&mut config);
            config.validate()?;
            stages::embed(&config).await?;
        }
        Commands::Store(args) => {
            args.apply(&mut config);
            config.validate()?;
            stages::store(&config).await?;
        }
        Commands::Query(args) => {
            if let Some(collection) = args.collection {
                config.store.collection = collection;
            }
            if let Some(model) = args.model {
                config.embedding.model = model;
            }
            let top_k = args.top_k.unwrap_or(config.store.top_k);
            config.validate()?;
            print_results(&config, &args.text, top_k, args.json).await?;
        }
        Commands::Run(args) => {
            args.parse.apply(&mut config);
            args.embed.apply(&mut config);
            args.store.apply(&mut config);
            config.validate()?;

            let files = stages::ingest(&config, &args.source.source()?).await?;
            let stats = stages::parse(&config)?;
            let embedded = stages::embed(&config).await?;
            let stored = stages::store(&config).await?;
            log::info!(
                "Pipeline done: {files} files, {} chunks, {} embedded, {stored} stored",
                stats.total_chunks,
                embedded.written
            );

            if let Some(text) = args.query {
                let top_k = args.top_k.unwrap_or(config.store.top_k);
                print_results(&config, &text, top_k, args.json).await?;
            }
        }
    }

    Ok(())
}

async fn print_results(config: &PipelineConfig, text: &str, top_k: usize, json: bool) -> Result<()> {
    if top_k == 0 {
        bail!("--top-k must be > 0");
    }
    let hits = stages::query(config, text, top_k).await?;
    let stdout = io::stdout().lock();
    if json {
        report::write_json(stdout, text, &hits)
    } else {
        report::write_text(stdout, text, &hits)
    }
}
