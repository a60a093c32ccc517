use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vectorcart::config::{CartConfig, Secrets};
use vectorcart::embedding::{google::GoogleBackend, huggingface::HuggingFaceBackend};
use vectorcart::embedding::{EmbeddingBackend, EmbeddingService};
use vectorcart::index::pinecone::PineconeBackend;
use vectorcart::index::VectorIndex;
use vectorcart::search::SearchEngine;
use vectorcart::server::{self, AppState};
use vectorcart::synthesis::gemini::GeminiBackend;
use vectorcart::synthesis::ResponseSynthesizer;
use vectorcart::{seed, synthesis};

#[derive(Parser)]
#[command(name = "vectorcart", version, about = "Semantic product search backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Embed a product JSON file and upsert it into the vector index
    Seed {
        /// Path to the raw product JSON (array of records)
        #[arg(long, default_value = "data/products.json")]
        file: PathBuf,
    },
    /// Print vector index statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CartConfig::load()?;

    // Log to stderr so stdout stays clean for CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let secrets = Secrets::from_env();

    match cli.command {
        Command::Serve => {
            let embedder = build_embedder(&config, &secrets)?;
            let index = build_index(&config, &secrets)?;
            let synthesizer = build_synthesizer(&config, &secrets)?;
            let search = SearchEngine::new(embedder, index.clone());

            let state = AppState {
                search,
                synthesizer,
                index,
                defaults: config.search.clone(),
            };
            server::serve(&config, state).await?;
        }
        Command::Seed { file } => {
            let embedder = build_embedder(&config, &secrets)?;
            let index = build_index(&config, &secrets)?;
            seed::seed_from_file(&file, &embedder, &index).await?;
        }
        Command::Stats => {
            let index = build_index(&config, &secrets)?;
            let stats = index.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

/// Assemble the embedding fallback chain from whichever providers have
/// credentials. Order matters: Hugging Face is primary, Google is fallback.
fn build_embedder(config: &CartConfig, secrets: &Secrets) -> Result<EmbeddingService> {
    let mut backends: Vec<Arc<dyn EmbeddingBackend>> = Vec::new();

    if let Some(token) = secrets.huggingface_token.clone().filter(|t| t.starts_with("hf_")) {
        backends.push(Arc::new(HuggingFaceBackend::new(&config.embedding, token)?));
    }
    if let Some(key) = secrets.gemini_api_key.clone() {
        backends.push(Arc::new(GoogleBackend::new(&config.embedding, key)?));
    }

    anyhow::ensure!(
        !backends.is_empty(),
        "no embedding provider configured — set HUGGINGFACE_API_TOKEN or GEMINI_API_KEY"
    );

    Ok(EmbeddingService::new(backends))
}

fn build_index(config: &CartConfig, secrets: &Secrets) -> Result<VectorIndex> {
    let api_key = secrets
        .pinecone_api_key
        .clone()
        .context("PINECONE_API_KEY is not set")?;
    let backend = PineconeBackend::new(&config.index, api_key)?;
    Ok(VectorIndex::new(Arc::new(backend)))
}

fn build_synthesizer(config: &CartConfig, secrets: &Secrets) -> Result<ResponseSynthesizer> {
    let api_key = secrets
        .gemini_api_key
        .clone()
        .context("GEMINI_API_KEY is not set")?;
    let backend: Arc<dyn synthesis::GenerativeBackend> =
        Arc::new(GeminiBackend::new(&config.synthesis, api_key)?);
    Ok(ResponseSynthesizer::new(backend))
}
