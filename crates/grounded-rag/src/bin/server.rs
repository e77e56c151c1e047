//! Grounded RAG server binary
//!
//! Run with: cargo run -p grounded-rag --bin grounded-rag-server
//! Set GROUNDED_RAG_CONFIG to a TOML file to override the defaults.

use grounded_rag::{config::RagConfig, generation::OllamaClient, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grounded_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                    Grounded RAG System                    ║
║        PDF Q&A with Grounded Confidence and Figures       ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let config = RagConfig::load()?;
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embeddings: {:?} ({} dimensions)", config.embeddings.provider, config.embeddings.dimensions);
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!("  - Chunking: {} words, {} overlap", config.chunking.window_size, config.chunking.overlap);
    tracing::info!(
        "  - Figures: min entropy {}, dedup distance {}, {} per page",
        config.figures.min_entropy,
        config.figures.hash_distance_threshold,
        config.figures.max_images_per_page
    );

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    let ollama = OllamaClient::new(&config.llm)?;
    match ollama.health_check().await {
        Ok(true) => {
            tracing::info!("Ollama is running");
        }
        _ => {
            tracing::warn!("Ollama not available at {}", config.llm.base_url);
            tracing::warn!("Please start Ollama:");
            tracing::warn!("  1. Start: ollama serve");
            tracing::warn!(
                "  2. Pull models: ollama pull {} && ollama pull {}",
                config.llm.embed_model,
                config.llm.generate_model
            );
        }
    }

    // Create and start server
    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/upload-pdf     - Upload a PDF");
    println!("  POST /api/ask            - Ask a question");
    println!("  GET  /api/current-chunks - Passages of the active PDF");
    println!("  POST /api/figures/match  - Match an image against stored figures");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
