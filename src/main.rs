use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lograg_chat::{ChatSettings, builtin_backends};
use lograg_cli::{DEMO_QUERY, display_banner, print_error, print_warning, run_chunks, run_query};
use lograg_core::Error;
use lograg_rag::{
    BackendSelector, EmbeddingSettings, PipelineConfig, RetrievalPipeline, SelectorConfig,
    TextChunker,
};
use lograg_server::{AppState, ServerConfig, run_server};

#[derive(Parser)]
#[command(name = "lograg")]
#[command(about = "Ask questions about local log and text files", long_about = None)]
struct Cli {
    /// Directory of .txt/.log files to index (overrides LOGRAG_DOCS_DIR)
    #[arg(long, global = true)]
    docs: Option<PathBuf>,

    /// Chat backend to use (overrides CHAT_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Directory for the persisted collection (overrides LOGRAG_PERSIST_DIR)
    #[arg(long, global = true)]
    persist_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    lines_per_chunk: Option<usize>,

    #[arg(long, global = true)]
    overlap: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve GET /rag_query over HTTP
    Serve {
        /// Bind address (overrides LOGRAG_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides LOGRAG_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Retrieve matches for a question and print the model's answer
    Query {
        /// Question to ask; defaults to a summary of the logs
        text: Option<String>,
        /// Number of chunks to retrieve
        #[arg(short, long, default_value_t = 3)]
        k: usize,
    },
    /// Show how a file is split into chunks
    Chunks { file: PathBuf },
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        if let Some(docs) = &self.docs {
            config.loader_path = docs.clone();
        }
        if let Some(dir) = &self.persist_dir {
            config.persist_directory = Some(dir.clone());
        }
        if let Some(lines) = self.lines_per_chunk {
            config.lines_per_chunk = lines;
        }
        if let Some(overlap) = self.overlap {
            config.overlap = overlap;
        }
        config.model_backend = self.model.clone();
        config
    }
}

fn build_pipeline(config: PipelineConfig) -> lograg_core::Result<RetrievalPipeline> {
    let mut backends = builtin_backends(&ChatSettings::from_env()).into_iter();
    let (default_name, default_factory) = backends
        .next()
        .ok_or_else(|| Error::Configuration("no chat backends are built in".to_string()))?;

    let selector = backends.fold(
        BackendSelector::new(SelectorConfig::from_env(default_name), default_factory),
        |selector, (name, factory)| selector.register(name, factory),
    );
    let embedder = EmbeddingSettings::from_env().build()?;

    RetrievalPipeline::builder()
        .config(config)
        .embedder(embedder)
        .selector(selector)
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut server = ServerConfig::from_env();
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }

            let state = match build_pipeline(config) {
                Ok(pipeline) => {
                    info!(backends = ?pipeline.selector().backends(), "retrieval pipeline ready");
                    AppState::new(Arc::new(pipeline))
                }
                Err(e) => {
                    error!(error = %e, "could not construct retrieval pipeline");
                    AppState::unavailable()
                }
            };
            run_server(server, state).await
        }
        Commands::Query { text, k } => {
            let docs_dir = config.loader_path.display().to_string();
            let pipeline = build_pipeline(config)?;
            let backend = pipeline
                .selector()
                .resolve(pipeline.config().model_backend.as_deref());
            display_banner(&docs_dir, &backend);

            let query = text.unwrap_or_else(|| DEMO_QUERY.to_string());
            if let Err(e) = run_query(&pipeline, &query, k).await {
                print_error(&e.to_string());
                return Err(e.into());
            }
            Ok(())
        }
        Commands::Chunks { file } => {
            if config.overlap >= config.lines_per_chunk {
                print_warning(
                    "overlap is not smaller than lines per chunk; chunks will not overlap",
                );
            }
            let chunker = TextChunker::new(config.lines_per_chunk, config.overlap)?;
            run_chunks(&file, &chunker).await?;
            Ok(())
        }
    }
}
