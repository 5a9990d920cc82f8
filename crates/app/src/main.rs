mod server;

use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_rag_core::{
    Answer, AnswerGenerator, CharacterNgramEmbedder, ChatCompletionsGenerator, ChunkingConfig,
    Embedder, GeneratorConfig, HttpEmbedder, IndexManager, IndexingOutcome, QueryPipeline,
    RagPaths, Retriever, SummarizationPipeline, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the raw .pdf and .txt documents
    #[arg(long, env = "DOC_RAG_RAW_DIR", default_value = "data/raw")]
    raw_dir: PathBuf,

    /// Directory holding the persisted vector index and its manifest
    #[arg(long, env = "DOC_RAG_INDEX_DIR", default_value = "vectorstore/index")]
    index_dir: PathBuf,

    /// Characters per chunk
    #[arg(long, default_value = "500")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value = "100")]
    chunk_overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, default_value = "3")]
    top_k: usize,

    /// OpenAI-compatible base URL of the answer model
    #[arg(long, env = "DOC_RAG_LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    /// Answer model name
    #[arg(long, env = "DOC_RAG_LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,

    /// API key for the answer model
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// OpenAI-compatible embeddings base URL; the local hashing embedder is used when absent
    #[arg(long, env = "DOC_RAG_EMBEDDING_BASE_URL")]
    embedding_base_url: Option<String>,

    /// Embedding model name for the remote embedder
    #[arg(long, env = "DOC_RAG_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    embedding_model: String,

    /// API key for the remote embedder
    #[arg(long, env = "DOC_RAG_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Embedding vector dimensions, also requested from the remote embedder
    #[arg(long, env = "DOC_RAG_EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Index new documents, or rebuild the whole index with --full.
    Index {
        /// Discard the existing index and embed every document again.
        #[arg(long, default_value_t = false)]
        full: bool,
    },
    /// Answer one question from the indexed documents.
    Ask {
        #[arg(long)]
        question: String,
    },
    /// Ask questions interactively until `exit`.
    Chat,
    /// Summarize every document in the raw directory.
    Summarize,
    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8001")]
        bind: String,
    },
}

impl Cli {
    fn paths(&self) -> RagPaths {
        RagPaths::new(&self.raw_dir, &self.index_dir)
    }

    fn embedder(&self) -> anyhow::Result<Arc<dyn Embedder>> {
        let embedder: Arc<dyn Embedder> = match &self.embedding_base_url {
            Some(base_url) => Arc::new(HttpEmbedder::new(
                base_url,
                self.embedding_model.clone(),
                self.embedding_api_key.clone(),
                self.embedding_dimensions,
            )?),
            None => Arc::new(CharacterNgramEmbedder::new(self.embedding_dimensions)),
        };
        Ok(embedder)
    }

    fn generator(&self) -> anyhow::Result<Arc<dyn AnswerGenerator>> {
        let generator = ChatCompletionsGenerator::new(GeneratorConfig {
            base_url: self.llm_base_url.clone(),
            model: self.llm_model.clone(),
            api_key: self.llm_api_key.clone().unwrap_or_default(),
            ..GeneratorConfig::default()
        })?;
        Ok(Arc::new(generator))
    }

    fn index_manager(&self, embedder: Arc<dyn Embedder>) -> anyhow::Result<IndexManager<dyn Embedder>> {
        let chunking = ChunkingConfig {
            chunk_size: self.chunk_size,
            overlap: self.chunk_overlap,
        };
        Ok(IndexManager::new(self.paths(), chunking, embedder)?)
    }

    fn query_pipeline(
        &self,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> QueryPipeline<dyn Embedder, dyn AnswerGenerator> {
        QueryPipeline::new(Retriever::new(&self.index_dir, embedder), generator).with_top_k(self.top_k)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let embedder = cli.embedder()?;
    info!(
        version = app_version,
        embedder = embedder.model_id(),
        started_at = %Utc::now().to_rfc3339(),
        "doc-rag boot"
    );

    match &cli.command {
        Command::Index { full } => {
            let manager = cli.index_manager(embedder)?;
            let outcome = manager.run_indexing(!full).await?;
            print_outcome(&outcome);
        }
        Command::Ask { question } => {
            let pipeline = cli.query_pipeline(embedder, cli.generator()?);
            let answer = pipeline.ask(question).await?;
            print_answer(&answer);
        }
        Command::Chat => {
            let pipeline = cli.query_pipeline(embedder, cli.generator()?);
            run_chat(&pipeline).await?;
        }
        Command::Summarize => {
            let pipeline = SummarizationPipeline::new(&cli.raw_dir, cli.generator()?);
            println!("{}", pipeline.summarize().await?);
        }
        Command::Serve { bind } => {
            let generator = cli.generator()?;
            let state = server::AppState {
                raw_dir: cli.raw_dir.clone(),
                indexer: Arc::new(cli.index_manager(embedder.clone())?),
                query: Arc::new(cli.query_pipeline(embedder, generator.clone())),
                summarizer: Arc::new(SummarizationPipeline::new(&cli.raw_dir, generator)),
            };
            server::run_server(bind, state).await?;
        }
    }

    Ok(())
}

async fn run_chat(pipeline: &QueryPipeline<dyn Embedder, dyn AnswerGenerator>) -> anyhow::Result<()> {
    println!("RAG pipeline started");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nAsk a question (or type 'exit'): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match pipeline.ask(question).await {
            Ok(answer) => print_answer(&answer),
            Err(error) => println!("Error occurred: {error}"),
        }
    }

    println!("Exiting RAG system");
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("\nAnswer:\n\n{}", answer.answer);
    println!("\nSources:");
    for source in &answer.sources {
        match source.page {
            Some(page) => println!("  {} (page {}, chunk {})", source.source, page, source.chunk_index),
            None => println!("  {} (chunk {})", source.source, source.chunk_index),
        }
    }
}

fn print_outcome(outcome: &IndexingOutcome) {
    match outcome {
        IndexingOutcome::Rebuilt { files, chunks } => {
            println!("rebuilt index: {} files, {chunks} chunks", files.len());
        }
        IndexingOutcome::Updated { new_files, chunks } => {
            println!("indexed {} new files ({chunks} chunks): {}", new_files.len(), new_files.join(", "));
        }
        IndexingOutcome::UpToDate => println!("index is up to date"),
        IndexingOutcome::NoDocuments => println!("no documents found to index"),
        IndexingOutcome::Skipped { files } => {
            println!("no new file could be loaded, skipped: {}", files.join(", "));
        }
    }
}
