use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tacit_agent::{AgentStatus, ApprovalDecision, ChatService, NewSession};
use tacit_core::config::{expand_path, Config, Settings};
use tacit_core::data_processor::DataProcessor;
use tacit_text::RagService;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a specialized risk assessment agent with deep expertise in financial compliance. Your primary directive is to ALWAYS consult the Proprietary Knowledge Module before making any recommendations. Prioritize the expert's tacit knowledge over general information. Maintain a professional, cautious tone and never proceed with high-risk actions without explicit confirmation.";
const DEFAULT_KNOWLEDGE: &str = "1. For client portfolios over $5M, apply enhanced due diligence even if automated systems suggest standard review.\n\n2. Red flag any transaction patterns involving rapid succession of international wire transfers regardless of amount.\n\n3. When assessing startup investments, prioritize founder track record over projected revenue in the first 3 years.";

#[derive(Debug, Parser)]
#[command(name = "tacit", about = "Governed advisory agent over locally indexed documents")]
struct Cli {
    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Chunk every .txt file under a directory and list the chunks
    Chunks {
        dir: PathBuf,
    },
    /// Index a directory and print the ranked chunks for a query as JSON
    Query {
        dir: PathBuf,
        query: String,
        /// Number of chunks to return (defaults to retrieval.default_k)
        #[arg(short, allow_negative_numbers = true)]
        k: Option<i64>,
    },
    /// Interactive chat with expert approval of high-risk answers
    Chat(ChatArgs),
}

#[derive(Debug, Args)]
struct ChatArgs {
    /// Directory of .txt documents to retrieve passages from (defaults to data.docs_dir)
    #[arg(long)]
    docs: Option<PathBuf>,
    #[arg(long)]
    system_prompt_file: Option<PathBuf>,
    /// Expert rules, one numbered rule per line
    #[arg(long)]
    knowledge_file: Option<PathBuf>,
    /// Answer high-risk requests without waiting for approval
    #[arg(long)]
    no_hil: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("TACIT_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    match cli.command {
        Command::Chunks { dir } => list_chunks(&settings, &dir)?,
        Command::Query { dir, query, k } => {
            let rag = RagService::from_settings(&settings);
            ingest(&rag, &dir)?;
            println!("{}", serde_json::to_string_pretty(&rag.query(&query, k))?);
        }
        Command::Chat(args) => chat(&config, &settings, args).await?,
    }
    Ok(())
}

fn list_chunks(settings: &Settings, dir: &Path) -> anyhow::Result<()> {
    let processor = DataProcessor::new(settings.chunking.clone());
    let chunks = processor.process_directory(&expand_path(dir.to_string_lossy()))?;
    for (i, chunk) in chunks.iter().enumerate() {
        println!("{:>4}. [{} p.{}] {}", i + 1, chunk.metadata.source_id, chunk.metadata.page, chunk.content);
    }
    println!("\n📊 {} chunks", chunks.len());
    Ok(())
}

fn ingest(rag: &RagService, dir: &Path) -> anyhow::Result<usize> {
    let dir = expand_path(dir.to_string_lossy());
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Indexing {}", dir.display()));

    let response = rag.ingest_directory(&dir);
    if !response.success {
        spinner.abandon_with_message("❌ Indexing failed");
        bail!(response.error.unwrap_or_else(|| "ingestion failed".to_string()));
    }
    let added = response.chunks_processed.unwrap_or(0);
    spinner.finish_with_message(format!("✅ Indexed {added} chunks from {}", dir.display()));
    Ok(added)
}

fn read_or_default(path: Option<&Path>, default: &str) -> anyhow::Result<String> {
    match path {
        Some(path) => {
            let path = expand_path(path.to_string_lossy());
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
        }
        None => Ok(default.to_string()),
    }
}

async fn chat(config: &Config, settings: &Settings, args: ChatArgs) -> anyhow::Result<()> {
    let rag = RagService::from_settings(settings);
    let docs = args.docs.clone().or_else(|| config.get::<String>("data.docs_dir").ok().map(PathBuf::from));
    if let Some(dir) = &docs {
        ingest(&rag, dir)?;
    }
    let chat = ChatService::from_settings(settings, rag.retriever())?;
    let session = chat.create_session(NewSession {
        system_prompt: read_or_default(args.system_prompt_file.as_deref(), DEFAULT_SYSTEM_PROMPT)?,
        tacit_knowledge: read_or_default(args.knowledge_file.as_deref(), DEFAULT_KNOWLEDGE)?,
        hil_enabled: args.no_hil.then_some(false),
    });
    info!(session = %session.id, "chat started");
    println!("Tacit chat (HIL {}). /reset clears the conversation, /quit exits.", if session.hil_enabled { "on" } else { "off" });

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let awaiting = chat.agent_status(session.id) == AgentStatus::AwaitingApproval;
        print!("{}", if awaiting { "decision [approve|reject|modify]> " } else { "you> " });
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                chat.reset_session(session.id)?;
                println!("(conversation cleared)");
                continue;
            }
            _ => {}
        }

        let result = if awaiting {
            match line.parse::<ApprovalDecision>() {
                Ok(decision) => chat.approve(session.id, decision).await,
                Err(e) => Err(e),
            }
        } else {
            chat.send_message(session.id, line).await
        };
        match result {
            Ok(reply) => println!("\nagent [{:?}]> {}\n", reply.agent_status, reply.message.content),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    chat.delete_session(session.id);
    Ok(())
}
