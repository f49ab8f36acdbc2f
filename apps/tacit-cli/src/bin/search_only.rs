use std::env;
use std::path::PathBuf;

use tacit_core::config::{expand_path, Config};
use tacit_text::RagService;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <dir> <query> [k]", args[0]);
        eprintln!("Example: {} ./docs 'margin lending risk' 5", args[0]);
        std::process::exit(1);
    }
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let dir: PathBuf = expand_path(&args[1]);
    let query_text = &args[2];
    let k = match args.get(3) {
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| anyhow::anyhow!("k must be an integer, got '{raw}'"))?),
        None => None,
    };

    println!("🔍 tacit-search\n==============");
    println!("Query: {}", query_text);
    println!("Documents: {}", dir.display());

    let rag = RagService::from_settings(&settings);
    let ingest = rag.ingest_directory(&dir);
    if !ingest.success {
        anyhow::bail!(ingest.error.unwrap_or_else(|| "ingestion failed".to_string()));
    }
    println!("📊 Indexed {} chunks", ingest.chunks_processed.unwrap_or(0));

    let response = rag.query(query_text, k);
    if let Some(error) = response.error {
        anyhow::bail!(error);
    }
    println!("\n🔍 Found {} results for: \"{}\"", response.results.len(), query_text);
    for (i, chunk) in response.results.iter().enumerate() {
        println!("\n  {}. source={}  page={}", i + 1, chunk.metadata.source_id, chunk.metadata.page);
        println!("     📝 {}", chunk.content);
    }
    Ok(())
}
