use std::env;

use docchat_core::config::Config;
use docchat_core::logging;
use docchat_rag::RagChatbot;

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let _log_guard = logging::init(&settings.logging)?;

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} \"<question>\" [--top-k N] [--no-sources]", args[0]);
        std::process::exit(1);
    }
    let mut query = None;
    let mut top_k = settings.retrieval.top_k;
    let mut show_sources = settings.retrieval.show_sources;
    let mut i = 1; while i < args.len() { match args[i].as_str() {
        "--top-k" | "-k" => { match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()).filter(|k| *k > 0) { Some(k) => { top_k = k; i += 1; } None => { eprintln!("Error: --top-k requires a positive number"); std::process::exit(1); } } }
        "--no-sources" => show_sources = false,
        a if !a.starts_with('-') && query.is_none() => query = Some(a.to_string()),
        _ => {} } i += 1; }
    let Some(query) = query else {
        eprintln!("Error: missing question");
        std::process::exit(1);
    };

    let stem = settings.data.index_stem();
    if !RagChatbot::index_exists(&stem) {
        anyhow::bail!("no index at {}; run docchat-indexer first", stem.display());
    }
    let mut chatbot = RagChatbot::from_settings(&settings)?;
    chatbot.load_index(&stem)?;

    println!("🔍 {}", query);
    let reply = chatbot.chat(&query, top_k, show_sources)?;
    println!("\n{}", reply.response);
    if !reply.sources.is_empty() {
        println!("\n📚 Sources:");
        for (n, s) in reply.sources.iter().enumerate() {
            println!("\n  {}. {} (chunk {})  distance={:.4}", n + 1, s.source, s.chunk_id, s.relevance_score);
            println!("     📝 {}", s.preview);
        }
    }
    Ok(())
}
