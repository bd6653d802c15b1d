use std::{env, path::PathBuf};

use docchat_core::config::Config;
use docchat_core::loader::DocumentLoader;
use docchat_core::logging;
use docchat_rag::RagChatbot;

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let _log_guard = logging::init(&settings.logging)?;

    let data_dir = env::args().skip(1).find(|a| !a.starts_with('-')).map(PathBuf::from).unwrap_or_else(|| settings.data.raw_dir());
    let stem = settings.data.index_stem();
    println!("docchat indexer\n===============");
    println!("Data directory: {}", data_dir.display());
    println!("Index: {}", stem.display());

    let documents = DocumentLoader::new(&data_dir).load_directory();
    if documents.is_empty() {
        anyhow::bail!("no supported documents found in {}", data_dir.display());
    }

    let mut chatbot = RagChatbot::offline_from_settings(&settings)?;
    let added = chatbot.add_documents(&documents)?;
    RagChatbot::remove_index(&stem)?;
    chatbot.save_index(&stem)?;

    println!("\n✅ Indexing completed successfully!");
    println!("📊 {} documents, {} chunks", documents.len(), added);
    for source in chatbot.sources() { println!("  - {}", source); }
    println!("\n💡 To ask a question, use: cargo run --bin docchat-ask '<question>'");
    Ok(())
}
