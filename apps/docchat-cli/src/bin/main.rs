use std::io;

use docchat_cli::interactive_chat;
use docchat_core::config::Config;
use docchat_core::loader::DocumentLoader;
use docchat_core::logging;
use docchat_rag::RagChatbot;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let _log_guard = logging::init(&settings.logging)?;

    let mut chatbot = RagChatbot::from_settings(&settings)?;
    let stem = settings.data.index_stem();

    let loaded = RagChatbot::index_exists(&stem) && chatbot.load_index(&stem).is_ok();
    if !loaded {
        let raw_dir = settings.data.raw_dir();
        info!("No usable index at {}; ingesting {}", stem.display(), raw_dir.display());
        let documents = DocumentLoader::new(&raw_dir).load_directory();
        if documents.is_empty() {
            warn!("No documents found in {}", raw_dir.display());
        } else {
            chatbot.add_documents(&documents)?;
            chatbot.save_index(&stem)?;
        }
    }

    println!("RAG Chatbot\n===========");
    println!("Knowledge base: {} chunks from {} sources", chatbot.len(), chatbot.sources().len());
    println!("Type 'quit', 'exit' or 'q' to leave.");

    interactive_chat(&chatbot, io::stdin().lock(), io::stdout(), settings.retrieval.top_k, settings.retrieval.show_sources)?;
    Ok(())
}
