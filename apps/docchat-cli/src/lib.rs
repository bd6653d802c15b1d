//! Interactive chat loop shared by the `docchat` binary.

use std::io::{BufRead, Write};

use docchat_rag::RagChatbot;
use tracing::error;

const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

/// Read questions line by line until EOF or an exit word. A failed query is
/// logged and reported, and the loop carries on with the next line.
pub fn interactive_chat<R: BufRead, W: Write>(
    chatbot: &RagChatbot,
    input: R,
    mut output: W,
    top_k: usize,
    show_sources: bool,
) -> std::io::Result<()> {
    let mut lines = input.lines();
    loop {
        write!(output, "\nYou: ")?;
        output.flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let query = line.trim();
        if query.is_empty() { continue; }
        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) { break; }

        match chatbot.chat(query, top_k, show_sources) {
            Ok(reply) => {
                writeln!(output, "\nAssistant: {}", reply.response)?;
                if !reply.sources.is_empty() {
                    let names: Vec<&str> = reply.sources.iter().map(|s| s.source.as_str()).collect();
                    writeln!(output, "\nSources: {}", names.join(", "))?;
                }
            }
            Err(e) => {
                error!("Error answering query: {:#}", e);
                writeln!(output, "\nError: {e:#}")?;
            }
        }
    }
    writeln!(output, "Goodbye!")?;
    Ok(())
}
