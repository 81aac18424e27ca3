//! UI utilities for the CLI

use colored::*;
use lograg_core::{ChatResponse, RetrievalResult};

/// Characters of a match shown before it is cut off
pub const MATCH_PREVIEW_CHARS: usize = 200;

/// Display startup banner
pub fn display_banner(docs_dir: &str, backend: &str) {
    let title = "lograg - ask questions about your logs";
    let width = title.chars().count() + 4;

    println!();
    println!("{}", format!("┌{}┐", "─".repeat(width - 2)).blue());
    println!("│ {} │", title.blue().bold());
    println!("{}", format!("└{}┘", "─".repeat(width - 2)).blue());
    println!("  {} {}", "documents:".dimmed(), docs_dir);
    println!("  {} {}", "chat backend:".dimmed(), backend);
    println!();
}

/// One match line: the debug-quoted preview followed by an ellipsis
pub fn format_match(result: &RetrievalResult) -> String {
    let preview: String = result.text.chars().take(MATCH_PREVIEW_CHARS).collect();
    match result.score {
        Some(score) => format!("- {:?} ... ({:.3})", preview, score),
        None => format!("- {:?} ...", preview),
    }
}

pub fn print_matches(results: &[RetrievalResult]) {
    println!("{}", "Top matches from vector store:".bold());
    if results.is_empty() {
        println!("  {}", "(no matches)".dimmed());
    }
    for result in results {
        println!("{}", format_match(result));
    }
    println!();
}

pub fn print_response(response: &ChatResponse) {
    println!("{} {}", "Chat model response:".green().bold(), response.content);

    let mut details = vec![format!("model {}", response.model_name)];
    if let Some(reason) = &response.finish_reason {
        details.push(format!("finish {}", reason));
    }
    if let Some(tokens) = response.total_tokens {
        details.push(format!("{} tokens", tokens));
    }
    println!("{}", details.join(" · ").dimmed());
}

/// Numbered chunk listing with each chunk indented under its header
pub fn format_chunks(chunks: &[String]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let body = chunk
                .lines()
                .map(|line| format!("    {}", line))
                .collect::<Vec<_>>()
                .join("\n");
            format!("[{}]\n{}", index, body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_chunks(source: &str, chunks: &[String]) {
    println!(
        "{} {} {}",
        "📄".cyan(),
        source.bold(),
        format!("({} chunks)", chunks.len()).dimmed()
    );
    println!("{}", format_chunks(chunks));
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message.red());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠️".yellow(), message.yellow());
}
