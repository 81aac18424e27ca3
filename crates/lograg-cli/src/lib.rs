//! Terminal front end for lograg
//!
//! One-shot commands that drive the retrieval pipeline and render the results
//! for a human reader.

mod commands;
mod ui;

#[cfg(test)]
mod tests;

pub use commands::{DEMO_QUERY, QueryOutcome, run_chunks, run_query};
pub use ui::{
    MATCH_PREVIEW_CHARS, display_banner, format_chunks, format_match, print_chunks, print_error,
    print_matches, print_response, print_warning,
};

// Re-export core types for convenience
pub use lograg_core::{Error, Result};
