//! Prompt composition

/// Retrieved context handed to the composer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptContext {
    /// Context already flattened into one string
    Text(String),
    /// Retrieved chunk texts, best match first
    Chunks(Vec<String>),
}

impl PromptContext {
    fn render(&self) -> String {
        match self {
            PromptContext::Text(text) => text.clone(),
            PromptContext::Chunks(chunks) => chunks
                .iter()
                .filter(|chunk| !chunk.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

impl From<&str> for PromptContext {
    fn from(text: &str) -> Self {
        PromptContext::Text(text.to_string())
    }
}

impl From<String> for PromptContext {
    fn from(text: String) -> Self {
        PromptContext::Text(text)
    }
}

impl From<Option<String>> for PromptContext {
    fn from(text: Option<String>) -> Self {
        PromptContext::Text(text.unwrap_or_default())
    }
}

impl From<Vec<String>> for PromptContext {
    fn from(chunks: Vec<String>) -> Self {
        PromptContext::Chunks(chunks)
    }
}

impl From<&[String]> for PromptContext {
    fn from(chunks: &[String]) -> Self {
        PromptContext::Chunks(chunks.to_vec())
    }
}

impl From<Vec<&str>> for PromptContext {
    fn from(chunks: Vec<&str>) -> Self {
        PromptContext::Chunks(chunks.into_iter().map(str::to_string).collect())
    }
}

/// Builds the single prompt string sent to a chat backend
///
/// The prompt has up to three sections separated by a blank line:
/// `SYSTEM:`, `CONTEXT:` (omitted when there is no context) and `USER QUERY:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptComposer {
    system_instructions: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SYSTEM_INSTRUCTIONS)
    }
}

impl PromptComposer {
    pub const DEFAULT_SYSTEM_INSTRUCTIONS: &'static str = "You are a helpful assistant.";

    pub fn new(system_instructions: impl Into<String>) -> Self {
        Self {
            system_instructions: system_instructions.into(),
        }
    }

    pub fn system_instructions(&self) -> &str {
        &self.system_instructions
    }

    pub fn format(&self, context: impl Into<PromptContext>, query: &str) -> String {
        let context_text = context.into().render();

        let mut parts = vec![format!("SYSTEM: {}", self.system_instructions)];
        if !context_text.is_empty() {
            parts.push(format!("CONTEXT:\n{}", context_text));
        }
        parts.push(format!("USER QUERY:\n{}", query));

        parts.join("\n\n")
    }
}
