pub mod error;
pub mod gemini;
pub mod json;
pub mod prompts;
pub mod rate_limit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

/// Single-prompt text generation. Callers own rate limiting and output parsing.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_text(&self, prompt: &str) -> anyhow::Result<String>;
}
