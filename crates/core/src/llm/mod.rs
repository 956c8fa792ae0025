pub mod error;
pub mod gemini;
pub mod json;
pub mod policy;

#[derive(Debug, Clone, Copy)]
pub enum Provider {
    Gemini,
    OpenRouter,
}

/// One text-generation attempt against a specific model.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Ask the provider for a JSON-only response (planner and refiner);
    /// synthesis wants prose and leaves this off.
    pub json_output: bool,
}

#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, req: GenerateRequest) -> anyhow::Result<String>;
}
