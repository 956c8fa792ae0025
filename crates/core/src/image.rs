use crate::auth::{AuthError, IdentityExtractor};
use crate::config::Settings;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_IMAGE_MODEL: &str = "sourceful/riverflow-v2-pro";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Frontends sometimes ship with this literal in their env template; treat
/// it the same as no key at all.
const PLACEHOLDER_API_KEY: &str = "your_openrouter_api_key_here";

const FALLBACK_SEED_BYTES: usize = 5;

#[async_trait::async_trait]
pub trait ImageModel: Send + Sync {
    /// Generate one image for the prompt and return its URL.
    async fn generate_image(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Response payload for `/generate-image`. Always `success: true`; failures
/// ride along as a fallback image plus the error text.
#[derive(Debug, Clone, Serialize)]
pub struct ImageOutcome {
    pub success: bool,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub prompt: String,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Image endpoint core: authenticates, enhances the prompt, calls the
/// generator when one is configured, and otherwise (or on any failure)
/// serves the deterministic placeholder.
pub struct ImageSynthesizer {
    identity: IdentityExtractor,
    generator: Option<Arc<dyn ImageModel>>,
}

impl ImageSynthesizer {
    pub fn new(identity: IdentityExtractor, generator: Option<Arc<dyn ImageModel>>) -> Self {
        if generator.is_none() {
            tracing::warn!("image generation key not configured; all images will be fallbacks");
        }
        Self {
            identity,
            generator,
        }
    }

    pub async fn generate(
        &self,
        authorization: Option<&str>,
        prompt: &str,
        title: Option<&str>,
    ) -> Result<ImageOutcome, AuthError> {
        self.identity.extract_user_id(authorization)?;

        let Some(generator) = &self.generator else {
            return Ok(fallback_outcome(prompt, None));
        };

        let enhanced = enhance_prompt(prompt, title);
        match generator.generate_image(&enhanced).await {
            Ok(image_url) => {
                tracing::info!("image generated");
                Ok(ImageOutcome {
                    success: true,
                    image_url,
                    prompt: enhanced,
                    fallback: false,
                    error: None,
                })
            }
            Err(err) => {
                let detail = format!("{err:#}");
                tracing::warn!(error = %detail, "image generation failed; serving fallback");
                Ok(fallback_outcome(prompt, Some(detail)))
            }
        }
    }
}

fn fallback_outcome(prompt: &str, error: Option<String>) -> ImageOutcome {
    ImageOutcome {
        success: true,
        image_url: fallback_image_url(prompt),
        prompt: prompt.to_string(),
        fallback: true,
        error,
    }
}

/// Deterministic placeholder: the prompt's content hash picks a fixed-size
/// seeded image, so the same prompt always maps to the same picture.
pub fn fallback_image_url(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    let seed: String = digest
        .iter()
        .take(FALLBACK_SEED_BYTES)
        .map(|b| format!("{b:02x}"))
        .collect();
    format!("https://picsum.photos/seed/{seed}/1600/900")
}

fn enhance_prompt(prompt: &str, title: Option<&str>) -> String {
    match title {
        Some(title) if !title.trim().is_empty() => format!(
            "Create a professional, high-quality image for a news article titled '{title}'. \
             {prompt}. Style: professional, modern, suitable for financial news."
        ),
        _ => prompt.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct OpenRouterImageModel {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenRouterImageModel {
    /// Returns `None` when no usable key is configured; the caller then
    /// wires the synthesizer for fallback-only operation.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = settings.openrouter_api_key.as_deref() else {
            return Ok(None);
        };
        if api_key.is_empty() || api_key == PLACEHOLDER_API_KEY {
            return Ok(None);
        }

        let base_url =
            std::env::var("OPENROUTER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENROUTER_IMAGE_MODEL")
            .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());
        let timeout_secs = std::env::var("OPENROUTER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build OpenRouter http client")?;

        Ok(Some(Self {
            http,
            api_key: api_key.to_string(),
            base_url,
            model,
        }))
    }
}

#[async_trait::async_trait]
impl ImageModel for OpenRouterImageModel {
    async fn generate_image(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            modalities: &["image"],
        };

        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenRouter request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenRouter response body")?;
        if !status.is_success() {
            anyhow::bail!("OpenRouter HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to parse OpenRouter response JSON: {text}"))?;
        parsed
            .first_image_url()
            .context("no image generated by model")
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    modalities: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    images: Vec<ImageItem>,
}

/// The gateway has returned both of these shapes in the wild.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageItem {
    Nested { image_url: ImageUrl },
    Flat { url: String },
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: String,
}

impl ChatCompletionResponse {
    fn first_image_url(&self) -> Option<String> {
        let item = self.choices.first()?.message.images.first()?;
        Some(match item {
            ImageItem::Nested { image_url } => image_url.url.clone(),
            ImageItem::Flat { url } => url.clone(),
        })
    }
}
