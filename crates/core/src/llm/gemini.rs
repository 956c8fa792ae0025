use crate::config::Settings;
use crate::llm::error::LlmCallError;
use crate::llm::{GenerateRequest, Provider, TextModel};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Thin client over the Gemini `generateContent` REST endpoint. Model
/// selection lives with the callers (the failover loops), not here.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build Gemini http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
        })
    }
}

#[async_trait::async_trait]
impl TextModel for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate(&self, req: GenerateRequest) -> anyhow::Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            req.model
        );

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &req.prompt }],
            }],
            generation_config: req.json_output.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        let res = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            return Err(LlmCallError {
                provider: Provider::Gemini,
                stage: "http",
                detail: format!("model={} status={status}", req.model),
                raw_output: Some(text),
            }
            .into());
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&text)
            .with_context(|| format!("failed to parse Gemini response JSON: {text}"))?;

        let out = parsed.text();
        if out.is_empty() {
            return Err(LlmCallError {
                provider: Provider::Gemini,
                stage: "extract",
                detail: format!("model={}: response contained no text parts", req.model),
                raw_output: Some(text),
            }
            .into());
        }
        Ok(out)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        let mut out = String::new();
        let Some(content) = self.candidates.first().and_then(|c| c.content.as_ref()) else {
            return out;
        };
        for part in &content.parts {
            if part.text.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&part.text);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_text_from_first_candidate() {
        let v = json!({
            "candidates": [
                {"content": {"parts": [{"text": "hello"}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        });

        let res: GenerateContentResponse = serde_json::from_value(v).unwrap();
        assert_eq!(res.text(), "hello");
    }

    #[test]
    fn joins_multiple_parts_with_newlines() {
        let v = json!({
            "candidates": [
                {"content": {"parts": [{"text": "a"}, {"text": "b"}]}}
            ]
        });

        let res: GenerateContentResponse = serde_json::from_value(v).unwrap();
        assert_eq!(res.text(), "a\nb");
    }

    #[test]
    fn empty_candidates_yield_empty_text() {
        let v = json!({"candidates": []});
        let res: GenerateContentResponse = serde_json::from_value(v).unwrap();
        assert_eq!(res.text(), "");

        let v = json!({});
        let res: GenerateContentResponse = serde_json::from_value(v).unwrap();
        assert_eq!(res.text(), "");
    }

    #[test]
    fn request_serializes_json_mode_config() {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "hi" }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            v["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }
}
