use anyhow::Context;
use serde::de::DeserializeOwned;

/// Pull a JSON object out of model text that may be wrapped in Markdown
/// fences or surrounded by prose.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Decode a model response into `T`, tolerating fenced or prose-wrapped
/// JSON. Shape mismatches are errors; the caller decides whether that means
/// trying another model or degrading.
pub fn parse_object<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    serde_json::from_str::<T>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON for the expected shape: {json_str}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::{Intent, LlmExecutionPlan};

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn parse_object_accepts_clean_json() {
        let text = r#"{"entities": ["Acme Corp"], "intent": "stock_research"}"#;
        let plan: LlmExecutionPlan = parse_object(text).unwrap();
        assert_eq!(plan.intent, Intent::StockResearch);
        assert_eq!(plan.entities, vec!["Acme Corp"]);
    }

    #[test]
    fn parse_object_accepts_fenced_json() {
        let text = "```json\n{\"intent\": \"general_chat\"}\n```";
        let plan: LlmExecutionPlan = parse_object(text).unwrap();
        assert_eq!(plan.intent, Intent::GeneralChat);
    }

    #[test]
    fn parse_object_rejects_prose() {
        let text = "I could not determine the intent, sorry.";
        assert!(parse_object::<LlmExecutionPlan>(text).is_err());
    }
}
