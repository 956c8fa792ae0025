use crate::llm::policy::ModelPolicy;
use crate::llm::{GenerateRequest, TextModel};
use std::fmt;
use std::sync::Arc;

/// A successful generation, tagged with the model that produced it.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub answer: String,
    pub model: String,
}

/// Every model in the synthesis list failed. The only gathering-phase
/// error that reaches the user.
#[derive(Debug)]
pub struct SynthesisExhausted {
    pub attempts: usize,
    pub last_error: String,
}

impl fmt::Display for SynthesisExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all {} synthesis models failed (last error: {})",
            self.attempts, self.last_error
        )
    }
}

impl std::error::Error for SynthesisExhausted {}

/// Runs the composed prompt through the synthesis model list, first
/// success wins.
pub struct SynthesisEngine {
    model: Arc<dyn TextModel>,
    models: Vec<String>,
}

impl SynthesisEngine {
    pub fn new(model: Arc<dyn TextModel>, policy: &ModelPolicy) -> Self {
        Self {
            model,
            models: policy.synthesis().to_vec(),
        }
    }

    pub async fn synthesize(&self, prompt: &str) -> Result<SynthesisOutcome, SynthesisExhausted> {
        let mut attempts = 0;
        let mut last_error = String::from("no synthesis models configured");

        for model in &self.models {
            attempts += 1;
            let req = GenerateRequest {
                model: model.clone(),
                prompt: prompt.to_string(),
                json_output: false,
            };

            match self.model.generate(req).await {
                Ok(answer) => {
                    tracing::info!(%model, attempts, "synthesis succeeded");
                    return Ok(SynthesisOutcome {
                        answer,
                        model: model.clone(),
                    });
                }
                Err(err) => {
                    tracing::warn!(%model, error = %format!("{err:#}"), "synthesis model failed; trying next");
                    last_error = format!("{err:#}");
                }
            }
        }

        Err(SynthesisExhausted {
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use anyhow::anyhow;

    fn policy(models: &[&str]) -> ModelPolicy {
        ModelPolicy::new(
            Vec::new(),
            models.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let model = ScriptedModel::new(vec![Ok("the answer".to_string())]);
        let engine = SynthesisEngine::new(model.clone(), &policy(&["m1", "m2"]));

        let outcome = engine.synthesize("prompt").await.unwrap();
        assert_eq!(outcome.answer, "the answer");
        assert_eq!(outcome.model, "m1");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn failures_advance_until_the_last_model_succeeds() {
        let model = ScriptedModel::new(vec![
            Err(anyhow!("overloaded")),
            Err(anyhow!("overloaded")),
            Ok("late but fine".to_string()),
        ]);
        let engine = SynthesisEngine::new(model.clone(), &policy(&["m1", "m2", "m3"]));

        let outcome = engine.synthesize("prompt").await.unwrap();
        assert_eq!(outcome.model, "m3");
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempt_count_and_last_error() {
        let model = ScriptedModel::new(vec![
            Err(anyhow!("first failure")),
            Err(anyhow!("second failure")),
        ]);
        let engine = SynthesisEngine::new(model.clone(), &policy(&["m1", "m2"]));

        let err = engine.synthesize("prompt").await.unwrap_err();
        assert_eq!(err.attempts, 2);
        assert!(err.last_error.contains("second failure"));
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn synthesis_requests_prose_not_json() {
        let model = ScriptedModel::new(vec![Ok("answer".to_string())]);
        let engine = SynthesisEngine::new(model.clone(), &policy(&["m1"]));

        engine.synthesize("prompt").await.unwrap();
        let requests = model.requests.lock().unwrap();
        assert!(!requests[0].json_output);
        assert_eq!(requests[0].prompt, "prompt");
    }
}
