use crate::domain::news::CandidateDocument;
use crate::llm::json;
use crate::llm::policy::ModelPolicy;
use crate::llm::{GenerateRequest, TextModel};
use serde::Deserialize;
use std::sync::Arc;

/// Picks the single best candidate document for a query, or none. Failures
/// of any kind degrade to none; the rest of the research loop carries on.
pub struct SelectionRefiner {
    model: Arc<dyn TextModel>,
    refine_model: String,
}

#[derive(Debug, Deserialize)]
struct RefinerChoice {
    #[serde(default)]
    name: Option<String>,
}

impl SelectionRefiner {
    pub fn new(model: Arc<dyn TextModel>, policy: &ModelPolicy) -> Self {
        Self {
            model,
            refine_model: policy.refinement_model().to_string(),
        }
    }

    pub async fn select(
        &self,
        candidates: &[CandidateDocument],
        original_prompt: &str,
    ) -> Option<CandidateDocument> {
        if candidates.is_empty() {
            return None;
        }

        let listing = serde_json::to_string_pretty(candidates).ok()?;
        let req = GenerateRequest {
            model: self.refine_model.clone(),
            prompt: refine_instruction(original_prompt, &listing),
            json_output: true,
        };

        let text = match self.model.generate(req).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "refinement call failed; skipping candidate selection");
                return None;
            }
        };

        let choice = match json::parse_object::<RefinerChoice>(&text) {
            Ok(choice) => choice,
            Err(err) => {
                tracing::warn!(error = %err, "refinement output unusable; skipping candidate selection");
                return None;
            }
        };

        let name = choice.name?;
        let selected = candidates.iter().find(|c| c.name == name).cloned();
        if selected.is_none() {
            tracing::info!(%name, "refiner named a document outside the candidate list");
        }
        selected
    }
}

fn refine_instruction(original_prompt: &str, listing: &str) -> String {
    format!(
        "Based on the user's original query: \"{original_prompt}\"\n\
         Select the MOST relevant stock from the following candidate list from our database:\n\
         {listing}\n\n\
         Return ONLY a JSON object with the \"name\" of the best matching entry."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use anyhow::anyhow;

    fn policy() -> ModelPolicy {
        ModelPolicy::new(vec!["refine-model".to_string()], Vec::new())
    }

    fn candidates() -> Vec<CandidateDocument> {
        vec![
            CandidateDocument {
                name: "Acme Corp".to_string(),
                spreadsheet_id: "1AbC".to_string(),
                gid: Some("7".to_string()),
            },
            CandidateDocument {
                name: "Acme Industries".to_string(),
                spreadsheet_id: "2DeF".to_string(),
                gid: None,
            },
        ]
    }

    #[tokio::test]
    async fn empty_candidates_short_circuit_without_a_call() {
        let model = ScriptedModel::new(vec![Ok(r#"{"name": "Acme Corp"}"#.to_string())]);
        let refiner = SelectionRefiner::new(model.clone(), &policy());

        let selected = refiner.select(&[], "anything").await;
        assert!(selected.is_none());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn selects_candidate_by_exact_name() {
        let model = ScriptedModel::new(vec![Ok(r#"{"name": "Acme Industries"}"#.to_string())]);
        let refiner = SelectionRefiner::new(model.clone(), &policy());

        let selected = refiner
            .select(&candidates(), "what about acme industries?")
            .await
            .unwrap();
        assert_eq!(selected.spreadsheet_id, "2DeF");
        assert_eq!(model.models_tried(), vec!["refine-model"]);
    }

    #[tokio::test]
    async fn unknown_name_yields_none() {
        let model = ScriptedModel::new(vec![Ok(r#"{"name": "Globex"}"#.to_string())]);
        let refiner = SelectionRefiner::new(model.clone(), &policy());

        assert!(refiner.select(&candidates(), "acme?").await.is_none());
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn call_failure_yields_none() {
        let model = ScriptedModel::new(vec![Err(anyhow!("boom"))]);
        let refiner = SelectionRefiner::new(model.clone(), &policy());

        assert!(refiner.select(&candidates(), "acme?").await.is_none());
    }

    #[tokio::test]
    async fn unparseable_output_yields_none() {
        let model = ScriptedModel::new(vec![Ok("the best one is Acme Corp".to_string())]);
        let refiner = SelectionRefiner::new(model.clone(), &policy());

        assert!(refiner.select(&candidates(), "acme?").await.is_none());
    }
}
