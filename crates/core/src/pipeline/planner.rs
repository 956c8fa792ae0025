use crate::domain::plan::{ExecutionPlan, LlmExecutionPlan};
use crate::llm::json;
use crate::llm::policy::ModelPolicy;
use crate::llm::{GenerateRequest, TextModel};
use std::sync::Arc;

/// Classifies the user's query into an [`ExecutionPlan`] with one LLM call,
/// walking the planning model list until one returns usable JSON.
///
/// Planning never fails: exhausting the list yields the safe default plan,
/// which turns the request into plain chat.
pub struct IntentPlanner {
    model: Arc<dyn TextModel>,
    models: Vec<String>,
}

impl IntentPlanner {
    pub fn new(model: Arc<dyn TextModel>, policy: &ModelPolicy) -> Self {
        Self {
            model,
            models: policy.planning().to_vec(),
        }
    }

    pub async fn plan(&self, prompt: &str) -> ExecutionPlan {
        let instruction = planning_instruction(prompt);

        for model in &self.models {
            let req = GenerateRequest {
                model: model.clone(),
                prompt: instruction.clone(),
                json_output: true,
            };

            match self.model.generate(req).await {
                Ok(text) => match json::parse_object::<LlmExecutionPlan>(&text) {
                    Ok(plan) => {
                        let plan = plan.into_plan();
                        tracing::info!(
                            %model,
                            intent = ?plan.intent,
                            entities = plan.entities.len(),
                            needs_portfolio = plan.needs_portfolio,
                            "execution plan ready"
                        );
                        return plan;
                    }
                    Err(err) => {
                        tracing::warn!(%model, error = %err, "planning output unusable; trying next model");
                    }
                },
                Err(err) => {
                    tracing::warn!(%model, error = %err, "planning model failed; trying next model");
                }
            }
        }

        tracing::warn!("all planning models failed; using default plan");
        ExecutionPlan::safe_default()
    }
}

fn planning_instruction(prompt: &str) -> String {
    format!(
        "Analyze the following user query and extract:\n\
         1. A list of specific stock names or company names to research in our database (\"entities\").\n\
         2. The primary intent: 'stock_research', 'portfolio_analysis', or 'general_chat'.\n\
         3. Whether the user's portfolio data is needed to answer this query.\n\n\
         Query: \"{prompt}\"\n\n\
         Return the result ONLY as a JSON object with keys: \"entities\", \"intent\", \"needs_portfolio\", \"reasoning\"."
    )
}
