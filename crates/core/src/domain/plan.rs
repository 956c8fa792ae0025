use serde::{Deserialize, Serialize};

/// Coarse classification of a user query, driving which data-gathering
/// branches of the chat pipeline execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    StockResearch,
    PortfolioAnalysis,
    GeneralChat,
}

/// The per-request research plan. Produced once by the intent planner and
/// immutable afterwards, except for the orchestrator's portfolio override.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub entities: Vec<String>,
    pub intent: Intent,
    pub needs_portfolio: bool,
    pub reasoning: String,
}

impl ExecutionPlan {
    /// The plan used when every planning model fails. Planning must never
    /// abort a request, so this is the floor the pipeline can rely on.
    pub fn safe_default() -> Self {
        Self {
            entities: Vec::new(),
            intent: Intent::GeneralChat,
            needs_portfolio: false,
            reasoning: "Fallback to safety.".to_string(),
        }
    }
}

/// Wire contract for the planner's JSON output. Kept separate from
/// [`ExecutionPlan`] so model quirks are absorbed here and the rest of the
/// pipeline only ever sees cleaned-up plans.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmExecutionPlan {
    #[serde(default)]
    pub entities: Vec<String>,
    pub intent: Intent,
    #[serde(default)]
    pub needs_portfolio: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl LlmExecutionPlan {
    pub fn into_plan(self) -> ExecutionPlan {
        let entities = self
            .entities
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        ExecutionPlan {
            entities,
            intent: self.intent,
            needs_portfolio: self.needs_portfolio,
            reasoning: self.reasoning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_plan() {
        let v = json!({
            "entities": ["Acme Corp", " Tata Motors "],
            "intent": "stock_research",
            "needs_portfolio": false,
            "reasoning": "user asked about two stocks"
        });

        let plan = serde_json::from_value::<LlmExecutionPlan>(v)
            .unwrap()
            .into_plan();
        assert_eq!(plan.intent, Intent::StockResearch);
        assert_eq!(plan.entities, vec!["Acme Corp", "Tata Motors"]);
        assert!(!plan.needs_portfolio);
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        let v = json!({"intent": "general_chat"});

        let plan = serde_json::from_value::<LlmExecutionPlan>(v)
            .unwrap()
            .into_plan();
        assert_eq!(plan.intent, Intent::GeneralChat);
        assert!(plan.entities.is_empty());
        assert!(!plan.needs_portfolio);
    }

    #[test]
    fn rejects_unknown_intent() {
        let v = json!({"intent": "world_domination", "entities": []});
        assert!(serde_json::from_value::<LlmExecutionPlan>(v).is_err());
    }

    #[test]
    fn drops_blank_entities() {
        let v = json!({"intent": "stock_research", "entities": ["", "  ", "Acme Corp"]});

        let plan = serde_json::from_value::<LlmExecutionPlan>(v)
            .unwrap()
            .into_plan();
        assert_eq!(plan.entities, vec!["Acme Corp"]);
    }
}
