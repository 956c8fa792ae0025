/// Ordered failover lists for the two generation use cases. The planner and
/// the synthesis engine used to hardcode the same list twice; this is the
/// single source of truth, each list independently overridable.
#[derive(Debug, Clone)]
pub struct ModelPolicy {
    planning: Vec<String>,
    synthesis: Vec<String>,
}

const DEFAULT_MODELS: [&str; 4] = [
    "gemini-2.0-flash",
    "gemini-2.5-flash",
    "gemini-3-flash",
    "gemini-2.5-flash-lite",
];

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|s| s.to_string()).collect()
}

fn parse_list(raw: Option<String>) -> Option<Vec<String>> {
    let raw = raw?;
    let models: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if models.is_empty() {
        None
    } else {
        Some(models)
    }
}

impl Default for ModelPolicy {
    fn default() -> Self {
        Self {
            planning: default_models(),
            synthesis: default_models(),
        }
    }
}

impl ModelPolicy {
    /// Reads `GEMINI_PLANNING_MODELS` / `GEMINI_SYNTHESIS_MODELS`
    /// (comma-separated), falling back to the shared default list.
    pub fn from_env() -> Self {
        Self {
            planning: parse_list(std::env::var("GEMINI_PLANNING_MODELS").ok())
                .unwrap_or_else(default_models),
            synthesis: parse_list(std::env::var("GEMINI_SYNTHESIS_MODELS").ok())
                .unwrap_or_else(default_models),
        }
    }

    /// Explicit lists; an empty list falls back to the defaults so every
    /// consumer can rely on at least one model being present.
    pub fn new(planning: Vec<String>, synthesis: Vec<String>) -> Self {
        Self {
            planning: if planning.is_empty() {
                default_models()
            } else {
                planning
            },
            synthesis: if synthesis.is_empty() {
                default_models()
            } else {
                synthesis
            },
        }
    }

    pub fn planning(&self) -> &[String] {
        &self.planning
    }

    pub fn synthesis(&self) -> &[String] {
        &self.synthesis
    }

    /// The refiner makes a single call, no failover; it uses the head of
    /// the planning list.
    pub fn refinement_model(&self) -> &str {
        &self.planning[0]
    }
}
