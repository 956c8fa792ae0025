use crate::auth::{AuthError, IdentityExtractor};
use crate::domain::news::NewsContext;
use crate::domain::plan::Intent;
use crate::gateway::news::NewsFeed;
use crate::gateway::portfolio::{PortfolioError, PortfolioSource};
use crate::pipeline::composer;
use crate::pipeline::planner::IntentPlanner;
use crate::pipeline::refiner::SelectionRefiner;
use crate::pipeline::synthesis::{SynthesisEngine, SynthesisExhausted};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Response payload for a successful `/chat` request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub answer: String,
    pub model: String,
    pub researched_stocks: Vec<String>,
}

/// The only failures `/chat` surfaces; everything else degrades inside the
/// pipeline.
#[derive(Debug)]
pub enum ChatError {
    Unauthorized(AuthError),
    Portfolio(PortfolioError),
    Synthesis(SynthesisExhausted),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Unauthorized(err) => write!(f, "{err}"),
            ChatError::Portfolio(err) => write!(f, "{err}"),
            ChatError::Synthesis(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Unauthorized(err) => Some(err),
            ChatError::Portfolio(err) => Some(err),
            ChatError::Synthesis(err) => Some(err),
        }
    }
}

/// Drives one chat request through authenticate → plan → gather → compose
/// → synthesize. All collaborators are injected, constructed once at
/// startup.
pub struct Orchestrator {
    identity: IdentityExtractor,
    planner: IntentPlanner,
    refiner: SelectionRefiner,
    synthesis: SynthesisEngine,
    portfolio: Arc<dyn PortfolioSource>,
    news: Arc<dyn NewsFeed>,
}

impl Orchestrator {
    pub fn new(
        identity: IdentityExtractor,
        planner: IntentPlanner,
        refiner: SelectionRefiner,
        synthesis: SynthesisEngine,
        portfolio: Arc<dyn PortfolioSource>,
        news: Arc<dyn NewsFeed>,
    ) -> Self {
        Self {
            identity,
            planner,
            refiner,
            synthesis,
            portfolio,
            news,
        }
    }

    pub async fn chat(
        &self,
        authorization: Option<&str>,
        prompt: &str,
    ) -> Result<ChatOutcome, ChatError> {
        let user_id = self
            .identity
            .extract_user_id(authorization)
            .map_err(ChatError::Unauthorized)?;
        tracing::info!(%user_id, "chat request authenticated");

        let mut plan = self.planner.plan(prompt).await;
        if plan.intent == Intent::PortfolioAnalysis {
            // Portfolio analysis always loads holdings, whatever the planner
            // said. The reverse (forcing the flag off for other intents) is
            // deliberately not done.
            plan.needs_portfolio = true;
        }

        let portfolio = if plan.needs_portfolio {
            // Identity extraction already required the header to be present.
            let header = authorization.unwrap_or_default();
            let snapshot = self
                .portfolio
                .fetch_portfolio(&user_id, header)
                .await
                .map_err(ChatError::Portfolio)?;
            Some(snapshot)
        } else {
            None
        };

        let mut news = NewsContext::new();
        for entity in &plan.entities {
            tracing::info!(%entity, "researching entity");
            let candidates = self.news.search_documents(entity).await;
            if candidates.is_empty() {
                tracing::info!(%entity, "no candidate documents found");
                continue;
            }

            let Some(selected) = self.refiner.select(&candidates, prompt).await else {
                tracing::info!(%entity, "no candidate deemed relevant");
                continue;
            };

            let rows = self.news.fetch_rows(&selected).await;
            tracing::info!(%entity, document = %selected.name, rows = rows.len(), "news gathered");
            news.push(selected.name.clone(), rows);
        }

        let composed = composer::compose_prompt(plan.intent, &news, portfolio.as_ref(), prompt);
        let outcome = self
            .synthesis
            .synthesize(&composed)
            .await
            .map_err(ChatError::Synthesis)?;

        Ok(ChatOutcome {
            answer: outcome.answer,
            model: outcome.model,
            researched_stocks: news.names(),
        })
    }
}
