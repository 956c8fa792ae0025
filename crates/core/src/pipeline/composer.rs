use crate::domain::news::{NewsContext, PortfolioSnapshot};
use crate::domain::plan::Intent;

/// Persona prepended to every synthesized prompt.
pub const SYSTEM_INSTRUCTION: &str = "\
You are a top-tier financial analyst specializing in the Indian stock market.
Your goal is to provide concise, accurate, and insightful summaries of stock performance, company news, and market trends.
Always prioritize data from the provided internal database. If the database news is empty or outdated, use your internal knowledge to provide a general market outlook but mention that you are using general information.
Keep your tone professional and your answers extremely brief (avoid long introductions or conclusions).";

/// Only the first rows per entity make it into the prompt. Part of the
/// observable contract, not a tuning knob.
pub const NEWS_ROWS_PER_ENTITY: usize = 10;

const NO_DATA_MARKER: &str = "NO RECENT DATA FOUND IN INTERNAL DATABASE.";

/// Assembles the final synthesis prompt. Pure; everything the prompt can
/// contain is in the arguments.
pub fn compose_prompt(
    intent: Intent,
    news: &NewsContext,
    portfolio: Option<&PortfolioSnapshot>,
    user_prompt: &str,
) -> String {
    let analysis_instructions = match intent {
        Intent::GeneralChat => {
            return format!("{SYSTEM_INSTRUCTION}\n\nUser Question: {user_prompt}");
        }
        Intent::StockResearch => {
            "Summarize the recent news for the stocks mentioned. Provide key sentiments and outlook."
                .to_string()
        }
        Intent::PortfolioAnalysis => {
            let rendered = portfolio
                .map(|p| serde_json::to_string_pretty(p).unwrap_or_else(|_| "null".to_string()))
                .unwrap_or_else(|| "null".to_string());
            format!("Analyze the following portfolio data in the context of current news:\n{rendered}")
        }
    };

    let mut news_section = String::new();
    if news.is_empty() {
        news_section.push_str(NO_DATA_MARKER);
    } else {
        for (name, rows) in news.iter() {
            let recent = &rows[..rows.len().min(NEWS_ROWS_PER_ENTITY)];
            let rendered =
                serde_json::to_string_pretty(recent).unwrap_or_else(|_| "[]".to_string());
            news_section.push_str(&format!(
                "\nINTERNAL DATABASE NEWS FOR {name}:\n{rendered}\n"
            ));
        }
    }

    format!(
        "{SYSTEM_INSTRUCTION}\n\n\
         CONTEXTUAL DATA:\n{news_section}\n\n\
         USER QUERY: {user_prompt}\n\n\
         {analysis_instructions}\n\n\
         Provide a concise summary."
    )
}
