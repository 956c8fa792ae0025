use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Account/holdings data from the tracker service, passed through to the
/// prompt verbatim. The orchestrator never inspects its structure.
pub type PortfolioSnapshot = Value;

/// One row from the news service's document search: a spreadsheet (and
/// optionally one tab within it) that might hold news for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDocument {
    pub name: String,
    pub spreadsheet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
}

/// News rows gathered per researched entity. Insertion order is the order
/// entities were researched and is what `researched_stocks` reports, so it
/// must stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct NewsContext {
    entries: Vec<(String, Vec<Value>)>,
}

impl NewsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: String, rows: Vec<Value>) {
        self.entries.push((name, rows));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_slice()))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }
}
