use crate::config::Settings;
use crate::domain::news::CandidateDocument;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// News lookups are best-effort enrichment: every failure degrades to an
/// empty result here, so callers never have to branch on errors.
#[async_trait::async_trait]
pub trait NewsFeed: Send + Sync {
    async fn search_documents(&self, query: &str) -> Vec<CandidateDocument>;

    async fn fetch_rows(&self, doc: &CandidateDocument) -> Vec<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpNewsFeed {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// The news service wraps payloads as `{"status": ..., "data": ...}`;
/// a missing `data` key means an empty result.
#[derive(Debug, Deserialize)]
struct Envelope<T: Default> {
    #[serde(default)]
    data: T,
}

impl HttpNewsFeed {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_news_service_url()?.to_string();
        let api_key = settings.news_api_key.clone();
        if api_key.is_none() {
            tracing::warn!("NEWS_API_KEY not set; news requests will be unauthenticated");
        }

        let timeout_secs = std::env::var("NEWS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build news http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    async fn get_data<T>(&self, url: &str, params: &[(&str, &str)]) -> anyhow::Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let mut req = self.http.get(url).query(params);
        if let Some(api_key) = &self.api_key {
            req = req.header("x-api-key", api_key);
        }

        let res = req.send().await.context("news service request failed")?;
        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read news service response")?;
        if !status.is_success() {
            anyhow::bail!("news service HTTP {status}: {text}");
        }

        let envelope = serde_json::from_str::<Envelope<T>>(&text)
            .with_context(|| format!("news service response is not valid JSON: {text}"))?;
        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl NewsFeed for HttpNewsFeed {
    async fn search_documents(&self, query: &str) -> Vec<CandidateDocument> {
        let url = format!(
            "{}/api/stock-links/search",
            self.base_url.trim_end_matches('/')
        );

        match self
            .get_data::<Vec<CandidateDocument>>(&url, &[("q", query)])
            .await
        {
            Ok(docs) => docs,
            Err(err) => {
                tracing::warn!(query, error = %format!("{err:#}"), "news search failed; continuing without candidates");
                Vec::new()
            }
        }
    }

    async fn fetch_rows(&self, doc: &CandidateDocument) -> Vec<Value> {
        let url = format!(
            "{}/api/spreadsheet-news/{}",
            self.base_url.trim_end_matches('/'),
            doc.spreadsheet_id
        );
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(gid) = &doc.gid {
            params.push(("gid", gid));
        }

        match self.get_data::<Vec<Value>>(&url, &params).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(
                    document = %doc.name,
                    spreadsheet_id = %doc.spreadsheet_id,
                    error = %format!("{err:#}"),
                    "news row fetch failed; continuing without rows"
                );
                Vec::new()
            }
        }
    }
}
