use crate::config::Settings;
use crate::domain::news::PortfolioSnapshot;
use anyhow::Context;
use std::fmt;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Portfolio fetches are the one gathering step that is allowed to fail the
/// whole request, so the error carries enough to pick the right HTTP status.
#[derive(Debug)]
pub enum PortfolioError {
    Timeout,
    Unavailable,
    Upstream { status: u16, body: String },
}

impl fmt::Display for PortfolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortfolioError::Timeout => write!(f, "Portfolio service timeout"),
            PortfolioError::Unavailable => write!(f, "Portfolio service unavailable"),
            PortfolioError::Upstream { status, body } => {
                write!(f, "Portfolio fetch failed (status={status}): {body}")
            }
        }
    }
}

impl std::error::Error for PortfolioError {}

#[async_trait::async_trait]
pub trait PortfolioSource: Send + Sync {
    /// Fetch all accounts for `user_id`, forwarding the caller's original
    /// `Authorization` header to the tracker service.
    async fn fetch_portfolio(
        &self,
        user_id: &str,
        authorization: &str,
    ) -> Result<PortfolioSnapshot, PortfolioError>;
}

#[derive(Debug, Clone)]
pub struct HttpPortfolioSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPortfolioSource {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_tracker_service_url()?.to_string();

        let timeout_secs = std::env::var("TRACKER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build tracker http client")?;

        Ok(Self { http, base_url })
    }
}

#[async_trait::async_trait]
impl PortfolioSource for HttpPortfolioSource {
    async fn fetch_portfolio(
        &self,
        user_id: &str,
        authorization: &str,
    ) -> Result<PortfolioSnapshot, PortfolioError> {
        let url = format!("{}/api/portfolio/all", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .query(&[("userId", user_id)])
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) if err.is_timeout() => {
                tracing::warn!(user_id, error = %err, "portfolio fetch timed out");
                return Err(PortfolioError::Timeout);
            }
            Err(err) => {
                tracing::warn!(user_id, error = %err, "portfolio service unreachable");
                return Err(PortfolioError::Unavailable);
            }
        };

        let status = res.status();
        let text = match res.text().await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "failed to read portfolio response");
                return Err(PortfolioError::Unavailable);
            }
        };

        if !status.is_success() {
            return Err(PortfolioError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|err| {
            tracing::warn!(user_id, error = %err, "portfolio response is not valid JSON");
            PortfolioError::Unavailable
        })
    }
}
