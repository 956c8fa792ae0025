pub mod auth;
pub mod domain;
pub mod gateway;
pub mod image;
pub mod llm;
pub mod pipeline;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub tracker_service_url: Option<String>,
        pub news_service_url: Option<String>,
        pub news_api_key: Option<String>,
        pub openrouter_api_key: Option<String>,
        pub auth_jwt_secret: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
                tracker_service_url: std::env::var("TRACKER_SERVICE_URL").ok(),
                news_service_url: std::env::var("NEWS_SERVICE_URL").ok(),
                news_api_key: std::env::var("NEWS_API_KEY").ok(),
                openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok(),
                auth_jwt_secret: std::env::var("AUTH_JWT_SECRET").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn require_tracker_service_url(&self) -> anyhow::Result<&str> {
            self.tracker_service_url
                .as_deref()
                .context("TRACKER_SERVICE_URL is required")
        }

        pub fn require_news_service_url(&self) -> anyhow::Result<&str> {
            self.news_service_url
                .as_deref()
                .context("NEWS_SERVICE_URL is required")
        }
    }
}
