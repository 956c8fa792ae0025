use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockchat_core::auth::IdentityExtractor;
use stockchat_core::config::Settings;
use stockchat_core::gateway::news::HttpNewsFeed;
use stockchat_core::gateway::portfolio::{HttpPortfolioSource, PortfolioError, PortfolioSource};
use stockchat_core::image::{ImageModel, ImageSynthesizer, OpenRouterImageModel};
use stockchat_core::llm::gemini::GeminiClient;
use stockchat_core::llm::policy::ModelPolicy;
use stockchat_core::llm::TextModel;
use stockchat_core::pipeline::orchestrator::{ChatError, ChatOutcome, Orchestrator};
use stockchat_core::pipeline::planner::IntentPlanner;
use stockchat_core::pipeline::refiner::SelectionRefiner;
use stockchat_core::pipeline::synthesis::SynthesisEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if let Err(err) = run(settings).await {
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }
    Ok(())
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let policy = ModelPolicy::from_env();
    let gemini: Arc<dyn TextModel> = Arc::new(GeminiClient::from_settings(&settings)?);
    let identity = IdentityExtractor::from_settings(&settings);

    let planner = IntentPlanner::new(gemini.clone(), &policy);
    let refiner = SelectionRefiner::new(gemini.clone(), &policy);
    let synthesis = SynthesisEngine::new(gemini, &policy);
    let portfolio: Arc<dyn PortfolioSource> =
        Arc::new(HttpPortfolioSource::from_settings(&settings)?);
    let news = Arc::new(HttpNewsFeed::from_settings(&settings)?);

    let orchestrator = Orchestrator::new(
        identity.clone(),
        planner,
        refiner,
        synthesis,
        portfolio,
        news,
    );

    let image_model =
        OpenRouterImageModel::from_settings(&settings)?.map(|m| Arc::new(m) as Arc<dyn ImageModel>);
    let images = ImageSynthesizer::new(identity, image_model);

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        images: Arc::new(images),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/generate-image", post(generate_image))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8084);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    images: Arc<ImageSynthesizer>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationRequest {
    prompt: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_response(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, ApiError> {
    let authorization = authorization_header(&headers);
    state
        .orchestrator
        .chat(authorization, &req.prompt)
        .await
        .map(Json)
        .map_err(map_chat_error)
}

fn map_chat_error(err: ChatError) -> ApiError {
    match err {
        ChatError::Unauthorized(err) => error_response(StatusCode::UNAUTHORIZED, err.to_string()),
        ChatError::Portfolio(PortfolioError::Timeout) => {
            error_response(StatusCode::GATEWAY_TIMEOUT, "Portfolio service timeout")
        }
        ChatError::Portfolio(PortfolioError::Unavailable) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Portfolio service unavailable",
        ),
        ChatError::Portfolio(PortfolioError::Upstream { status, body }) => {
            // Forward the tracker's own status when it is a valid one.
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            error_response(status, format!("Portfolio fetch failed: {body}"))
        }
        ChatError::Synthesis(err) => {
            sentry::capture_error(&err);
            tracing::error!(error = %err, "all synthesis models failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Orchestration failed at synthesis phase.",
            )
        }
    }
}

async fn generate_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ImageGenerationRequest>,
) -> Result<Json<stockchat_core::image::ImageOutcome>, ApiError> {
    let authorization = authorization_header(&headers);
    state
        .images
        .generate(authorization, &req.prompt, req.title.as_deref())
        .await
        .map(Json)
        .map_err(|err| error_response(StatusCode::UNAUTHORIZED, err.to_string()))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
