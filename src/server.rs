//! HTTP surface: `/parse`, `/health` and a self-description at `/`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::pipeline::{
    ParseResponse, Pipeline, PipelineError, SOURCE_AI, SOURCE_DIRECT, SOURCE_DISCOVERED,
    SOURCE_FALLBACK, SOURCE_HTML,
};

/// State shared by all handlers.
pub struct AppState {
    pub pipeline: Pipeline,
    pub ai_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ParseParams {
    url: Option<String>,
}

/// Error response body: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(describe))
        .route("/health", get(health))
        .route("/parse", get(parse))
        .with_state(state)
}

/// Serves the router on `listener` until the process receives Ctrl+C.
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "Listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn parse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ParseParams>,
) -> Result<Json<ParseResponse>, ApiError> {
    let url = params
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required query parameter: url"))?;

    match state.pipeline.parse(&url).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Parse failed");
            Err(e.into())
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "ai_enabled": state.ai_enabled,
    }))
}

async fn describe(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "/parse?url=<URL>": "Parse an RSS, Atom, JSON Feed or HTML URL into feed entries",
            "/health": "Service health",
        },
        "formats": ["rss", "atom", "json", "html"],
        "sources": [SOURCE_DIRECT, SOURCE_HTML, SOURCE_AI, SOURCE_FALLBACK, SOURCE_DISCOVERED],
        "ai_enabled": state.ai_enabled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::OverrideRegistry;
    use pretty_assertions::assert_eq;

    async fn spawn(config: Config) -> String {
        let overrides = Arc::new(OverrideRegistry::from_config(&config.sites).unwrap());
        let state = Arc::new(AppState {
            pipeline: Pipeline::new(&config, overrides).unwrap(),
            ai_enabled: config.ai.enabled,
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn(Config::default()).await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["ai_enabled"], false);
    }

    #[tokio::test]
    async fn test_root_describes_endpoints() {
        let base = spawn(Config::default()).await;
        let body: Value = reqwest::get(format!("{base}/"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["name"], "rssify");
        assert!(body["endpoints"].get("/health").is_some());
    }

    #[tokio::test]
    async fn test_missing_url_is_400() {
        let base = spawn(Config::default()).await;
        let response = reqwest::get(format!("{base}/parse")).await.unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Missing required query parameter: url");
    }

    #[tokio::test]
    async fn test_invalid_url_is_400() {
        let base = spawn(Config::default()).await;
        let response = reqwest::get(format!("{base}/parse?url=ftp%3A%2F%2Fexample.com"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("Unsupported scheme"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500() {
        let upstream = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&upstream)
            .await;

        let mut config = Config::default();
        config.fetch.allow_private_hosts = true;
        let base = spawn(config).await;

        let target = urlencoding::encode(&upstream.uri()).into_owned();
        let response = reqwest::get(format!("{base}/parse?url={target}"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "HTTP error: status 404");
    }
}
