use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use lograg_core::ChatResponse;
use lograg_rag::{DEFAULT_SYSTEM_INSTRUCTIONS, RetrievalPipeline};

/// Number of chunks retrieved when the request does not say
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Clone, Default)]
pub struct AppState {
    /// `None` when the pipeline could not be constructed at startup
    pub pipeline: Option<Arc<RetrievalPipeline>>,
}

impl AppState {
    pub fn new(pipeline: Arc<RetrievalPipeline>) -> Self {
        Self {
            pipeline: Some(pipeline),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Read `LOGRAG_HOST` and `LOGRAG_PORT`, falling back to the defaults
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            host: env::var("LOGRAG_HOST").unwrap_or(defaults.host),
            port: env::var("LOGRAG_PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// Query string of `/rag_query`
///
/// `k` is kept as text so a malformed value is answered with a JSON body
/// instead of the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RagQueryParams {
    pub q: Option<String>,
    pub k: Option<String>,
}

impl RagQueryParams {
    /// Requested number of chunks; `None` when `k` is not a non-negative integer
    pub fn top_k(&self) -> Option<usize> {
        match self.k.as_deref().map(str::trim) {
            None | Some("") => Some(DEFAULT_TOP_K),
            Some(raw) => raw.parse().ok(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RagAnswer {
    query: String,
    response: ChatResponse,
    context: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RagFailure {
    query: String,
    error: &'static str,
    details: String,
    fallback: String,
}

impl RagFailure {
    fn new(query: &str, error: &'static str, details: impl Into<String>) -> Self {
        Self {
            query: query.to_string(),
            error,
            details: details.into(),
            fallback: format!("Echo: {}", query),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/rag_query", get(rag_query))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve the query endpoint until the process is stopped.
///
/// When a pipeline is available its index is built on a background task, so
/// the listener binds immediately; requests arriving before that build
/// finishes wait for it.
pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    if let Some(pipeline) = state.pipeline.clone() {
        tokio::spawn(async move {
            match pipeline.build().await {
                Ok(store) => {
                    let chunks = store.count().await.unwrap_or_default();
                    info!(chunks, "startup index build finished");
                }
                Err(e) => error!(error = %e, "startup index build failed"),
            }
        });
    } else {
        warn!("serving without a retrieval pipeline; queries will be echoed");
    }

    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for lograg server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("lograg listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Json(json!({"Hello": "World"}))
}

async fn rag_query(
    State(state): State<AppState>,
    Query(params): Query<RagQueryParams>,
) -> Json<Value> {
    let top_k = params.top_k();
    let Some(query) = params.q.filter(|q| !q.is_empty()) else {
        return Json(json!({"error": "missing query parameter 'q'"}));
    };
    let Some(k) = top_k else {
        return Json(json!({"query": query, "error": "invalid query parameter 'k'"}));
    };

    let Some(pipeline) = state.pipeline else {
        return failure(RagFailure::new(
            &query,
            "RAG pipeline unavailable",
            "pipeline not initialized",
        ));
    };

    let (_, context) = match pipeline.retrieve(&query, k).await {
        Ok(found) => found,
        Err(e) => {
            error!(query = %query, error = %e, "retrieval failed");
            return failure(RagFailure::new(&query, "RAG pipeline error", e.to_string()));
        }
    };

    match pipeline
        .generate_response(context.clone(), &query, DEFAULT_SYSTEM_INSTRUCTIONS)
        .await
    {
        Ok(response) => Json(json!(RagAnswer {
            query,
            response,
            context,
        })),
        Err(e) => {
            error!(query = %query, error = %e, "generation failed");
            failure(RagFailure::new(&query, "RAG pipeline error", e.to_string()))
        }
    }
}

fn failure(body: RagFailure) -> Json<Value> {
    Json(json!(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_body_echoes_query() {
        let body = RagFailure::new(
            "disk full?",
            "RAG pipeline unavailable",
            "pipeline not initialized",
        );
        assert_eq!(
            json!(body),
            json!({
                "query": "disk full?",
                "error": "RAG pipeline unavailable",
                "details": "pipeline not initialized",
                "fallback": "Echo: disk full?"
            })
        );
    }

    #[test]
    fn test_top_k_parsing() {
        let params = |k: Option<&str>| RagQueryParams {
            q: Some("why".to_string()),
            k: k.map(str::to_string),
        };

        assert_eq!(params(None).top_k(), Some(DEFAULT_TOP_K));
        assert_eq!(params(Some("")).top_k(), Some(DEFAULT_TOP_K));
        assert_eq!(params(Some("5")).top_k(), Some(5));
        assert_eq!(params(Some("abc")).top_k(), None);
        assert_eq!(params(Some("-1")).top_k(), None);
    }

    #[test]
    fn test_default_server_config() {
        assert_eq!(
            ServerConfig::default(),
            ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000
            }
        );
    }
}
