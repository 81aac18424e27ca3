//! HTTP surface for lograg
//!
//! Exposes the retrieval pipeline behind `GET /rag_query`. Every failure is
//! answered with a degraded JSON body and HTTP 200, carrying an echo of the
//! query as `fallback`.

pub mod server;

pub use server::{AppState, RagQueryParams, ServerConfig, app_router, run_server};
