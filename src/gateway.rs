//! HTTP gateway: proxies data submissions and queries to whichever
//! coordinator is currently elected.
//!
//! Policy for request-path staleness: each request fetches a fresh snapshot
//! and revalidates the connection through `ensure_connected`. When the chain
//! RPC is momentarily down, the handler falls back to the last-known handle
//! (stale by at most one maintenance interval). Only a node that has never
//! connected answers 503.

use crate::connection::{ConnectionError, ConnectionManager};
use crate::snapshot::SnapshotSource;
use crate::transactor::{Edit, TransactorError, TransactorHandle};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct GatewayState {
    pub provider: Arc<dyn SnapshotSource>,
    pub manager: Arc<ConnectionManager>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub entity: String,
    pub attribute: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ready: bool,
    pub coordinator: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type HandlerError = (StatusCode, Json<ErrorBody>);

fn error_body(status: StatusCode, error: impl Into<String>) -> HandlerError {
    (status, Json(ErrorBody { error: error.into() }))
}

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/submit", post(submit))
        .route("/query", post(query))
        .route("/status", get(status))
        .with_state(state)
}

pub async fn serve(bind: &str, state: Arc<GatewayState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    println!("🌐 Gateway listening on {}", bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Fresh snapshot when possible, last-known connection otherwise.
async fn active_handle(state: &GatewayState) -> Result<TransactorHandle, HandlerError> {
    match state.provider.snapshot().await {
        Ok(snapshot) => match state.manager.ensure_connected(&snapshot).await {
            Ok(handle) => Ok(handle),
            Err(ConnectionError::Connect(e)) => {
                Err(error_body(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
            }
            Err(ConnectionError::Election(e)) => {
                Err(error_body(StatusCode::BAD_GATEWAY, e.to_string()))
            }
        },
        Err(e) => {
            eprintln!("⚠️  Request-path snapshot fetch failed, using last-known coordinator: {}", e);
            state.manager.current().await.ok_or_else(|| {
                error_body(StatusCode::SERVICE_UNAVAILABLE, "no coordinator connection established yet")
            })
        }
    }
}

async fn submit(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    let handle = active_handle(&state).await?;
    let edits = [Edit { entity: req.entity, attribute: req.attribute, value: req.value }];
    match handle.transact(&edits).await {
        Ok(receipt) => Ok(Json(serde_json::json!({ "status": "success", "transaction": receipt }))),
        Err(TransactorError::RemoteOperationFailed(reason)) => {
            Err(error_body(StatusCode::BAD_GATEWAY, reason))
        }
    }
}

async fn query(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    let handle = active_handle(&state).await?;
    match handle.query(&req.query).await {
        Ok(results) => Ok(Json(serde_json::json!({ "status": "success", "results": results.rows }))),
        Err(TransactorError::RemoteOperationFailed(reason)) => {
            Err(error_body(StatusCode::BAD_GATEWAY, reason))
        }
    }
}

async fn status(State(state): State<Arc<GatewayState>>) -> Json<StatusResponse> {
    let coordinator = state.manager.current_target().await;
    Json(StatusResponse { ready: coordinator.is_some(), coordinator })
}
