//! HTTP surface: `GET /liquidity` and `GET /health`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::engine::LiquidityEngine;
use crate::types::{ErrorKind, LiquidityRequest, QuoterError};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiquidityParams {
    sell_token: Option<String>,
    buy_token: Option<String>,
    chain_id: Option<String>,
}

impl LiquidityParams {
    fn into_request(self) -> Result<LiquidityRequest, QuoterError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (sell_token, buy_token, chain_id) = (present(self.sell_token), present(self.buy_token), present(self.chain_id));

        let missing: Vec<&str> = [
            ("sellToken", sell_token.is_none()),
            ("buyToken", buy_token.is_none()),
            ("chainId", chain_id.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| *name)
        .collect();

        match (sell_token, buy_token, chain_id) {
            (Some(sell_token), Some(buy_token), Some(chain_id)) => {
                let chain_id = chain_id
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| QuoterError::InvalidChainId(chain_id.clone()))?;
                Ok(LiquidityRequest { sell_token, buy_token, chain_id })
            }
            _ => Err(QuoterError::MissingParameters(missing.join(", "))),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    supported_chains: Option<Vec<u64>>,
}

/// Wraps a library error for rendering as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub QuoterError);

impl From<QuoterError> for ApiError {
    fn from(e: QuoterError) -> Self {
        Self(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Domain => StatusCode::BAD_REQUEST,
        ErrorKind::Network => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        let supported_chains = match &self.0 {
            QuoterError::UnsupportedChain { supported, .. } => Some(supported.clone()),
            _ => None,
        };
        let body = ErrorBody { error: self.0.code(), message: self.0.to_string(), supported_chains };
        (status, Json(body)).into_response()
    }
}

async fn liquidity(
    State(engine): State<Arc<LiquidityEngine>>,
    Query(params): Query<LiquidityParams>,
) -> Result<Response, ApiError> {
    let request = params.into_request()?;
    let response = engine.get_liquidity_quotes(&request).await?;
    Ok(Json(response).into_response())
}

async fn health(State(engine): State<Arc<LiquidityEngine>>) -> Response {
    let report = engine.health().await;
    if report.healthy {
        let body = json!({
            "status": "ok",
            "rpcConnectivity": "healthy",
            "latestBlock": report.latest_block,
            "cacheSize": report.cache_size,
        });
        (StatusCode::OK, Json(body)).into_response()
    } else {
        let body = json!({
            "status": "degraded",
            "rpcConnectivity": "unhealthy",
            "error": report.error,
            "cacheSize": report.cache_size,
        });
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

/// Routes bound to a shared engine.
pub fn router(engine: Arc<LiquidityEngine>) -> Router {
    Router::new()
        .route("/liquidity", get(liquidity))
        .route("/health", get(health))
        .with_state(engine)
}

pub struct ApiServer {
    engine: Arc<LiquidityEngine>,
}

impl ApiServer {
    pub fn new(engine: Arc<LiquidityEngine>) -> Self {
        Self { engine }
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn start<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;
        info!("Starting API server on {}", addr);
        axum::serve(listener, router(self.engine))
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
