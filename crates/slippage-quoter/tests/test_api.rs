//! HTTP surface driven in-process through the axum router.

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{engine_with, MockOracle, Stall, USDC_STR, WETH_STR};
use slippage_quoter::api::router;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn liquidity_uri(sell: &str, buy: &str, chain: &str) -> String {
    format!("/liquidity?sellToken={}&buyToken={}&chainId={}", sell, buy, chain)
}

#[tokio::test]
async fn liquidity_returns_three_levels() {
    let app = router(Arc::new(engine_with(Arc::new(MockOracle::weth_usdc()))));

    let (status, body) = get_json(app, &liquidity_uri(WETH_STR, USDC_STR, "1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sellToken"], WETH_STR);
    assert_eq!(body["buyToken"], USDC_STR);
    assert_eq!(body["chainId"], 1);
    for level in ["1%", "5%", "10%"] {
        assert!(body["quotes"][level]["sellAmount"].is_string(), "missing {}", level);
        assert!(body["quotes"][level]["buyAmount"].is_string(), "missing {}", level);
    }
}

#[tokio::test]
async fn repeated_requests_are_byte_identical() {
    let oracle = Arc::new(MockOracle::weth_usdc());
    let app = router(Arc::new(engine_with(oracle.clone())));
    let uri = liquidity_uri(WETH_STR, USDC_STR, "1");

    let (_, first) = get(app.clone(), &uri).await;
    let calls = oracle.calls();
    let (status, second) = get(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(oracle.calls(), calls);
}

#[tokio::test]
async fn missing_parameters_are_a_bad_request() {
    let app = router(Arc::new(engine_with(Arc::new(MockOracle::weth_usdc()))));

    let (status, body) = get_json(app, &format!("/liquidity?sellToken={}", WETH_STR)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MissingParameters");
    assert_eq!(body["message"], "Missing required parameters: buyToken, chainId");
}

#[tokio::test]
async fn non_numeric_chain_id_is_a_bad_request() {
    let app = router(Arc::new(engine_with(Arc::new(MockOracle::weth_usdc()))));
    let (status, body) = get_json(app, &liquidity_uri(WETH_STR, USDC_STR, "mainnet")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidChainId");
}

#[tokio::test]
async fn unsupported_chain_lists_supported_chains() {
    let app = router(Arc::new(engine_with(Arc::new(MockOracle::weth_usdc()))));

    let (status, body) = get_json(app, &liquidity_uri(WETH_STR, USDC_STR, "999")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UnsupportedChain");
    assert_eq!(body["supportedChains"], json!([1, 56, 137, 8453, 42161]));
}

#[tokio::test]
async fn identical_tokens_are_an_invalid_pair() {
    let app = router(Arc::new(engine_with(Arc::new(MockOracle::weth_usdc()))));
    let (status, body) = get_json(app, &liquidity_uri(WETH_STR, &WETH_STR.to_lowercase(), "1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidTokenPair");
    assert!(body.get("supportedChains").is_none());
}

#[tokio::test]
async fn missing_pool_is_a_bad_request() {
    let app = router(Arc::new(engine_with(Arc::new(MockOracle::weth_usdc().without_pool()))));
    let (status, body) = get_json(app, &liquidity_uri(WETH_STR, USDC_STR, "1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NoPool");
}

#[tokio::test]
async fn rpc_failure_is_service_unavailable() {
    let oracle = MockOracle::weth_usdc().with_lookup_error("connection refused");
    let app = router(Arc::new(engine_with(Arc::new(oracle))));

    let (status, body) = get_json(app, &liquidity_uri(WETH_STR, USDC_STR, "1")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "ServiceUnavailable");
    assert_eq!(body["message"], "RPC error: connection refused");
}

#[tokio::test(start_paused = true)]
async fn unanswered_rpc_is_service_unavailable() {
    let oracle = MockOracle::weth_usdc().with_stall(Stall::Pair);
    let app = router(Arc::new(engine_with(Arc::new(oracle))));

    let (status, body) = get_json(app, &liquidity_uri(WETH_STR, USDC_STR, "1")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "ServiceUnavailable");
    assert_eq!(body["message"], "RPC call timed out after 10000 ms");
}

#[tokio::test(start_paused = true)]
async fn health_degraded_when_node_never_answers() {
    let oracle = MockOracle::weth_usdc().with_stall(Stall::BlockNumber);
    let app = router(Arc::new(engine_with(Arc::new(oracle))));

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["error"], "RPC call timed out after 5000 ms");
}

#[tokio::test]
async fn health_ok() {
    let app = router(Arc::new(engine_with(Arc::new(MockOracle::weth_usdc()))));

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "ok", "rpcConnectivity": "healthy", "latestBlock": 19_000_000, "cacheSize": 0 })
    );
}

#[tokio::test]
async fn health_degraded() {
    let oracle = MockOracle::weth_usdc().with_block_error("connection refused");
    let app = router(Arc::new(engine_with(Arc::new(oracle))));

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({
            "status": "degraded",
            "rpcConnectivity": "unhealthy",
            "error": "RPC error: connection refused",
            "cacheSize": 0
        })
    );
}
