//! Diagnostics Lambda - Handles GET /diag.
//!
//! Confirms the function executes and reports whether upstream credentials
//! are configured, without calling the upstream.

use std::sync::Arc;

use chrono::Utc;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use shared::http::json_response;
use shared::AppState;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct DiagResponse {
    ok: bool,
    route: &'static str,
    ts: i64,
    configured: bool,
}

async fn handler(state: Arc<AppState>, _event: Request) -> Result<Response<Body>, Error> {
    Ok(json_response(
        200,
        &DiagResponse {
            ok: true,
            route: "diag",
            ts: Utc::now().timestamp_millis(),
            configured: state.is_configured(),
        },
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::from_env().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
