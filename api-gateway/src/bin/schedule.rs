//! Schedule Lambda - Handles GET /schedule (branchId, staffId, from, to).

use std::sync::Arc;

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::{dispatch, AppState, Route};
use tracing_subscriber::EnvFilter;

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    Ok(dispatch(Route::Schedule, &event, || state.resolver()).await)
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
