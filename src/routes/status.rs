//! Liveness, readiness and build info.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Readiness {
    Ready { tables: [&'static str; 4] },
    Unavailable { error: String },
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// 200 once every table answers through the data layer, 503 otherwise.
async fn ready(State(state): State<AppState>) -> Response {
    let checked = async {
        let mut conn = state.pool.acquire().await?;
        Ok::<_, AppError>(state.models.check_tables(&mut conn).await?)
    };
    match checked.await {
        Ok(tables) => Json(Readiness::Ready { tables }).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "not ready");
            (StatusCode::SERVICE_UNAVAILABLE, Json(Readiness::Unavailable { error: e.to_string() })).into_response()
        }
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `/health`, `/ready` and `/version`, answering GET only.
pub fn status_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
