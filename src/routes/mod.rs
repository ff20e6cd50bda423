//! Routers: the API and the status routes.

mod api;
mod status;

pub use api::api_routes;
pub use status::status_routes;

use crate::state::AppState;
use axum::Router;
use std::time::Duration;

/// Everything the server exposes.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    api_routes(state.clone(), request_timeout).merge(status_routes(state))
}
