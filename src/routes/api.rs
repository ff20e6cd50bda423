use crate::handlers::{
    create_token, get_org, get_orgs, get_token, get_tokens, get_user, get_user_tokens, get_users,
    grant_group_tokens, grant_user_tokens, receive_tokens, spend_tokens,
};
use crate::state::AppState;
use axum::{routing::any, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Largest request body accepted; no route reads one yet.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Every route answers any method. `/tokens/create` is a static segment and wins over
/// `/tokens/:tid`.
pub fn api_routes(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/users", any(get_users))
        .route("/users/:uid", any(get_user))
        .route("/users/:uid/tokens", any(get_user_tokens))
        .route("/users/:uid/tokens/:tid/receive", any(receive_tokens))
        .route("/users/:uid/tokens/:tid/spend", any(spend_tokens))
        .route("/tokens", any(get_tokens))
        .route("/tokens/create", any(create_token))
        .route("/tokens/:tid", any(get_token))
        .route("/tokens/:tid/grant-group", any(grant_group_tokens))
        .route("/tokens/:tid/grant-user", any(grant_user_tokens))
        .route("/orgs", any(get_orgs))
        .route("/orgs/:oid", any(get_org))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
