//! User handlers: list, read, and the tokens a user holds.

use super::parse_id;
use crate::error::AppError;
use crate::response::{json_line, json_lines};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};

pub async fn get_users(State(state): State<AppState>) -> Result<Response, AppError> {
    let mut conn = state.pool.acquire().await?;
    let users = state.models.users.all(&mut conn).await?;
    json_lines(&users)
}

pub async fn get_user(State(state): State<AppState>, Path(uid): Path<String>) -> Result<Response, AppError> {
    let id = parse_id(&uid)?;
    let mut conn = state.pool.acquire().await?;
    let user = state.models.users.find(&mut conn, &id).await?;
    json_line(&user)
}

/// The user's holdings, one per line.
pub async fn get_user_tokens(State(state): State<AppState>, Path(uid): Path<String>) -> Result<Response, AppError> {
    let id = parse_id(&uid)?;
    let mut conn = state.pool.acquire().await?;
    let mut user = state.models.users.find(&mut conn, &id).await?;
    state
        .models
        .load_user_user_tokens(&mut conn, std::slice::from_mut(&mut user))
        .await?;
    json_lines(&user.r.user_tokens)
}

pub async fn receive_tokens() -> StatusCode {
    StatusCode::OK
}

pub async fn spend_tokens() -> StatusCode {
    StatusCode::OK
}
