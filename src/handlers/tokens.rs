//! Token handlers. Granting and creation are accepted but do nothing yet.

use super::parse_id;
use crate::error::AppError;
use crate::response::{json_line, json_lines};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};

pub async fn get_tokens(State(state): State<AppState>) -> Result<Response, AppError> {
    let mut conn = state.pool.acquire().await?;
    let tokens = state.models.tokens.all(&mut conn).await?;
    json_lines(&tokens)
}

pub async fn get_token(State(state): State<AppState>, Path(tid): Path<String>) -> Result<Response, AppError> {
    let id = parse_id(&tid)?;
    let mut conn = state.pool.acquire().await?;
    let token = state.models.tokens.find(&mut conn, &id).await?;
    json_line(&token)
}

pub async fn grant_group_tokens() -> StatusCode {
    StatusCode::OK
}

pub async fn grant_user_tokens() -> StatusCode {
    StatusCode::OK
}

pub async fn create_token() -> StatusCode {
    StatusCode::OK
}
