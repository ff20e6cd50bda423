use super::parse_id;
use crate::error::AppError;
use crate::response::{json_line, json_lines};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Response,
};

pub async fn get_orgs(State(state): State<AppState>) -> Result<Response, AppError> {
    let mut conn = state.pool.acquire().await?;
    let orgs = state.models.organisations.all(&mut conn).await?;
    json_lines(&orgs)
}

pub async fn get_org(State(state): State<AppState>, Path(oid): Path<String>) -> Result<Response, AppError> {
    let id = parse_id(&oid)?;
    let mut conn = state.pool.acquire().await?;
    let org = state.models.organisations.find(&mut conn, &id).await?;
    json_line(&org)
}
