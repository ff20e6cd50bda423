//! HTTP handlers for users, tokens and organisations.

pub mod orgs;
pub mod tokens;
pub mod users;

pub use orgs::*;
pub use tokens::*;
pub use users::*;

use crate::error::AppError;
use uuid::Uuid;

fn parse_id(id_str: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id_str).map_err(|_| AppError::BadRequest(format!("invalid uuid: {}", id_str)))
}
