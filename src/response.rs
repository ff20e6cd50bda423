//! Response helpers: records are written as JSON, one object per line.

use crate::error::AppError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const NDJSON: &str = "application/x-ndjson";

/// Serialize each record on its own line.
pub fn ndjson_body<T: Serialize>(records: &[T]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for record in records {
        body.push_str(&serde_json::to_string(record)?);
        body.push('\n');
    }
    Ok(body)
}

pub fn json_lines<T: Serialize>(records: &[T]) -> Result<Response, AppError> {
    let body = ndjson_body(records)?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, NDJSON)], body).into_response())
}

pub fn json_line<T: Serialize>(record: &T) -> Result<Response, AppError> {
    json_lines(std::slice::from_ref(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Organisation, UserToken};
    use uuid::Uuid;

    #[test]
    fn one_object_per_line() {
        let a = Organisation::new("a");
        let b = Organisation::new("b");
        let body = ndjson_body(&[a, b]).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(body.ends_with('\n'));
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["name"], "a");
    }

    #[test]
    fn relationships_and_null_number_are_omitted() {
        let ut = UserToken::new(Uuid::nil(), Uuid::nil());
        let body = ndjson_body(&[ut]).unwrap();
        let v: serde_json::Value = serde_json::from_str(body.trim_end()).unwrap();
        assert!(v.get("number").is_none());
        assert!(v.get("r").is_none());
    }

    #[test]
    fn empty_collection_is_empty_body() {
        assert_eq!(ndjson_body::<Organisation>(&[]).unwrap(), "");
    }
}
