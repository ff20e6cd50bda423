//! Statement execution on a single connection. Every statement is logged at debug level with its arguments.

use crate::sql::QueryBuf;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{FromRow, PgConnection};

pub(crate) async fn execute(conn: &mut PgConnection, q: &QueryBuf) -> Result<PgQueryResult, sqlx::Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query.execute(conn).await
}

pub(crate) async fn fetch_optional_row(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<PgRow>, sqlx::Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query.fetch_optional(conn).await
}

pub(crate) async fn fetch_all_as<M>(conn: &mut PgConnection, q: &QueryBuf) -> Result<Vec<M>, sqlx::Error>
where
    M: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, M>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query.fetch_all(conn).await
}

pub(crate) async fn fetch_optional_as<M>(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<M>, sqlx::Error>
where
    M: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, M>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query.fetch_optional(conn).await
}

pub(crate) async fn fetch_scalar<T>(conn: &mut PgConnection, q: &QueryBuf) -> Result<T, sqlx::Error>
where
    (T,): for<'r> FromRow<'r, PgRow>,
    T: Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_scalar::<_, T>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query.fetch_one(conn).await
}
