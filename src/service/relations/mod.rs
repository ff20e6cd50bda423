//! Relationship accessors, eager loaders and mutators.
//!
//! Loaders take a mutable slice and issue one `WHERE fk IN (...)` query for the whole slice.
//! Mutators write the foreign key and then keep both in-memory sides consistent. Related records
//! stored in an `r` container are detached snapshots.

mod organisation;
mod token;
mod user;
mod user_token;

use crate::error::ModelError;
use crate::models::Model;
use crate::service::exec::execute;
use crate::sql::{self, QueryBuf, SqlValue};
use sqlx::PgConnection;
use std::collections::HashSet;
use uuid::Uuid;

/// `UPDATE <table> SET <column> = $1 WHERE <pk>`, addressing the row by `record`'s current key.
pub(crate) async fn set_foreign_key<M: Model>(
    conn: &mut PgConnection,
    record: &M,
    column: &str,
    value: Uuid,
    context: &str,
) -> Result<(), ModelError> {
    let q = QueryBuf::new(sql::set_column_by_pk(M::TABLE, column, M::PRIMARY_KEY))
        .with_params([SqlValue::from(value)])
        .with_params(record.pk_values());
    execute(conn, &q).await.map_err(ModelError::db(context))?;
    Ok(())
}

/// Keys in first-seen order without duplicates.
pub(crate) fn distinct_keys(keys: impl IntoIterator<Item = Uuid>) -> Vec<SqlValue> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for k in keys {
        if seen.insert(k) {
            ordered.push(SqlValue::from(k));
        }
    }
    ordered
}

/// Snapshots of the children whose foreign key equals `key`, in query order.
pub(crate) fn children_of<C: Model>(children: &[C], key: Uuid, fk: impl Fn(&C) -> Option<Uuid>) -> Vec<C> {
    children
        .iter()
        .filter(|c| fk(*c) == Some(key))
        .map(Model::detached)
        .collect()
}

/// Snapshot of the first record whose key column equals `key`; later matches are ignored.
pub(crate) fn first_match<P: Model>(parents: &[P], key: Option<Uuid>, id: impl Fn(&P) -> Uuid) -> Option<Box<P>> {
    let key = key?;
    parents.iter().find(|p| id(*p) == key).map(|p| Box::new(p.detached()))
}

/// Removes the element with primary key `key` by swapping the last element into its slot.
/// Order of the remaining elements is not preserved.
pub(crate) fn swap_remove_by_key<M: Model>(list: &mut Vec<M>, key: &M::Key) -> Option<M> {
    let pos = list.iter().position(|m| &m.key() == key)?;
    Some(list.swap_remove(pos))
}
