//! Record types for the four tables and their compile-time column mapping.

mod organisation;
mod token;
mod user;
mod user_token;

pub use organisation::{Organisation, OrganisationR};
pub use token::{Token, TokenR};
pub use user::{User, UserR};
pub use user_token::{UserToken, UserTokenR};

use crate::error::ModelError;
use crate::sql::SqlValue;
use sqlx::postgres::PgRow;
use sqlx::FromRow;

/// Table metadata plus explicit field-to-column access for one record type.
pub trait Model: for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const COLUMNS_WITH_DEFAULT: &'static [&'static str];
    const COLUMNS_WITHOUT_DEFAULT: &'static [&'static str];
    const PRIMARY_KEY: &'static [&'static str];

    type Key: Clone + PartialEq + Send + Sync + std::fmt::Debug;

    fn key(&self) -> Self::Key;

    /// Key values in `PRIMARY_KEY` order.
    fn key_values(key: &Self::Key) -> Vec<SqlValue>;

    fn value(&self, column: &str) -> Result<SqlValue, ModelError>;

    /// Whether the field holds its type's zero value (nil uuid, empty string, None, ...).
    fn is_zero(&self, column: &str) -> bool;

    /// Overwrite one field from a row returned by the database.
    fn assign(&mut self, column: &str, row: &PgRow) -> Result<(), sqlx::Error>;

    /// A copy with an empty relationship container, stored on the other side of a relationship.
    fn detached(&self) -> Self;

    fn values(&self, columns: &[String]) -> Result<Vec<SqlValue>, ModelError> {
        columns.iter().map(|c| self.value(c)).collect()
    }

    fn pk_values(&self) -> Vec<SqlValue> {
        Self::key_values(&self.key())
    }

    /// Defaulted columns whose in-memory value is non-zero.
    fn non_zero_defaults(&self) -> Vec<String> {
        Self::COLUMNS_WITH_DEFAULT
            .iter()
            .filter(|c| !self.is_zero(c))
            .map(|c| c.to_string())
            .collect()
    }
}

pub(crate) fn unknown_column(table: &str, column: &str) -> ModelError {
    ModelError::Config(format!("{} has no column {}", table, column))
}
