use crate::error::ModelError;
use crate::models::{unknown_column, Model, Organisation, UserToken};
use crate::sql::SqlValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

/// A named, expiring asset scoped to an organisation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Token {
    pub id: Uuid,
    pub name: String,
    pub expires: DateTime<Utc>,
    pub org_id: Uuid,

    #[serde(skip)]
    #[sqlx(skip)]
    pub r: TokenR,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenR {
    pub org: Option<Box<Organisation>>,
    pub user_tokens: Vec<UserToken>,
}

impl Token {
    pub fn new(name: impl Into<String>, expires: DateTime<Utc>, org_id: Uuid) -> Self {
        Token {
            name: name.into(),
            expires,
            org_id,
            ..Default::default()
        }
    }
}

impl Model for Token {
    const TABLE: &'static str = "tokens";
    const COLUMNS: &'static [&'static str] = &["id", "name", "expires", "org_id"];
    const COLUMNS_WITH_DEFAULT: &'static [&'static str] = &["id"];
    const COLUMNS_WITHOUT_DEFAULT: &'static [&'static str] = &["name", "expires", "org_id"];
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    type Key = Uuid;

    fn key(&self) -> Uuid {
        self.id
    }

    fn key_values(key: &Uuid) -> Vec<SqlValue> {
        vec![SqlValue::from(*key)]
    }

    fn value(&self, column: &str) -> Result<SqlValue, ModelError> {
        Ok(match column {
            "id" => SqlValue::from(self.id),
            "name" => SqlValue::from(self.name.as_str()),
            "expires" => SqlValue::from(self.expires),
            "org_id" => SqlValue::from(self.org_id),
            _ => return Err(unknown_column(Self::TABLE, column)),
        })
    }

    fn is_zero(&self, column: &str) -> bool {
        match column {
            "id" => self.id.is_nil(),
            "name" => self.name.is_empty(),
            "expires" => self.expires == DateTime::<Utc>::default(),
            "org_id" => self.org_id.is_nil(),
            _ => true,
        }
    }

    fn assign(&mut self, column: &str, row: &PgRow) -> Result<(), sqlx::Error> {
        match column {
            "id" => self.id = row.try_get(column)?,
            "name" => self.name = row.try_get(column)?,
            "expires" => self.expires = row.try_get(column)?,
            "org_id" => self.org_id = row.try_get(column)?,
            _ => return Err(sqlx::Error::ColumnNotFound(column.to_string())),
        }
        Ok(())
    }

    fn detached(&self) -> Self {
        Token {
            r: TokenR::default(),
            ..self.clone()
        }
    }
}
