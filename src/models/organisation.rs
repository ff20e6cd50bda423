use crate::error::ModelError;
use crate::models::{unknown_column, Model, Token, User};
use crate::sql::SqlValue;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

/// A tenant that owns tokens and users.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organisation {
    pub id: Uuid,
    pub name: String,

    #[serde(skip)]
    #[sqlx(skip)]
    pub r: OrganisationR,
}

/// Loaded relationships of an organisation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrganisationR {
    pub org_tokens: Vec<Token>,
    pub org_users: Vec<User>,
}

impl Organisation {
    pub fn new(name: impl Into<String>) -> Self {
        Organisation {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Model for Organisation {
    const TABLE: &'static str = "organisations";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    const COLUMNS_WITH_DEFAULT: &'static [&'static str] = &["id"];
    const COLUMNS_WITHOUT_DEFAULT: &'static [&'static str] = &["name"];
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
            _ => return Err(unknown_column(Self::TABLE, column)),
        })
    }

    fn is_zero(&self, column: &str) -> bool {
        match column {
            "id" => self.id.is_nil(),
            "name" => self.name.is_empty(),
            _ => true,
        }
    }

    fn assign(&mut self, column: &str, row: &PgRow) -> Result<(), sqlx::Error> {
        match column {
            "id" => self.id = row.try_get(column)?,
            "name" => self.name = row.try_get(column)?,
            _ => return Err(sqlx::Error::ColumnNotFound(column.to_string())),
        }
        Ok(())
    }

    fn detached(&self) -> Self {
        Organisation {
            r: OrganisationR::default(),
            ..self.clone()
        }
    }
}
