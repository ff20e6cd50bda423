use crate::error::ModelError;
use crate::models::{unknown_column, Model, Organisation, UserToken};
use crate::sql::SqlValue;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub facebook_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<Uuid>,

    #[serde(skip)]
    #[sqlx(skip)]
    pub r: UserR,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserR {
    pub org: Option<Box<Organisation>>,
    pub user_tokens: Vec<UserToken>,
}

impl User {
    pub fn new(facebook_id: impl Into<String>) -> Self {
        User {
            facebook_id: facebook_id.into(),
            ..Default::default()
        }
    }
}

impl Model for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "facebook_id", "org_id"];
    const COLUMNS_WITH_DEFAULT: &'static [&'static str] = &["id"];
    const COLUMNS_WITHOUT_DEFAULT: &'static [&'static str] = &["facebook_id", "org_id"];
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
            "facebook_id" => SqlValue::from(self.facebook_id.as_str()),
            "org_id" => SqlValue::from(self.org_id),
            _ => return Err(unknown_column(Self::TABLE, column)),
        })
    }

    fn is_zero(&self, column: &str) -> bool {
        match column {
            "id" => self.id.is_nil(),
            "facebook_id" => self.facebook_id.is_empty(),
            "org_id" => self.org_id.is_none(),
            _ => true,
        }
    }

    fn assign(&mut self, column: &str, row: &PgRow) -> Result<(), sqlx::Error> {
        match column {
            "id" => self.id = row.try_get(column)?,
            "facebook_id" => self.facebook_id = row.try_get(column)?,
            "org_id" => self.org_id = row.try_get(column)?,
            _ => return Err(sqlx::Error::ColumnNotFound(column.to_string())),
        }
        Ok(())
    }

    fn detached(&self) -> Self {
        User {
            r: UserR::default(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_org_is_omitted_from_json() {
        let user = User::new("fb-1");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("org_id").is_none());

        let org_id = Uuid::new_v4();
        let user = User {
            org_id: Some(org_id),
            ..user
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["org_id"], org_id.to_string());
    }

    #[test]
    fn org_id_binds_as_typed_null() {
        assert_eq!(User::new("fb").value("org_id").unwrap(), SqlValue::Uuid(None));
    }
}
