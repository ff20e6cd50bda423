use crate::error::ModelError;
use crate::models::{unknown_column, Model, Token, User};
use crate::sql::SqlValue;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

/// A user's holding of one token type. `number` is an optional quantity; no range is enforced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserToken {
    pub user_id: Uuid,
    pub token_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i16>,

    #[serde(skip)]
    #[sqlx(skip)]
    pub r: UserTokenR,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserTokenR {
    pub user: Option<Box<User>>,
    pub token: Option<Box<Token>>,
}

impl UserToken {
    pub fn new(user_id: Uuid, token_id: Uuid) -> Self {
        UserToken {
            user_id,
            token_id,
            ..Default::default()
        }
    }
}

impl Model for UserToken {
    const TABLE: &'static str = "user_tokens";
    const COLUMNS: &'static [&'static str] = &["user_id", "token_id", "number"];
    const COLUMNS_WITH_DEFAULT: &'static [&'static str] = &["number"];
    const COLUMNS_WITHOUT_DEFAULT: &'static [&'static str] = &["user_id", "token_id"];
    const PRIMARY_KEY: &'static [&'static str] = &["user_id", "token_id"];

    type Key = (Uuid, Uuid);

    fn key(&self) -> (Uuid, Uuid) {
        (self.user_id, self.token_id)
    }

    fn key_values(key: &(Uuid, Uuid)) -> Vec<SqlValue> {
        vec![SqlValue::from(key.0), SqlValue::from(key.1)]
    }

    fn value(&self, column: &str) -> Result<SqlValue, ModelError> {
        Ok(match column {
            "user_id" => SqlValue::from(self.user_id),
            "token_id" => SqlValue::from(self.token_id),
            "number" => SqlValue::from(self.number),
            _ => return Err(unknown_column(Self::TABLE, column)),
        })
    }

    fn is_zero(&self, column: &str) -> bool {
        match column {
            "user_id" => self.user_id.is_nil(),
            "token_id" => self.token_id.is_nil(),
            "number" => self.number.is_none(),
            _ => true,
        }
    }

    fn assign(&mut self, column: &str, row: &PgRow) -> Result<(), sqlx::Error> {
        match column {
            "user_id" => self.user_id = row.try_get(column)?,
            "token_id" => self.token_id = row.try_get(column)?,
            "number" => self.number = row.try_get(column)?,
            _ => return Err(sqlx::Error::ColumnNotFound(column.to_string())),
        }
        Ok(())
    }

    fn detached(&self) -> Self {
        UserToken {
            r: UserTokenR::default(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_values_follow_primary_key_order() {
        let (u, t) = (Uuid::new_v4(), Uuid::new_v4());
        let ut = UserToken::new(u, t);
        assert_eq!(ut.pk_values(), vec![SqlValue::from(u), SqlValue::from(t)]);
    }

    #[test]
    fn zero_number_is_none_not_zero() {
        let mut ut = UserToken::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(ut.non_zero_defaults().is_empty());
        ut.number = Some(0);
        assert_eq!(ut.non_zero_defaults(), vec!["number".to_string()]);
    }
}
