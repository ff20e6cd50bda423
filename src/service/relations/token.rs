use super::{children_of, distinct_keys, first_match, set_foreign_key};
use crate::error::ModelError;
use crate::models::{Model, Organisation, Token, UserToken};
use crate::service::DataLayer;
use crate::sql::SqlValue;
use sqlx::PgConnection;

impl DataLayer {
    pub async fn token_org(&self, conn: &mut PgConnection, token: &Token) -> Result<Organisation, ModelError> {
        self.organisations.find(conn, &token.org_id).await
    }

    pub async fn token_user_tokens(&self, conn: &mut PgConnection, token: &Token) -> Result<Vec<UserToken>, ModelError> {
        self.user_tokens.find_by(conn, "token_id", SqlValue::from(token.id)).await
    }

    /// Fill `r.org` of every token with one query.
    pub async fn load_token_org(&self, conn: &mut PgConnection, tokens: &mut [Token]) -> Result<(), ModelError> {
        if tokens.is_empty() {
            return Ok(());
        }
        let keys = distinct_keys(tokens.iter().map(|t| t.org_id));
        let orgs = self.organisations.find_where_in(conn, "id", keys).await?;
        for token in tokens.iter_mut() {
            token.r.org = first_match(&orgs, Some(token.org_id), |o| o.id);
        }
        Ok(())
    }

    /// Fill `r.user_tokens` of every token with one query.
    pub async fn load_token_user_tokens(&self, conn: &mut PgConnection, tokens: &mut [Token]) -> Result<(), ModelError> {
        if tokens.is_empty() {
            return Ok(());
        }
        let keys = distinct_keys(tokens.iter().map(|t| t.id));
        let held = self.user_tokens.find_where_in(conn, "token_id", keys).await?;
        for token in tokens.iter_mut() {
            token.r.user_tokens = children_of(&held, token.id, |ut: &UserToken| Some(ut.token_id));
        }
        Ok(())
    }

    /// Move the token to `org`, inserting the organisation first when `insert` is set.
    pub async fn set_token_org(
        &self,
        conn: &mut PgConnection,
        token: &mut Token,
        insert: bool,
        org: &mut Organisation,
    ) -> Result<(), ModelError> {
        if insert {
            self.organisations.insert(&mut *conn, org, &[]).await?;
        }
        set_foreign_key(conn, &*token, "org_id", org.id, "failed to update local table tokens").await?;

        token.org_id = org.id;
        token.r.org = Some(Box::new(org.detached()));
        org.r.org_tokens.push(token.detached());
        Ok(())
    }

    /// Attach each of `held` to the token, inserting them first when `insert` is set.
    pub async fn add_token_user_tokens(
        &self,
        conn: &mut PgConnection,
        token: &mut Token,
        insert: bool,
        held: &mut [UserToken],
    ) -> Result<(), ModelError> {
        for ut in held.iter_mut() {
            if insert {
                ut.token_id = token.id;
                self.user_tokens.insert(&mut *conn, ut, &[]).await?;
            } else {
                set_foreign_key(&mut *conn, &*ut, "token_id", token.id, "failed to update foreign table user_tokens").await?;
                ut.token_id = token.id;
            }
        }

        token.r.user_tokens.extend(held.iter().map(Model::detached));
        let snapshot = token.detached();
        for ut in held.iter_mut() {
            ut.r.token = Some(Box::new(snapshot.clone()));
        }
        Ok(())
    }
}
