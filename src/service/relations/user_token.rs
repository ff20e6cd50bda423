use super::{distinct_keys, first_match, set_foreign_key};
use crate::error::ModelError;
use crate::models::{Model, Token, User, UserToken};
use crate::service::DataLayer;
use sqlx::PgConnection;

impl DataLayer {
    pub async fn user_token_user(&self, conn: &mut PgConnection, ut: &UserToken) -> Result<User, ModelError> {
        self.users.find(conn, &ut.user_id).await
    }

    pub async fn user_token_token(&self, conn: &mut PgConnection, ut: &UserToken) -> Result<Token, ModelError> {
        self.tokens.find(conn, &ut.token_id).await
    }

    pub async fn load_user_token_user(&self, conn: &mut PgConnection, held: &mut [UserToken]) -> Result<(), ModelError> {
        if held.is_empty() {
            return Ok(());
        }
        let keys = distinct_keys(held.iter().map(|ut| ut.user_id));
        let users = self.users.find_where_in(conn, "id", keys).await?;
        for ut in held.iter_mut() {
            ut.r.user = first_match(&users, Some(ut.user_id), |u| u.id);
        }
        Ok(())
    }

    pub async fn load_user_token_token(&self, conn: &mut PgConnection, held: &mut [UserToken]) -> Result<(), ModelError> {
        if held.is_empty() {
            return Ok(());
        }
        let keys = distinct_keys(held.iter().map(|ut| ut.token_id));
        let tokens = self.tokens.find_where_in(conn, "id", keys).await?;
        for ut in held.iter_mut() {
            ut.r.token = first_match(&tokens, Some(ut.token_id), |t| t.id);
        }
        Ok(())
    }

    /// Reassign the holding to `user`. The row is addressed by its current key, so the composite key
    /// changes with it.
    pub async fn set_user_token_user(
        &self,
        conn: &mut PgConnection,
        ut: &mut UserToken,
        insert: bool,
        user: &mut User,
    ) -> Result<(), ModelError> {
        if insert {
            self.users.insert(&mut *conn, user, &[]).await?;
        }
        set_foreign_key(conn, &*ut, "user_id", user.id, "failed to update local table user_tokens").await?;

        ut.user_id = user.id;
        ut.r.user = Some(Box::new(user.detached()));
        user.r.user_tokens.push(ut.detached());
        Ok(())
    }

    pub async fn set_user_token_token(
        &self,
        conn: &mut PgConnection,
        ut: &mut UserToken,
        insert: bool,
        token: &mut Token,
    ) -> Result<(), ModelError> {
        if insert {
            self.tokens.insert(&mut *conn, token, &[]).await?;
        }
        set_foreign_key(conn, &*ut, "token_id", token.id, "failed to update local table user_tokens").await?;

        ut.token_id = token.id;
        ut.r.token = Some(Box::new(token.detached()));
        token.r.user_tokens.push(ut.detached());
        Ok(())
    }
}
