use super::{children_of, distinct_keys, set_foreign_key, swap_remove_by_key};
use crate::error::ModelError;
use crate::models::{Model, Organisation, Token, User};
use crate::service::exec::execute;
use crate::service::DataLayer;
use crate::sql::{self, QueryBuf, SqlValue};
use sqlx::PgConnection;

impl DataLayer {
    /// Tokens whose `org_id` is this organisation.
    pub async fn organisation_tokens(&self, conn: &mut PgConnection, org: &Organisation) -> Result<Vec<Token>, ModelError> {
        self.tokens.find_by(conn, "org_id", SqlValue::from(org.id)).await
    }

    /// Users whose `org_id` is this organisation.
    pub async fn organisation_users(&self, conn: &mut PgConnection, org: &Organisation) -> Result<Vec<User>, ModelError> {
        self.users.find_by(conn, "org_id", SqlValue::from(org.id)).await
    }

    /// Fill `r.org_tokens` of every organisation with one query.
    pub async fn load_organisation_tokens(
        &self,
        conn: &mut PgConnection,
        orgs: &mut [Organisation],
    ) -> Result<(), ModelError> {
        if orgs.is_empty() {
            return Ok(());
        }
        let keys = distinct_keys(orgs.iter().map(|o| o.id));
        let tokens = self.tokens.find_where_in(conn, "org_id", keys).await?;
        for org in orgs.iter_mut() {
            org.r.org_tokens = children_of(&tokens, org.id, |t: &Token| Some(t.org_id));
        }
        Ok(())
    }

    /// Fill `r.org_users` of every organisation with one query.
    pub async fn load_organisation_users(
        &self,
        conn: &mut PgConnection,
        orgs: &mut [Organisation],
    ) -> Result<(), ModelError> {
        if orgs.is_empty() {
            return Ok(());
        }
        let keys = distinct_keys(orgs.iter().map(|o| o.id));
        let users = self.users.find_where_in(conn, "org_id", keys).await?;
        for org in orgs.iter_mut() {
            org.r.org_users = children_of(&users, org.id, |u: &User| u.org_id);
        }
        Ok(())
    }

    /// Point each token at `org`, inserting the tokens first when `insert` is set.
    pub async fn add_organisation_tokens(
        &self,
        conn: &mut PgConnection,
        org: &mut Organisation,
        insert: bool,
        tokens: &mut [Token],
    ) -> Result<(), ModelError> {
        for token in tokens.iter_mut() {
            if insert {
                token.org_id = org.id;
                self.tokens.insert(&mut *conn, token, &[]).await?;
            } else {
                set_foreign_key(&mut *conn, &*token, "org_id", org.id, "failed to update foreign table tokens").await?;
                token.org_id = org.id;
            }
        }

        org.r.org_tokens.extend(tokens.iter().map(Model::detached));
        let snapshot = org.detached();
        for token in tokens.iter_mut() {
            token.r.org = Some(Box::new(snapshot.clone()));
        }
        Ok(())
    }

    /// Point each user at `org`, inserting the users first when `insert` is set.
    pub async fn add_organisation_users(
        &self,
        conn: &mut PgConnection,
        org: &mut Organisation,
        insert: bool,
        users: &mut [User],
    ) -> Result<(), ModelError> {
        for user in users.iter_mut() {
            if insert {
                user.org_id = Some(org.id);
                self.users.insert(&mut *conn, user, &[]).await?;
            } else {
                set_foreign_key(&mut *conn, &*user, "org_id", org.id, "failed to update foreign table users").await?;
                user.org_id = Some(org.id);
            }
        }

        org.r.org_users.extend(users.iter().map(Model::detached));
        let snapshot = org.detached();
        for user in users.iter_mut() {
            user.r.org = Some(Box::new(snapshot.clone()));
        }
        Ok(())
    }

    /// Replace the organisation's members: every current member's `org_id` is nulled, then `users`
    /// are added.
    pub async fn set_organisation_users(
        &self,
        conn: &mut PgConnection,
        org: &mut Organisation,
        insert: bool,
        users: &mut [User],
    ) -> Result<(), ModelError> {
        let q = QueryBuf::new(sql::null_column_where(User::TABLE, "org_id")).with_params([SqlValue::from(org.id)]);
        execute(&mut *conn, &q)
            .await
            .map_err(ModelError::db("failed to remove relationships before set"))?;
        org.r.org_users.clear();

        self.add_organisation_users(conn, org, insert, users).await
    }

    /// Detach `users` from the organisation. The in-memory list is pruned by swapping the last
    /// member into each removed slot. A user whose update fails keeps its `org_id` and `r.org`.
    pub async fn remove_organisation_users(
        &self,
        conn: &mut PgConnection,
        org: &mut Organisation,
        users: &mut [User],
    ) -> Result<(), ModelError> {
        for user in users.iter_mut() {
            let previous = user.org_id.take();
            if let Err(e) = self.users.update(&mut *conn, user, &["org_id"]).await {
                user.org_id = previous;
                return Err(e);
            }
            user.r.org = None;
        }
        for user in users.iter() {
            swap_remove_by_key(&mut org.r.org_users, &user.id);
        }
        Ok(())
    }
}
