use super::{children_of, distinct_keys, first_match, set_foreign_key, swap_remove_by_key};
use crate::error::ModelError;
use crate::models::{Model, Organisation, User, UserToken};
use crate::service::DataLayer;
use crate::sql::SqlValue;
use sqlx::PgConnection;

impl DataLayer {
    /// The user's organisation, or `None` when `org_id` is null.
    pub async fn user_org(&self, conn: &mut PgConnection, user: &User) -> Result<Option<Organisation>, ModelError> {
        match user.org_id {
            Some(id) => self.organisations.find(conn, &id).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn user_user_tokens(&self, conn: &mut PgConnection, user: &User) -> Result<Vec<UserToken>, ModelError> {
        self.user_tokens.find_by(conn, "user_id", SqlValue::from(user.id)).await
    }

    /// Fill `r.org` of every user with one query. Users without an organisation end up with
    /// `r.org == None`, and no query runs when none has one.
    pub async fn load_user_org(&self, conn: &mut PgConnection, users: &mut [User]) -> Result<(), ModelError> {
        let keys = distinct_keys(users.iter().filter_map(|u| u.org_id));
        if keys.is_empty() {
            for user in users.iter_mut() {
                user.r.org = None;
            }
            return Ok(());
        }
        let orgs = self.organisations.find_where_in(conn, "id", keys).await?;
        for user in users.iter_mut() {
            user.r.org = first_match(&orgs, user.org_id, |o| o.id);
        }
        Ok(())
    }

    /// Fill `r.user_tokens` of every user with one query.
    pub async fn load_user_user_tokens(&self, conn: &mut PgConnection, users: &mut [User]) -> Result<(), ModelError> {
        if users.is_empty() {
            return Ok(());
        }
        let keys = distinct_keys(users.iter().map(|u| u.id));
        let held = self.user_tokens.find_where_in(conn, "user_id", keys).await?;
        for user in users.iter_mut() {
            user.r.user_tokens = children_of(&held, user.id, |ut: &UserToken| Some(ut.user_id));
        }
        Ok(())
    }

    /// Make `org` the user's organisation, inserting it first when `insert` is set.
    pub async fn set_user_org(
        &self,
        conn: &mut PgConnection,
        user: &mut User,
        insert: bool,
        org: &mut Organisation,
    ) -> Result<(), ModelError> {
        if insert {
            self.organisations.insert(&mut *conn, org, &[]).await?;
        }
        set_foreign_key(conn, &*user, "org_id", org.id, "failed to update local table users").await?;

        user.org_id = Some(org.id);
        user.r.org = Some(Box::new(org.detached()));
        org.r.org_users.push(user.detached());
        Ok(())
    }

    /// Null the user's `org_id`. When given, `org` loses the user from its member list.
    pub async fn remove_user_org(
        &self,
        conn: &mut PgConnection,
        user: &mut User,
        org: Option<&mut Organisation>,
    ) -> Result<(), ModelError> {
        let previous = user.org_id.take();
        if let Err(e) = self.users.update(conn, user, &["org_id"]).await {
            user.org_id = previous;
            return Err(e);
        }

        user.r.org = None;
        if let Some(org) = org {
            swap_remove_by_key(&mut org.r.org_users, &user.id);
        }
        Ok(())
    }

    /// Give the user each of `held`, inserting them first when `insert` is set.
    pub async fn add_user_user_tokens(
        &self,
        conn: &mut PgConnection,
        user: &mut User,
        insert: bool,
        held: &mut [UserToken],
    ) -> Result<(), ModelError> {
        for ut in held.iter_mut() {
            if insert {
                ut.user_id = user.id;
                self.user_tokens.insert(&mut *conn, ut, &[]).await?;
            } else {
                set_foreign_key(&mut *conn, &*ut, "user_id", user.id, "failed to update foreign table user_tokens").await?;
                ut.user_id = user.id;
            }
        }

        user.r.user_tokens.extend(held.iter().map(Model::detached));
        let snapshot = user.detached();
        for ut in held.iter_mut() {
            ut.r.user = Some(Box::new(snapshot.clone()));
        }
        Ok(())
    }
}
