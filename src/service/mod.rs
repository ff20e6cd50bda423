//! DataLayer: one repository per table plus relationship loading and mutation.

mod exec;
mod relations;
mod repository;

pub use repository::{Repository, Upsert};

use crate::error::ModelError;
use crate::hooks::Hooks;
use crate::models::{Model, Organisation, Token, User, UserToken};
use sqlx::PgConnection;
use uuid::Uuid;

/// Owns the per-table hook registries and statement caches. Build once at startup and share
/// (e.g. behind an `Arc` in the router state).
pub struct DataLayer {
    pub organisations: Repository<Organisation>,
    pub users: Repository<User>,
    pub tokens: Repository<Token>,
    pub user_tokens: Repository<UserToken>,
}

impl DataLayer {
    pub fn new(hooks: Hooks) -> Self {
        let Hooks {
            organisation,
            user,
            token,
            user_token,
        } = hooks;
        DataLayer {
            organisations: Repository::new(organisation),
            users: Repository::new(user),
            tokens: Repository::new(token),
            user_tokens: Repository::new(user_token),
        }
    }

    /// One primary-key lookup per table; fails on the first table that cannot be queried.
    /// Returns the table names in foreign-key order.
    pub async fn check_tables(&self, conn: &mut PgConnection) -> Result<[&'static str; 4], ModelError> {
        self.organisations.exists(&mut *conn, &Uuid::nil()).await?;
        self.users.exists(&mut *conn, &Uuid::nil()).await?;
        self.tokens.exists(&mut *conn, &Uuid::nil()).await?;
        self.user_tokens.exists(conn, &(Uuid::nil(), Uuid::nil())).await?;
        Ok([Organisation::TABLE, User::TABLE, Token::TABLE, UserToken::TABLE])
    }
}

impl Default for DataLayer {
    fn default() -> Self {
        DataLayer::new(Hooks::default())
    }
}
