//! Per-entity callbacks run around insert, update, delete, upsert and after select.
//!
//! Registries are plain values: build a [`Hooks`] at startup, register callbacks, then hand it to
//! [`crate::DataLayer::new`]. Hooks receive the same connection as the triggering operation, so
//! inside a transaction they run inside it too. The record is passed mutably: a before-insert,
//! before-update or before-upsert hook can rewrite fields and the statement is built afterwards.

use crate::error::ModelError;
use crate::models::{Organisation, Token, User, UserToken};
use async_trait::async_trait;
use sqlx::PgConnection;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPoint {
    BeforeInsert,
    BeforeUpdate,
    BeforeDelete,
    BeforeUpsert,
    AfterInsert,
    AfterSelect,
    AfterUpdate,
    AfterDelete,
    AfterUpsert,
}

#[async_trait]
pub trait Hook<M>: Send + Sync {
    async fn call(&self, conn: &mut PgConnection, record: &mut M) -> Result<(), ModelError>;
}

/// Adapts a synchronous closure that does not need the connection.
pub struct FnHook<F>(pub F);

#[async_trait]
impl<M, F> Hook<M> for FnHook<F>
where
    M: Send,
    F: Fn(&mut M) -> Result<(), ModelError> + Send + Sync,
{
    async fn call(&self, _conn: &mut PgConnection, record: &mut M) -> Result<(), ModelError> {
        (self.0)(record)
    }
}

/// Ordered hook lists for one record type.
pub struct HookRegistry<M> {
    hooks: HashMap<HookPoint, Vec<Arc<dyn Hook<M>>>>,
}

impl<M> Default for HookRegistry<M> {
    fn default() -> Self {
        HookRegistry {
            hooks: HashMap::new(),
        }
    }
}

impl<M: Send + 'static> HookRegistry<M> {
    pub fn add(&mut self, point: HookPoint, hook: impl Hook<M> + 'static) -> &mut Self {
        self.hooks.entry(point).or_default().push(Arc::new(hook));
        self
    }

    pub fn add_fn<F>(&mut self, point: HookPoint, f: F) -> &mut Self
    where
        F: Fn(&mut M) -> Result<(), ModelError> + Send + Sync + 'static,
    {
        self.add(point, FnHook(f))
    }

    pub fn len(&self, point: HookPoint) -> usize {
        self.hooks.get(&point).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    /// Runs hooks in registration order; the first error stops the chain and is returned.
    pub async fn run(&self, point: HookPoint, conn: &mut PgConnection, record: &mut M) -> Result<(), ModelError> {
        let Some(hooks) = self.hooks.get(&point) else {
            return Ok(());
        };
        for hook in hooks {
            hook.call(&mut *conn, &mut *record).await?;
        }
        Ok(())
    }

    pub async fn run_all(&self, point: HookPoint, conn: &mut PgConnection, records: &mut [M]) -> Result<(), ModelError> {
        if self.len(point) == 0 {
            return Ok(());
        }
        for record in records {
            self.run(point, &mut *conn, record).await?;
        }
        Ok(())
    }
}

/// Hook registries for every entity, consumed when the data layer is built.
#[derive(Default)]
pub struct Hooks {
    pub organisation: HookRegistry<Organisation>,
    pub user: HookRegistry<User>,
    pub token: HookRegistry<Token>,
    pub user_token: HookRegistry<UserToken>,
}
