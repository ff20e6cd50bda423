//! Tokenizer server: typed PostgreSQL data layer for organisations, users, tokens and user holdings,
//! plus a small HTTP API on top.

pub mod config;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{AppError, ConfigError, ModelError};
pub use hooks::{FnHook, Hook, HookPoint, HookRegistry, Hooks};
pub use migration::apply_migrations;
pub use models::{Model, Organisation, Token, User, UserToken};
pub use routes::{api_routes, app, status_routes};
pub use service::{DataLayer, Repository, Upsert};
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
