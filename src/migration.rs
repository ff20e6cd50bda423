//! Schema bootstrap: DDL for organisations, users, tokens and user_tokens.
//! Order follows foreign-key dependencies. Idempotent (IF NOT EXISTS).

use crate::error::AppError;
use sqlx::PgPool;

/// Arbitrary key for `pg_advisory_xact_lock`; serialises concurrent bootstraps.
const MIGRATION_LOCK: i64 = 0x746f_6b65_6e69_7a65;

const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS "organisations" (
        "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        "name" TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "users" (
        "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        "facebook_id" TEXT NOT NULL,
        "org_id" UUID NULL REFERENCES "organisations" ("id")
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "tokens" (
        "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        "name" TEXT NOT NULL,
        "expires" TIMESTAMPTZ NOT NULL,
        "org_id" UUID NOT NULL REFERENCES "organisations" ("id")
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "user_tokens" (
        "user_id" UUID NOT NULL REFERENCES "users" ("id"),
        "token_id" UUID NOT NULL REFERENCES "tokens" ("id"),
        "number" SMALLINT NULL,
        PRIMARY KEY ("user_id", "token_id")
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS "users_org_id_idx" ON "users" ("org_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "tokens_org_id_idx" ON "tokens" ("org_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "user_tokens_token_id_idx" ON "user_tokens" ("token_id")"#,
];

/// Create the four tables and their indexes in one transaction.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK)
        .execute(&mut *tx)
        .await?;
    for stmt in DDL {
        sqlx::query(stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(statements = DDL.len(), "schema ready");
    Ok(())
}
