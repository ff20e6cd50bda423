//! Data layer tests against a live PostgreSQL. They run only when `DATABASE_URL` is set; each test
//! works inside a transaction that is rolled back on drop.

use chrono::{TimeZone, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tokenizer_server::{
    apply_migrations, DataLayer, HookPoint, Hooks, ModelError, Organisation, Token, Upsert, User, UserToken,
};
use uuid::Uuid;

async fn pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.expect("connect");
    apply_migrations(&pool).await.expect("migrate");
    Some(pool)
}

fn expiry() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2031, 6, 1, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn insert_fills_default_id_and_finds_it_back() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let mut org = Organisation::new("acme");
    models.organisations.insert(&mut tx, &mut org, &[]).await.unwrap();
    assert!(!org.id.is_nil());

    let found = models.organisations.find(&mut tx, &org.id).await.unwrap();
    assert_eq!(found, org);
    assert!(models.organisations.exists(&mut tx, &org.id).await.unwrap());
}

#[tokio::test]
async fn find_missing_row_is_not_found() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let err = models.users.find(&mut tx, &Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found(), "{}", err);
}

#[tokio::test]
async fn update_then_reload_sees_new_values() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let mut user = User::new("fb-1");
    models.users.insert(&mut tx, &mut user, &[]).await.unwrap();
    user.facebook_id = "fb-2".into();
    assert_eq!(models.users.update(&mut tx, &mut user, &[]).await.unwrap(), 1);

    let mut reloaded = User {
        id: user.id,
        ..Default::default()
    };
    models.users.reload(&mut tx, &mut reloaded).await.unwrap();
    assert_eq!(reloaded.facebook_id, "fb-2");
    assert_eq!(reloaded.org_id, None);
}

#[tokio::test]
async fn upsert_twice_keeps_one_row_with_latest_values() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let before = models.organisations.count(&mut tx).await.unwrap();
    let id = Uuid::new_v4();
    let mut org = Organisation {
        id,
        name: "first".into(),
        ..Default::default()
    };
    models.organisations.upsert(&mut tx, &mut org, &Upsert::default()).await.unwrap();
    org.name = "second".into();
    models.organisations.upsert(&mut tx, &mut org, &Upsert::default()).await.unwrap();

    assert_eq!(models.organisations.count(&mut tx).await.unwrap(), before + 1);
    assert_eq!(models.organisations.find(&mut tx, &id).await.unwrap().name, "second");

    // Ignoring the conflict leaves the row alone and is not an error.
    org.name = "third".into();
    let ignore = Upsert {
        update_on_conflict: false,
        ..Upsert::default()
    };
    models.organisations.upsert(&mut tx, &mut org, &ignore).await.unwrap();
    assert_eq!(models.organisations.find(&mut tx, &id).await.unwrap().name, "second");
}

#[tokio::test]
async fn delete_restores_count() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let before = models.organisations.count(&mut tx).await.unwrap();
    let mut org = Organisation::new("short-lived");
    models.organisations.insert(&mut tx, &mut org, &[]).await.unwrap();
    assert_eq!(models.organisations.count(&mut tx).await.unwrap(), before + 1);

    assert_eq!(models.organisations.delete(&mut tx, &mut org).await.unwrap(), 1);
    assert_eq!(models.organisations.count(&mut tx).await.unwrap(), before);
    assert!(!models.organisations.exists(&mut tx, &org.id).await.unwrap());
}

#[tokio::test]
async fn slice_operations_use_composite_keys() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let mut org = Organisation::new("acme");
    models.organisations.insert(&mut tx, &mut org, &[]).await.unwrap();
    let mut user = User::new("fb");
    models.users.insert(&mut tx, &mut user, &[]).await.unwrap();
    let mut held = Vec::new();
    for name in ["gold", "silver"] {
        let mut token = Token::new(name, expiry(), org.id);
        models.tokens.insert(&mut tx, &mut token, &[]).await.unwrap();
        let mut ut = UserToken::new(user.id, token.id);
        models.user_tokens.insert(&mut tx, &mut ut, &[]).await.unwrap();
        assert_eq!(ut.number, None);
        held.push(ut);
    }

    let changed = models
        .user_tokens
        .update_all(&mut tx, &held, &[("number", Some(7i16).into())])
        .await
        .unwrap();
    assert_eq!(changed, 2);
    models.user_tokens.reload_all(&mut tx, &mut held).await.unwrap();
    assert!(held.iter().all(|ut| ut.number == Some(7)));

    assert_eq!(models.user_tokens.delete_all(&mut tx, &mut held).await.unwrap(), 2);
    for ut in &held {
        assert!(!models.user_tokens.exists(&mut tx, &(ut.user_id, ut.token_id)).await.unwrap());
    }
}

#[tokio::test]
async fn set_and_remove_user_org_keep_both_sides_in_step() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let mut user = User::new("fb");
    models.users.insert(&mut tx, &mut user, &[]).await.unwrap();
    let mut org = Organisation::new("acme");
    models.set_user_org(&mut tx, &mut user, true, &mut org).await.unwrap();

    assert!(!org.id.is_nil());
    assert_eq!(user.org_id, Some(org.id));
    assert_eq!(user.r.org.as_ref().map(|o| o.id), Some(org.id));
    assert_eq!(org.r.org_users.len(), 1);
    assert_eq!(org.r.org_users[0].id, user.id);
    assert_eq!(models.users.find(&mut tx, &user.id).await.unwrap().org_id, Some(org.id));

    models.remove_user_org(&mut tx, &mut user, Some(&mut org)).await.unwrap();
    assert_eq!(user.org_id, None);
    assert!(user.r.org.is_none());
    assert!(org.r.org_users.is_empty());
    assert_eq!(models.users.find(&mut tx, &user.id).await.unwrap().org_id, None);
}

#[tokio::test]
async fn set_organisation_users_replaces_membership() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let mut org = Organisation::new("acme");
    models.organisations.insert(&mut tx, &mut org, &[]).await.unwrap();
    let mut old = [User::new("old")];
    models.add_organisation_users(&mut tx, &mut org, true, &mut old).await.unwrap();
    let mut new = [User::new("new")];
    models.set_organisation_users(&mut tx, &mut org, true, &mut new).await.unwrap();

    assert_eq!(org.r.org_users.len(), 1);
    assert_eq!(org.r.org_users[0].id, new[0].id);
    assert_eq!(models.users.find(&mut tx, &old[0].id).await.unwrap().org_id, None);
    let members = models.organisation_users(&mut tx, &org).await.unwrap();
    assert_eq!(members.iter().map(|u| u.id).collect::<Vec<_>>(), vec![new[0].id]);

    models.remove_organisation_users(&mut tx, &mut org, &mut new).await.unwrap();
    assert!(org.r.org_users.is_empty());
    assert!(models.organisation_users(&mut tx, &org).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_member_removal_keeps_the_organisation() {
    let Some(pool) = pool().await else { return };
    let mut hooks = Hooks::default();
    hooks.user.add_fn(HookPoint::BeforeUpdate, |u: &mut User| {
        if u.facebook_id == "locked" {
            return Err(ModelError::Hook("locked user".into()));
        }
        Ok(())
    });
    let models = DataLayer::new(hooks);
    let mut tx = pool.begin().await.unwrap();

    let mut org = Organisation::new("acme");
    models.organisations.insert(&mut tx, &mut org, &[]).await.unwrap();
    let mut members = [User::new("free"), User::new("locked")];
    models.add_organisation_users(&mut tx, &mut org, true, &mut members).await.unwrap();

    let err = models.remove_organisation_users(&mut tx, &mut org, &mut members).await.unwrap_err();
    assert!(matches!(err, ModelError::Hook(_)));
    assert_eq!(members[0].org_id, None);
    assert!(members[0].r.org.is_none());
    assert_eq!(members[1].org_id, Some(org.id));
    assert_eq!(members[1].r.org.as_ref().map(|o| o.id), Some(org.id));
    assert_eq!(models.users.find(&mut tx, &members[1].id).await.unwrap().org_id, Some(org.id));
}

#[tokio::test]
async fn organisation_with_two_tokens_loads_exactly_those() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let mut org = Organisation::new("acme");
    models.organisations.insert(&mut tx, &mut org, &[]).await.unwrap();
    let mut other = Organisation::new("globex");
    models.organisations.insert(&mut tx, &mut other, &[]).await.unwrap();

    let mut tokens = [Token::new("gold", expiry(), Uuid::nil()), Token::new("silver", expiry(), Uuid::nil())];
    models.add_organisation_tokens(&mut tx, &mut org, true, &mut tokens).await.unwrap();
    let mut stray = [Token::new("bronze", expiry(), Uuid::nil())];
    models.add_organisation_tokens(&mut tx, &mut other, true, &mut stray).await.unwrap();
    assert_eq!(tokens[0].r.org.as_ref().map(|o| o.id), Some(org.id));

    let mut loaded = [models.organisations.find(&mut tx, &org.id).await.unwrap()];
    models.load_organisation_tokens(&mut tx, &mut loaded).await.unwrap();
    let mut got: Vec<Uuid> = loaded[0].r.org_tokens.iter().map(|t| t.id).collect();
    let mut want = vec![tokens[0].id, tokens[1].id];
    got.sort();
    want.sort();
    assert_eq!(got, want);

    let mut loaded_tokens = models.organisation_tokens(&mut tx, &org).await.unwrap();
    models.load_token_org(&mut tx, &mut loaded_tokens).await.unwrap();
    assert!(loaded_tokens.iter().all(|t| t.r.org.as_ref().map(|o| o.id) == Some(org.id)));
    assert_eq!(models.token_org(&mut tx, &stray[0]).await.unwrap().id, other.id);
}

#[tokio::test]
async fn user_tokens_load_from_both_ends() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let mut org = Organisation::new("acme");
    models.organisations.insert(&mut tx, &mut org, &[]).await.unwrap();
    let mut token = Token::new("gold", expiry(), org.id);
    models.tokens.insert(&mut tx, &mut token, &[]).await.unwrap();
    let mut owner = Organisation::new("globex");
    models.set_token_org(&mut tx, &mut token, true, &mut owner).await.unwrap();
    assert_eq!(token.org_id, owner.id);
    assert_eq!(owner.r.org_tokens.len(), 1);
    assert_eq!(models.tokens.find(&mut tx, &token.id).await.unwrap().org_id, owner.id);

    let mut user = User::new("fb");
    models.users.insert(&mut tx, &mut user, &[]).await.unwrap();
    let mut held = [UserToken {
        number: Some(3),
        ..UserToken::new(Uuid::nil(), token.id)
    }];
    models.add_user_user_tokens(&mut tx, &mut user, true, &mut held).await.unwrap();
    assert_eq!(held[0].user_id, user.id);
    assert_eq!(user.r.user_tokens.len(), 1);

    let mut users = [models.users.find(&mut tx, &user.id).await.unwrap()];
    models.load_user_user_tokens(&mut tx, &mut users).await.unwrap();
    assert_eq!(users[0].r.user_tokens.len(), 1);
    assert_eq!(users[0].r.user_tokens[0].number, Some(3));

    let mut rows = models.token_user_tokens(&mut tx, &token).await.unwrap();
    models.load_user_token_user(&mut tx, &mut rows).await.unwrap();
    models.load_user_token_token(&mut tx, &mut rows).await.unwrap();
    assert_eq!(rows[0].r.user.as_ref().map(|u| u.id), Some(user.id));
    assert_eq!(rows[0].r.token.as_ref().map(|t| t.name.as_str()), Some("gold"));

    let mut newcomer = User::new("fb-new");
    models.set_user_token_user(&mut tx, &mut rows[0], true, &mut newcomer).await.unwrap();
    assert_eq!(rows[0].user_id, newcomer.id);
    assert!(models.user_token_user(&mut tx, &rows[0]).await.unwrap().id == newcomer.id);
    assert!(!models.user_tokens.exists(&mut tx, &(user.id, token.id)).await.unwrap());
}

#[tokio::test]
async fn loading_org_of_users_without_one_leaves_none() {
    let Some(pool) = pool().await else { return };
    let models = DataLayer::default();
    let mut tx = pool.begin().await.unwrap();

    let mut users = [User::new("a"), User::new("b")];
    for u in users.iter_mut() {
        models.users.insert(&mut tx, u, &[]).await.unwrap();
    }
    users[0].r.org = Some(Box::new(Organisation::new("stale")));
    models.load_user_org(&mut tx, &mut users).await.unwrap();
    assert!(users.iter().all(|u| u.r.org.is_none()));
    assert!(models.user_org(&mut tx, &users[0]).await.unwrap().is_none());
}

#[tokio::test]
async fn hooks_run_in_order_and_first_failure_aborts() {
    let Some(pool) = pool().await else { return };
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut hooks = Hooks::default();
    let first = Arc::clone(&calls);
    let second = Arc::clone(&calls);
    let never = Arc::clone(&calls);
    hooks
        .user
        .add_fn(HookPoint::BeforeInsert, move |u: &mut User| {
            first.lock().unwrap().push(format!("first:{}", u.facebook_id));
            Ok(())
        })
        .add_fn(HookPoint::BeforeInsert, move |u: &mut User| {
            second.lock().unwrap().push("second".to_string());
            if u.facebook_id == "blocked" {
                return Err(ModelError::Hook("blocked user".into()));
            }
            Ok(())
        })
        .add_fn(HookPoint::BeforeInsert, move |_: &mut User| {
            never.lock().unwrap().push("third".to_string());
            Ok(())
        });
    let models = DataLayer::new(hooks);
    let mut tx = pool.begin().await.unwrap();

    let before = models.users.count(&mut tx).await.unwrap();
    let mut blocked = User::new("blocked");
    let err = models.users.insert(&mut tx, &mut blocked, &[]).await.unwrap_err();
    assert!(matches!(err, ModelError::Hook(_)));
    assert_eq!(*calls.lock().unwrap(), vec!["first:blocked".to_string(), "second".to_string()]);
    assert_eq!(models.users.count(&mut tx).await.unwrap(), before);
    assert!(models.users.cache().insert.is_empty());

    calls.lock().unwrap().clear();
    let mut ok = User::new("ok");
    models.users.insert(&mut tx, &mut ok, &[]).await.unwrap();
    assert_eq!(calls.lock().unwrap().len(), 3);
    assert_eq!(models.users.cache().insert.len(), 1);
}

#[tokio::test]
async fn before_hooks_rewrite_the_stored_row() {
    let Some(pool) = pool().await else { return };
    let mut hooks = Hooks::default();
    hooks
        .user
        .add_fn(HookPoint::BeforeInsert, |u: &mut User| {
            u.facebook_id = format!("fb:{}", u.facebook_id.trim().to_lowercase());
            Ok(())
        })
        .add_fn(HookPoint::BeforeUpdate, |u: &mut User| {
            u.facebook_id.push_str(":edited");
            Ok(())
        });
    let models = DataLayer::new(hooks);
    let mut tx = pool.begin().await.unwrap();

    let mut user = User::new("  Alice ");
    models.users.insert(&mut tx, &mut user, &[]).await.unwrap();
    assert_eq!(user.facebook_id, "fb:alice");
    let stored = models.users.find(&mut tx, &user.id).await.unwrap();
    assert_eq!(stored.facebook_id, "fb:alice");

    models.users.update(&mut tx, &mut user, &["facebook_id"]).await.unwrap();
    let stored = models.users.find(&mut tx, &user.id).await.unwrap();
    assert_eq!(stored.facebook_id, "fb:alice:edited");
}

#[tokio::test]
async fn after_select_hooks_see_every_loaded_row() {
    let Some(pool) = pool().await else { return };
    let seen = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&seen);
    let mut hooks = Hooks::default();
    hooks.token.add_fn(HookPoint::AfterSelect, move |_: &mut Token| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    let models = DataLayer::new(hooks);
    let mut tx = pool.begin().await.unwrap();

    let mut org = Organisation::new("acme");
    models.organisations.insert(&mut tx, &mut org, &[]).await.unwrap();
    let mut tokens = [Token::new("a", expiry(), org.id), Token::new("b", expiry(), org.id)];
    for t in tokens.iter_mut() {
        models.tokens.insert(&mut tx, t, &[]).await.unwrap();
    }
    let mut orgs = [org];
    models.load_organisation_tokens(&mut tx, &mut orgs).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), 2);
}
