//! Generic CRUD, upsert and slice operations for one record type, on any connection or transaction.

use crate::error::ModelError;
use crate::hooks::{HookPoint, HookRegistry};
use crate::models::Model;
use crate::service::exec::{execute, fetch_all_as, fetch_optional_as, fetch_optional_row, fetch_scalar};
use crate::sql::{self, cache_key, insert_column_set, update_column_set, CachedQuery, QueryBuf, QueryCache, SqlValue};
use sqlx::PgConnection;
use std::marker::PhantomData;

/// Options for [`Repository::upsert`]. Empty lists mean "infer": conflict columns default to the
/// primary key, update columns to every non-key column, inserted columns to the insert rules.
#[derive(Clone, Debug)]
pub struct Upsert {
    pub update_on_conflict: bool,
    pub conflict_columns: Vec<String>,
    pub update_columns: Vec<String>,
    pub whitelist: Vec<String>,
}

impl Default for Upsert {
    fn default() -> Self {
        Upsert {
            update_on_conflict: true,
            conflict_columns: Vec::new(),
            update_columns: Vec::new(),
            whitelist: Vec::new(),
        }
    }
}

fn owned(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

pub struct Repository<M: Model> {
    hooks: HookRegistry<M>,
    cache: QueryCache,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Default for Repository<M> {
    fn default() -> Self {
        Repository::new(HookRegistry::default())
    }
}

impl<M: Model> Repository<M> {
    pub fn new(hooks: HookRegistry<M>) -> Self {
        Repository {
            hooks,
            cache: QueryCache::default(),
            _model: PhantomData,
        }
    }

    pub fn hooks(&self) -> &HookRegistry<M> {
        &self.hooks
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub(crate) async fn after_select(&self, conn: &mut PgConnection, records: &mut [M]) -> Result<(), ModelError> {
        self.hooks.run_all(HookPoint::AfterSelect, conn, records).await
    }

    /// Every row of the table.
    pub async fn all(&self, conn: &mut PgConnection) -> Result<Vec<M>, ModelError> {
        let q = QueryBuf::new(sql::select_all(M::TABLE, M::COLUMNS));
        let mut rows = fetch_all_as::<M>(&mut *conn, &q)
            .await
            .map_err(ModelError::db(format!("failed to assign all query results to {} slice", M::TABLE)))?;
        self.after_select(conn, &mut rows).await?;
        Ok(rows)
    }

    /// Fetch one row by primary key; zero rows is [`ModelError::NotFound`].
    pub async fn find(&self, conn: &mut PgConnection, key: &M::Key) -> Result<M, ModelError> {
        let q = QueryBuf::new(sql::select_by_pk(M::TABLE, M::COLUMNS, M::PRIMARY_KEY)).with_params(M::key_values(key));
        let mut row = fetch_optional_as::<M>(&mut *conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to select from {}", M::TABLE)))?
            .ok_or(ModelError::NotFound { table: M::TABLE })?;
        self.hooks.run(HookPoint::AfterSelect, conn, &mut row).await?;
        Ok(row)
    }

    /// Rows where `column` equals `value`.
    pub async fn find_by(&self, conn: &mut PgConnection, column: &str, value: SqlValue) -> Result<Vec<M>, ModelError> {
        Self::check_column(column)?;
        let q = QueryBuf::new(sql::select_where(M::TABLE, M::COLUMNS, column)).with_params([value]);
        let mut rows = fetch_all_as::<M>(&mut *conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to select from {}", M::TABLE)))?;
        self.after_select(conn, &mut rows).await?;
        Ok(rows)
    }

    /// Rows where `column` is any of `values`, in one query.
    pub async fn find_where_in(
        &self,
        conn: &mut PgConnection,
        column: &str,
        values: Vec<SqlValue>,
    ) -> Result<Vec<M>, ModelError> {
        Self::check_column(column)?;
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let q = QueryBuf::new(sql::select_where_in(M::TABLE, M::COLUMNS, column, values.len())).with_params(values);
        let mut rows = fetch_all_as::<M>(&mut *conn, &q)
            .await
            .map_err(ModelError::db(format!("failed to eager load {}", M::TABLE)))?;
        self.after_select(conn, &mut rows).await?;
        Ok(rows)
    }

    pub async fn exists(&self, conn: &mut PgConnection, key: &M::Key) -> Result<bool, ModelError> {
        let q = QueryBuf::new(sql::exists_by_pk(M::TABLE, M::PRIMARY_KEY)).with_params(M::key_values(key));
        fetch_scalar::<bool>(conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to check if {} exists", M::TABLE)))
    }

    pub async fn count(&self, conn: &mut PgConnection) -> Result<i64, ModelError> {
        let q = QueryBuf::new(sql::count(M::TABLE));
        fetch_scalar::<i64>(conn, &q)
            .await
            .map_err(ModelError::db(format!("failed to count {} rows", M::TABLE)))
    }

    /// Insert one record. With an empty whitelist, columns without a default are always inserted and
    /// defaulted columns only when non-zero; defaulted columns left out are read back into `record`.
    /// Column sets are derived after the before-insert hooks have run.
    pub async fn insert(&self, conn: &mut PgConnection, record: &mut M, whitelist: &[&str]) -> Result<(), ModelError> {
        self.hooks.run(HookPoint::BeforeInsert, &mut *conn, record).await?;

        let whitelist = owned(whitelist);
        let nz_defaults = record.non_zero_defaults();
        let key = cache_key(&[&whitelist, &nz_defaults]);
        let cached = self.cache.insert.get(&key);
        let hit = cached.is_some();
        let template = match cached {
            Some(t) => t,
            None => Self::insert_template(&whitelist, &nz_defaults)?,
        };

        let q = QueryBuf::new(template.query.clone()).with_params(record.values(&template.value_columns)?);
        let context = format!("unable to insert into {}", M::TABLE);
        if template.returning.is_empty() {
            execute(&mut *conn, &q).await.map_err(ModelError::db(&context))?;
        } else {
            let row = fetch_optional_row(&mut *conn, &q)
                .await
                .map_err(ModelError::db(&context))?
                .ok_or_else(|| ModelError::db(&context)(sqlx::Error::RowNotFound))?;
            for col in &template.returning {
                record.assign(col, &row).map_err(ModelError::db(&context))?;
            }
        }

        if !hit {
            self.cache.insert.store(key, template);
        }
        self.hooks.run(HookPoint::AfterInsert, conn, record).await
    }

    /// Update one record by primary key. With an empty whitelist every non-key column is written.
    /// Returns the number of rows affected.
    pub async fn update(&self, conn: &mut PgConnection, record: &mut M, whitelist: &[&str]) -> Result<u64, ModelError> {
        self.hooks.run(HookPoint::BeforeUpdate, &mut *conn, record).await?;

        let whitelist = owned(whitelist);
        let key = cache_key(&[&whitelist]);
        let cached = self.cache.update.get(&key);
        let hit = cached.is_some();
        let template = match cached {
            Some(t) => t,
            None => Self::update_template(&whitelist)?,
        };

        let q = QueryBuf::new(template.query.clone()).with_params(record.values(&template.value_columns)?);
        let result = execute(&mut *conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to update {} row", M::TABLE)))?;

        if !hit {
            self.cache.update.store(key, template);
        }
        self.hooks.run(HookPoint::AfterUpdate, conn, record).await?;
        Ok(result.rows_affected())
    }

    /// Insert, or on conflict update (or ignore, without `update_on_conflict`).
    pub async fn upsert(&self, conn: &mut PgConnection, record: &mut M, opts: &Upsert) -> Result<(), ModelError> {
        self.hooks.run(HookPoint::BeforeUpsert, &mut *conn, record).await?;

        let nz_defaults = record.non_zero_defaults();
        let key = format!(
            "{}.{}",
            if opts.update_on_conflict { "t" } else { "f" },
            cache_key(&[&opts.conflict_columns, &opts.update_columns, &opts.whitelist, &nz_defaults])
        );
        let cached = self.cache.upsert.get(&key);
        let hit = cached.is_some();
        let template = match cached {
            Some(t) => t,
            None => Self::upsert_template(opts, &nz_defaults)?,
        };

        let q = QueryBuf::new(template.query.clone()).with_params(record.values(&template.value_columns)?);
        let context = format!("unable to upsert {}", M::TABLE);
        if template.returning.is_empty() {
            execute(&mut *conn, &q).await.map_err(ModelError::db(&context))?;
        } else if let Some(row) = fetch_optional_row(&mut *conn, &q).await.map_err(ModelError::db(&context))? {
            for col in &template.returning {
                record.assign(col, &row).map_err(ModelError::db(&context))?;
            }
        }

        if !hit {
            self.cache.upsert.store(key, template);
        }
        self.hooks.run(HookPoint::AfterUpsert, conn, record).await
    }

    /// Delete one record by primary key. Returns the number of rows affected.
    pub async fn delete(&self, conn: &mut PgConnection, record: &mut M) -> Result<u64, ModelError> {
        self.hooks.run(HookPoint::BeforeDelete, &mut *conn, record).await?;
        let q = QueryBuf::new(sql::delete_by_pk(M::TABLE, M::PRIMARY_KEY)).with_params(record.pk_values());
        let result = execute(&mut *conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to delete from {}", M::TABLE)))?;
        self.hooks.run(HookPoint::AfterDelete, conn, record).await?;
        Ok(result.rows_affected())
    }

    /// Delete every given record in one statement.
    pub async fn delete_all(&self, conn: &mut PgConnection, records: &mut [M]) -> Result<u64, ModelError> {
        if records.is_empty() {
            return Ok(0);
        }
        self.hooks.run_all(HookPoint::BeforeDelete, &mut *conn, records).await?;
        let q = QueryBuf::new(sql::delete_by_pks(M::TABLE, M::PRIMARY_KEY, records.len()))
            .with_params(records.iter().flat_map(|r| r.pk_values()));
        let result = execute(&mut *conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to delete all from {} slice", M::TABLE)))?;
        self.hooks.run_all(HookPoint::AfterDelete, conn, records).await?;
        Ok(result.rows_affected())
    }

    /// Delete every row of the table. Hooks do not run.
    pub async fn delete_all_rows(&self, conn: &mut PgConnection) -> Result<u64, ModelError> {
        let q = QueryBuf::new(sql::delete_all(M::TABLE));
        let result = execute(conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to delete all from {}", M::TABLE)))?;
        Ok(result.rows_affected())
    }

    /// Set the same column values on every given record's row. Hooks do not run and the in-memory
    /// records are not changed.
    pub async fn update_all(
        &self,
        conn: &mut PgConnection,
        records: &[M],
        cols: &[(&str, SqlValue)],
    ) -> Result<u64, ModelError> {
        if records.is_empty() {
            return Ok(0);
        }
        if cols.is_empty() {
            return Err(ModelError::Config("update all requires at least one column argument".into()));
        }
        let names: Vec<&str> = cols.iter().map(|(c, _)| *c).collect();
        for name in &names {
            Self::check_column(name)?;
        }
        let q = QueryBuf::new(sql::update_by_pks(M::TABLE, &names, M::PRIMARY_KEY, records.len()))
            .with_params(cols.iter().map(|(_, v)| v.clone()))
            .with_params(records.iter().flat_map(|r| r.pk_values()));
        let result = execute(conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to update all in {} slice", M::TABLE)))?;
        Ok(result.rows_affected())
    }

    /// Refetch `record` by its primary key, replacing it (relationships included).
    pub async fn reload(&self, conn: &mut PgConnection, record: &mut M) -> Result<(), ModelError> {
        *record = self.find(conn, &record.key()).await?;
        Ok(())
    }

    /// Refetch every record by primary key, replacing the vector's contents.
    pub async fn reload_all(&self, conn: &mut PgConnection, records: &mut Vec<M>) -> Result<(), ModelError> {
        if records.is_empty() {
            return Ok(());
        }
        let q = QueryBuf::new(sql::select_by_pks(M::TABLE, M::COLUMNS, M::PRIMARY_KEY, records.len()))
            .with_params(records.iter().flat_map(|r| r.pk_values()));
        let mut rows = fetch_all_as::<M>(&mut *conn, &q)
            .await
            .map_err(ModelError::db(format!("unable to reload all in {} slice", M::TABLE)))?;
        self.after_select(conn, &mut rows).await?;
        *records = rows;
        Ok(())
    }

    fn insert_template(whitelist: &[String], nz_defaults: &[String]) -> Result<CachedQuery, ModelError> {
        let (wl, ret) = insert_column_set(
            M::COLUMNS,
            M::COLUMNS_WITH_DEFAULT,
            M::COLUMNS_WITHOUT_DEFAULT,
            nz_defaults,
            whitelist,
        );
        Self::check_columns(&wl)?;
        Ok(CachedQuery {
            query: sql::insert(M::TABLE, &wl, &ret),
            value_columns: wl,
            returning: ret,
        })
    }

    /// Key values are bound after the SET values.
    fn update_template(whitelist: &[String]) -> Result<CachedQuery, ModelError> {
        let wl = update_column_set(M::COLUMNS, M::PRIMARY_KEY, whitelist);
        Self::check_columns(&wl)?;
        let query = sql::update(M::TABLE, &wl, M::PRIMARY_KEY)?;
        let mut value_columns = wl;
        value_columns.extend(owned(M::PRIMARY_KEY));
        Ok(CachedQuery {
            query,
            value_columns,
            returning: Vec::new(),
        })
    }

    /// Fails when no update column can be derived, even if conflicts are ignored.
    fn upsert_template(opts: &Upsert, nz_defaults: &[String]) -> Result<CachedQuery, ModelError> {
        let (wl, ret) = insert_column_set(
            M::COLUMNS,
            M::COLUMNS_WITH_DEFAULT,
            M::COLUMNS_WITHOUT_DEFAULT,
            nz_defaults,
            &opts.whitelist,
        );
        let update = update_column_set(M::COLUMNS, M::PRIMARY_KEY, &opts.update_columns);
        if update.is_empty() {
            return Err(ModelError::Config(format!(
                "unable to upsert {}, could not build update column list",
                M::TABLE
            )));
        }
        let conflict = if opts.conflict_columns.is_empty() {
            owned(M::PRIMARY_KEY)
        } else {
            opts.conflict_columns.clone()
        };
        Self::check_columns(&wl)?;
        Self::check_columns(&update)?;
        Self::check_columns(&conflict)?;
        Ok(CachedQuery {
            query: sql::upsert(M::TABLE, opts.update_on_conflict, &ret, &update, &conflict, &wl),
            value_columns: wl,
            returning: ret,
        })
    }

    fn check_column(column: &str) -> Result<(), ModelError> {
        if M::COLUMNS.contains(&column) {
            Ok(())
        } else {
            Err(crate::models::unknown_column(M::TABLE, column))
        }
    }

    fn check_columns(columns: &[String]) -> Result<(), ModelError> {
        columns.iter().try_for_each(|c| Self::check_column(c))
    }
}
