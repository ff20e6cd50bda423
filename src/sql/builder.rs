//! Builds parameterized INSERT, UPDATE, UPSERT, SELECT, DELETE templates from a table's column lists.

use crate::error::ModelError;
use crate::sql::SqlValue;

/// Quote identifier for PostgreSQL (safe: only from model constants or caller whitelists).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn quoted_list<S: AsRef<str>>(cols: &[S]) -> String {
    cols.iter()
        .map(|c| quoted(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A statement plus its positional arguments, in bind order.
#[derive(Clone, Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryBuf {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn push_param(&mut self, v: SqlValue) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = SqlValue>) -> Self {
        self.params.extend(params);
        self
    }
}

/// `count` positional placeholders starting at `$start`. With `group > 1` they are wrapped in
/// parenthesised tuples of that size, e.g. `($1, $2), ($3, $4)`.
pub fn placeholders(count: usize, start: usize, group: usize) -> String {
    let mut out = String::new();
    for i in 0..count {
        if i != 0 {
            out.push_str(", ");
        }
        if group > 1 && i % group == 0 {
            out.push('(');
        }
        out.push_str(&format!("${}", start + i));
        if group > 1 && (i + 1) % group == 0 {
            out.push(')');
        }
    }
    out
}

/// `"a" = $start, "b" = $start+1, ...`
pub fn set_params<S: AsRef<str>>(cols: &[S], start: usize) -> String {
    cols.iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", quoted(c.as_ref()), start + i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"a" = $start AND "b" = $start+1 ...`
pub fn where_clause<S: AsRef<str>>(cols: &[S], start: usize) -> String {
    cols.iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", quoted(c.as_ref()), start + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Keeps the members of `set` in the order they appear in `columns`.
fn sort_by_columns(columns: &[&str], set: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| set.iter().any(|s| s == *c))
        .map(|c| c.to_string())
        .collect()
}

fn complement(all: &[&str], remove: &[String]) -> Vec<String> {
    all.iter()
        .filter(|c| !remove.iter().any(|r| r == *c))
        .map(|c| c.to_string())
        .collect()
}

/// Columns to insert and columns to read back with RETURNING.
/// A non-empty whitelist is inserted as given; otherwise every column without a default is inserted
/// along with the defaulted columns whose value is non-zero. Defaulted columns not inserted are returned.
pub fn insert_column_set(
    columns: &[&str],
    with_default: &[&str],
    without_default: &[&str],
    non_zero_defaults: &[String],
    whitelist: &[String],
) -> (Vec<String>, Vec<String>) {
    if !whitelist.is_empty() {
        return (whitelist.to_vec(), complement(with_default, whitelist));
    }
    let mut wl: Vec<String> = without_default.iter().map(|c| c.to_string()).collect();
    wl.extend(non_zero_defaults.iter().cloned());
    let wl = sort_by_columns(columns, &wl);
    let ret = complement(with_default, non_zero_defaults);
    (wl, ret)
}

/// Columns to SET on update: the whitelist if given, else every non-key column.
pub fn update_column_set(columns: &[&str], primary_key: &[&str], whitelist: &[String]) -> Vec<String> {
    if !whitelist.is_empty() {
        return whitelist.to_vec();
    }
    columns
        .iter()
        .filter(|c| !primary_key.contains(c))
        .map(|c| c.to_string())
        .collect()
}

/// Cache key for a column-set signature: each part joined by commas, parts separated by dots.
pub fn cache_key(parts: &[&[String]]) -> String {
    parts
        .iter()
        .map(|p| p.join(","))
        .collect::<Vec<_>>()
        .join(".")
}

/// INSERT with positional values for `wl`, reading back `ret`.
pub fn insert(table: &str, wl: &[String], ret: &[String]) -> String {
    let mut sql = if wl.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quoted(table))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(table),
            quoted_list(wl),
            placeholders(wl.len(), 1, 1)
        )
    };
    if !ret.is_empty() {
        sql.push_str(&format!(" RETURNING {}", quoted_list(ret)));
    }
    sql
}

/// UPDATE of `wl` keyed by the primary key; key params follow the SET params.
pub fn update(table: &str, wl: &[String], primary_key: &[&str]) -> Result<String, ModelError> {
    if wl.is_empty() {
        return Err(ModelError::Config(format!(
            "unable to update {}, could not build whitelist",
            table
        )));
    }
    Ok(format!(
        "UPDATE {} SET {} WHERE {}",
        quoted(table),
        set_params(wl, 1),
        where_clause(primary_key, wl.len() + 1)
    ))
}

/// INSERT ... ON CONFLICT. Without `update_on_conflict` the conflict is ignored.
pub fn upsert(
    table: &str,
    update_on_conflict: bool,
    ret: &[String],
    update: &[String],
    conflict: &[String],
    wl: &[String],
) -> String {
    let mut sql = if wl.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES ON CONFLICT ", quoted(table))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ",
            quoted(table),
            quoted_list(wl),
            placeholders(wl.len(), 1, 1)
        )
    };
    if !update_on_conflict || update.is_empty() {
        sql.push_str("DO NOTHING");
    } else {
        let sets = update
            .iter()
            .map(|c| format!("{} = EXCLUDED.{}", quoted(c), quoted(c)))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!("({}) DO UPDATE SET {}", quoted_list(conflict), sets));
    }
    if !ret.is_empty() {
        sql.push_str(&format!(" RETURNING {}", quoted_list(ret)));
    }
    sql
}

pub fn select_all(table: &str, columns: &[&str]) -> String {
    format!("SELECT {} FROM {}", quoted_list(columns), quoted(table))
}

/// SELECT by primary key (single or composite); key values are the params in key order.
pub fn select_by_pk(table: &str, columns: &[&str], primary_key: &[&str]) -> String {
    format!(
        "SELECT {} FROM {} WHERE {}",
        quoted_list(columns),
        quoted(table),
        where_clause(primary_key, 1)
    )
}

/// SELECT rows whose primary key is any of `count` keys.
pub fn select_by_pks(table: &str, columns: &[&str], primary_key: &[&str], count: usize) -> String {
    format!(
        "SELECT {} FROM {} WHERE ({}) IN ({})",
        quoted_list(columns),
        quoted(table),
        quoted_list(primary_key),
        placeholders(count * primary_key.len(), 1, primary_key.len())
    )
}

/// SELECT rows where one column equals `$1`.
pub fn select_where(table: &str, columns: &[&str], column: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = $1",
        quoted_list(columns),
        quoted(table),
        quoted(column)
    )
}

/// SELECT rows where column IN ($1, $2, ...). Used for batch-loading related rows.
pub fn select_where_in(table: &str, columns: &[&str], column: &str, count: usize) -> String {
    if count == 0 {
        return format!("SELECT {} FROM {} WHERE 1 = 0", quoted_list(columns), quoted(table));
    }
    format!(
        "SELECT {} FROM {} WHERE {} IN ({})",
        quoted_list(columns),
        quoted(table),
        quoted(column),
        placeholders(count, 1, 1)
    )
}

pub fn exists_by_pk(table: &str, primary_key: &[&str]) -> String {
    format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} LIMIT 1)",
        quoted(table),
        where_clause(primary_key, 1)
    )
}

pub fn count(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quoted(table))
}

pub fn delete_by_pk(table: &str, primary_key: &[&str]) -> String {
    format!("DELETE FROM {} WHERE {}", quoted(table), where_clause(primary_key, 1))
}

pub fn delete_by_pks(table: &str, primary_key: &[&str], count: usize) -> String {
    format!(
        "DELETE FROM {} WHERE ({}) IN ({})",
        quoted(table),
        quoted_list(primary_key),
        placeholders(count * primary_key.len(), 1, primary_key.len())
    )
}

pub fn delete_all(table: &str) -> String {
    format!("DELETE FROM {}", quoted(table))
}

/// UPDATE `set_cols` on every row whose key is among `count` keys; key params follow the SET params.
pub fn update_by_pks<S: AsRef<str>>(table: &str, set_cols: &[S], primary_key: &[&str], count: usize) -> String {
    format!(
        "UPDATE {} SET {} WHERE ({}) IN ({})",
        quoted(table),
        set_params(set_cols, 1),
        quoted_list(primary_key),
        placeholders(count * primary_key.len(), set_cols.len() + 1, primary_key.len())
    )
}

/// UPDATE one foreign-key column of a row addressed by its primary key: `$1` is the new value.
pub fn set_column_by_pk(table: &str, column: &str, primary_key: &[&str]) -> String {
    format!(
        "UPDATE {} SET {} = $1 WHERE {}",
        quoted(table),
        quoted(column),
        where_clause(primary_key, 2)
    )
}

/// Detach every row pointing at `$1` through `column`.
pub fn null_column_where(table: &str, column: &str) -> String {
    format!(
        "UPDATE {} SET {} = NULL WHERE {} = $1",
        quoted(table),
        quoted(column),
        quoted(column)
    )
}
