//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved resource.

use crate::config::{FieldType, ResolvedResource};
use crate::storage::Record;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryBuf {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// Push a parameter and return its placeholder cast to `sql_type`.
    fn placeholder(&mut self, v: Value, sql_type: &str) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, sql_type)
    }
}

/// SELECT list: primary key first, then fields in declaration order. Numeric is read back as float8 so rows decode to JSON numbers.
fn select_column_list(resource: &ResolvedResource) -> String {
    let mut cols = vec![quoted(&resource.pk_column)];
    for f in &resource.fields {
        let q = quoted(&f.name);
        if f.field_type == FieldType::Numeric {
            cols.push(format!("{}::float8 AS {}", q, q));
        } else {
            cols.push(q);
        }
    }
    cols.join(", ")
}

/// SELECT every row, ordered by primary key.
pub fn select_list(resource: &ResolvedResource) -> QueryBuf {
    QueryBuf::new(format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(resource),
        quoted(&resource.table_name),
        quoted(&resource.pk_column)
    ))
}

/// SELECT by primary key.
pub fn select_by_id(resource: &ResolvedResource, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::default();
    let ph = q.placeholder(id.clone(), resource.pk_type.sql_type());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(resource),
        quoted(&resource.table_name),
        quoted(&resource.pk_column),
        ph
    );
    q
}

/// INSERT returning the primary key.
/// Fields missing from the body are bound as NULL, except fields with a DB default, which are omitted.
/// A caller-supplied key is included only when the body carries it (text keys).
pub fn insert(resource: &ResolvedResource, body: &Record) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();

    if let Some(id) = body.get(&resource.pk_column) {
        placeholders.push(q.placeholder(id.clone(), resource.pk_type.sql_type()));
        cols.push(quoted(&resource.pk_column));
    }
    for f in &resource.fields {
        let val = body.get(&f.name).cloned();
        if val.is_none() && f.has_default {
            continue;
        }
        placeholders.push(q.placeholder(val.unwrap_or(Value::Null), f.field_type.sql_type()));
        cols.push(quoted(&f.name));
    }

    let table = quoted(&resource.table_name);
    let returning = quoted(&resource.pk_column);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only fields present in the body, in declaration order. The primary key is never set.
/// Returns None when the body names no writable field.
pub fn update(resource: &ResolvedResource, id: &Value, body: &Record) -> Option<QueryBuf> {
    let mut q = QueryBuf::default();
    let mut sets = Vec::new();
    for f in &resource.fields {
        let Some(v) = body.get(&f.name) else { continue };
        let ph = q.placeholder(v.clone(), f.field_type.sql_type());
        sets.push(format!("{} = {}", quoted(&f.name), ph));
    }
    if sets.is_empty() {
        return None;
    }
    let id_ph = q.placeholder(id.clone(), resource.pk_type.sql_type());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(&resource.table_name),
        sets.join(", "),
        quoted(&resource.pk_column),
        id_ph
    );
    Some(q)
}

/// DELETE by id.
pub fn delete(resource: &ResolvedResource, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::default();
    let ph = q.placeholder(id.clone(), resource.pk_type.sql_type());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(&resource.table_name),
        quoted(&resource.pk_column),
        ph
    );
    q
}
