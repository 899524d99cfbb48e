//! Storage collaborator: executes parameterized queries. PostgreSQL implementation over a pool.

use crate::error::AppError;
use crate::sql::{PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

/// One row as field name -> scalar value.
pub type Record = serde_json::Map<String, Value>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Run a query and return every row.
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Record>, AppError>;

    /// Run a query and return the first row, if any.
    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Record>, AppError>;

    /// Run a statement and return the number of rows affected.
    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError>;

    /// Round trip used by readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_all(q: &QueryBuf) -> Result<Query<'_, Postgres, PgArguments>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p)?);
    }
    Ok(query)
}

#[async_trait]
impl Storage for PgStorage {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
        let rows = bind_all(q)?.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Record>, AppError> {
        let row = bind_all(q)?.fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        let result = bind_all(q)?.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Record::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted storage for handler and service tests: records every query and replays queued replies.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub(crate) enum Reply {
        Rows(Vec<Record>),
        Affected(u64),
        Fail,
    }

    #[derive(Default)]
    pub(crate) struct ScriptedStorage {
        replies: Mutex<VecDeque<Reply>>,
        seen: Mutex<Vec<QueryBuf>>,
        down: bool,
    }

    impl ScriptedStorage {
        pub(crate) fn with(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        /// Storage whose readiness ping fails.
        pub(crate) fn down() -> Self {
            Self {
                down: true,
                ..Default::default()
            }
        }

        pub(crate) fn seen(&self) -> Vec<QueryBuf> {
            self.seen.lock().unwrap().clone()
        }

        fn next(&self, q: &QueryBuf) -> Result<Reply, AppError> {
            self.seen.lock().unwrap().push(q.clone());
            match self.replies.lock().unwrap().pop_front() {
                Some(Reply::Fail) => Err(AppError::Db(sqlx::Error::Protocol("connection reset".into()))),
                Some(reply) => Ok(reply),
                None => panic!("no scripted reply for {}", q.sql),
            }
        }
    }

    #[async_trait]
    impl Storage for ScriptedStorage {
        async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
            match self.next(q)? {
                Reply::Rows(rows) => Ok(rows),
                _ => panic!("expected rows reply for {}", q.sql),
            }
        }

        async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Record>, AppError> {
            match self.next(q)? {
                Reply::Rows(rows) => Ok(rows.into_iter().next()),
                _ => panic!("expected rows reply for {}", q.sql),
            }
        }

        async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
            match self.next(q)? {
                Reply::Affected(n) => Ok(n),
                _ => panic!("expected affected reply for {}", q.sql),
            }
        }

        async fn ping(&self) -> Result<(), AppError> {
            if self.down {
                Err(AppError::Db(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }
    }

    pub(crate) fn record(v: Value) -> Record {
        v.as_object().cloned().expect("record literal must be an object")
    }
}
