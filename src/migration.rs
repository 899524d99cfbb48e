//! Schema bootstrap: create the target database and one table per resource.

use crate::config::{PkType, ResolvedModel, ResolvedResource};
use crate::error::{AppError, ConfigError};
use serde_json::Value;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Render a config default as a SQL literal.
fn default_literal(resource: &str, column: &str, v: &Value) -> Result<String, ConfigError> {
    Ok(match v {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Array(_) | Value::Object(_) => {
            return Err(ConfigError::Validation(format!(
                "default for {}.{} must be a scalar",
                resource, column
            )))
        }
    })
}

/// CREATE TABLE IF NOT EXISTS for one resource: generated key column plus one column per field.
pub fn create_table_sql(resource: &ResolvedResource) -> Result<String, ConfigError> {
    let pk = quote(&resource.pk_column);
    let mut col_defs = vec![match resource.pk_type {
        PkType::Int => format!("{} SERIAL PRIMARY KEY", pk),
        PkType::BigInt => format!("{} BIGSERIAL PRIMARY KEY", pk),
        PkType::Uuid => format!("{} UUID PRIMARY KEY DEFAULT gen_random_uuid()", pk),
        PkType::Text => format!("{} TEXT PRIMARY KEY", pk),
    }];
    for f in &resource.fields {
        if f.has_default && f.default.is_none() && !f.nullable {
            return Err(ConfigError::Validation(format!(
                "{}.{} declares has_default but no default value; give it a default or create the table by hand",
                resource.name, f.name
            )));
        }
        let mut def = format!("{} {}", quote(&f.name), f.field_type.sql_type().to_uppercase());
        if !f.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(v) = &f.default {
            def.push_str(" DEFAULT ");
            def.push_str(&default_literal(&resource.name, &f.name, v)?);
        }
        col_defs.push(def);
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote(&resource.table_name),
        col_defs.join(",\n    ")
    ))
}

/// Create every resource table that does not exist yet. Existing tables are left untouched.
pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    for resource in &model.resources {
        let ddl = create_table_sql(resource)?;
        tracing::debug!(table = %resource.table_name, sql = %ddl, "ensure table");
        sqlx::query(&ddl).execute(pool).await?;
    }
    tracing::info!(tables = model.resources.len(), "resource tables ensured");
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|e| ConfigError::Setting {
        key: "DATABASE_URL",
        message: e.to_string(),
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

/// Split a connection URL into (admin URL pointing at `postgres`, database name). The query string is kept.
fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let (without_query, query) = match url.split_once('?') {
        Some((u, q)) => (u, Some(q)),
        None => (url, None),
    };
    let authority_start = without_query.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = without_query[authority_start..]
        .find('/')
        .map(|i| authority_start + i + 1)
        .ok_or_else(|| ConfigError::Setting {
            key: "DATABASE_URL",
            message: "no database path".into(),
        })?;
    let db_name = without_query[path_start..].trim().to_string();
    let mut admin_url = format!("{}postgres", &without_query[..path_start]);
    if let Some(q) = query {
        admin_url.push('?');
        admin_url.push_str(q);
    }
    Ok((admin_url, db_name))
}
