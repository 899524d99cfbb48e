//! Resource CRUD handlers: list, read, create, update, delete.

use crate::config::{PkType, ResolvedResource};
use crate::error::AppError;
use crate::response::{acknowledged, created, success_many, success_one};
use crate::service::CrudService;
use crate::state::AppState;
use crate::storage::Record;
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

fn resource_for<'a>(state: &'a AppState, path_segment: &str, uri: &OriginalUri) -> Result<&'a ResolvedResource, AppError> {
    state
        .model
        .resource_by_path(path_segment)
        .ok_or_else(|| AppError::RouteNotFound(uri.0.path().to_string()))
}

/// Ids are matched verbatim; blank ids and ids with surrounding whitespace are rejected.
fn parse_id(id_str: &str, pk_type: PkType) -> Result<Value, AppError> {
    if id_str.trim().is_empty() {
        return Err(AppError::BadRequest("id must not be empty".into()));
    }
    if id_str.trim() != id_str {
        return Err(AppError::BadRequest("id must not have surrounding whitespace".into()));
    }
    Ok(match pk_type {
        PkType::Uuid => {
            let u = uuid::Uuid::parse_str(id_str).map_err(|_| AppError::BadRequest("invalid uuid".into()))?;
            Value::String(u.to_string())
        }
        PkType::Int => {
            let n: i32 = id_str.parse().map_err(|_| AppError::BadRequest("invalid id".into()))?;
            Value::Number(n.into())
        }
        PkType::BigInt => {
            let n: i64 = id_str.parse().map_err(|_| AppError::BadRequest("invalid id".into()))?;
            Value::Number(n.into())
        }
        PkType::Text => Value::String(id_str.to_string()),
    })
}

fn body_to_record(value: Value) -> Result<Record, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::Validation("body must be a JSON object".into())),
    }
}

/// "employee" -> "Employee".
fn label(resource: &ResolvedResource) -> String {
    let mut chars = resource.singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    uri: OriginalUri,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource_for(&state, &path_segment, &uri)?;
    let rows = CrudService::list(state.storage.as_ref(), resource).await?;
    Ok(success_many(rows))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    uri: OriginalUri,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource_for(&state, &path_segment, &uri)?;
    let id = parse_id(&id_str, resource.pk_type)?;
    let row = CrudService::get_by_id(state.storage.as_ref(), resource, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", resource.singular, id_str)))?;
    Ok(success_one(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    uri: OriginalUri,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource_for(&state, &path_segment, &uri)?;
    let Json(body) = payload?;
    let body = body_to_record(body)?;
    let id = CrudService::create(state.storage.as_ref(), resource, &body).await?;
    tracing::info!(resource = %resource.name, id = %id, "created");
    Ok(created(id, format!("{} added successfully", label(resource))))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    uri: OriginalUri,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource_for(&state, &path_segment, &uri)?;
    let id = parse_id(&id_str, resource.pk_type)?;
    let Json(body) = payload?;
    let body = body_to_record(body)?;
    let ack = CrudService::update_by_id(state.storage.as_ref(), resource, &id, &body).await?;
    Ok(acknowledged(ack, format!("{} updated successfully", label(resource))))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    uri: OriginalUri,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource_for(&state, &path_segment, &uri)?;
    let id = parse_id(&id_str, resource.pk_type)?;
    let ack = CrudService::delete_by_id(state.storage.as_ref(), resource, &id).await?;
    Ok(acknowledged(ack, format!("{} deleted successfully", label(resource))))
}
