//! Generic CRUD execution for one resource through the storage collaborator.

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::service::RequestValidator;
use crate::sql::{delete, insert, select_by_id, select_list, update};
use crate::storage::{Record, Storage};
use serde::Serialize;
use serde_json::Value;

/// Acknowledgement of an update or delete. Zero rows affected is still a success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MutationAck {
    pub rows_affected: u64,
}

pub struct CrudService;

impl CrudService {
    /// Every row of the resource, ordered by primary key. Empty table gives an empty vec.
    pub async fn list(storage: &dyn Storage, resource: &ResolvedResource) -> Result<Vec<Record>, AppError> {
        let q = select_list(resource);
        storage
            .fetch_all(&q)
            .await
            .map_err(|e| e.storage_context(format!("error retrieving {} from database", resource.name)))
    }

    /// Fetch one row by primary key. None when no row matches.
    pub async fn get_by_id(
        storage: &dyn Storage,
        resource: &ResolvedResource,
        id: &Value,
    ) -> Result<Option<Record>, AppError> {
        let q = select_by_id(resource, id);
        storage
            .fetch_optional(&q)
            .await
            .map_err(|e| e.storage_context(format!("error retrieving {} from database", resource.singular)))
    }

    /// Validate and insert one row. Returns the primary key assigned by storage (or supplied, for text keys).
    pub async fn create(
        storage: &dyn Storage,
        resource: &ResolvedResource,
        body: &Record,
    ) -> Result<Value, AppError> {
        RequestValidator::validate_create(resource, body)?;
        let q = insert(resource, body);
        let context = || format!("error adding {} to database", resource.singular);
        let row = storage
            .fetch_optional(&q)
            .await
            .map_err(|e| e.storage_context(context()))?
            .ok_or_else(|| {
                AppError::Db(sqlx::Error::Protocol("insert returned no row".into())).storage_context(context())
            })?;
        row.get(&resource.pk_column).cloned().ok_or_else(|| {
            AppError::Db(sqlx::Error::ColumnNotFound(resource.pk_column.clone())).storage_context(context())
        })
    }

    /// Update the supplied fields of the row with this id.
    pub async fn update_by_id(
        storage: &dyn Storage,
        resource: &ResolvedResource,
        id: &Value,
        body: &Record,
    ) -> Result<MutationAck, AppError> {
        RequestValidator::validate_update(resource, body)?;
        let q = update(resource, id, body)
            .ok_or_else(|| AppError::Validation("body must contain at least one field".into()))?;
        let rows_affected = storage
            .execute(&q)
            .await
            .map_err(|e| e.storage_context(format!("error updating {} in database", resource.singular)))?;
        Ok(MutationAck { rows_affected })
    }

    /// Delete the row with this id.
    pub async fn delete_by_id(
        storage: &dyn Storage,
        resource: &ResolvedResource,
        id: &Value,
    ) -> Result<MutationAck, AppError> {
        let q = delete(resource, id);
        let rows_affected = storage
            .execute(&q)
            .await
            .map_err(|e| e.storage_context(format!("error deleting {} from database", resource.singular)))?;
        Ok(MutationAck { rows_affected })
    }
}
