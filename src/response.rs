//! Success response helpers.

use crate::service::MutationAck;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct Created {
    pub id: Value,
    pub message: String,
}

#[derive(Serialize)]
pub struct Acknowledged {
    pub message: String,
    pub rows_affected: u64,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<Vec<T>>) {
    (StatusCode::OK, Json(data))
}

pub fn created(id: Value, message: String) -> (StatusCode, Json<Created>) {
    (StatusCode::CREATED, Json(Created { id, message }))
}

pub fn acknowledged(ack: MutationAck, message: String) -> (StatusCode, Json<Acknowledged>) {
    (
        StatusCode::OK,
        Json(Acknowledged {
            message,
            rows_affected: ack.rows_affected,
        }),
    )
}
