//! Request validation: writable-field allow-list, required fields, scalar types and per-field rules.

use crate::config::{FieldInfo, FieldType, ResolvedResource, ValidationRule};
use crate::error::AppError;
use crate::storage::Record;
use regex::Regex;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body. Every required field must be present and non-null; unknown fields are rejected.
    pub fn validate_create(resource: &ResolvedResource, body: &Record) -> Result<(), AppError> {
        for (key, v) in body {
            if *key == resource.pk_column {
                if resource.pk_type.is_generated() {
                    return Err(AppError::Validation(format!("{} is assigned by storage", key)));
                }
                match v.as_str() {
                    Some(s) if !s.trim().is_empty() => {
                        if s.trim() != s {
                            return Err(AppError::Validation(format!(
                                "{} must not have leading or trailing whitespace",
                                key
                            )));
                        }
                    }
                    _ => return Err(AppError::Validation(format!("{} must be a non-empty string", key))),
                }
                continue;
            }
            let field = known_field(resource, key)?;
            validate_field(field, v)?;
        }
        if !resource.pk_type.is_generated() && !body.contains_key(&resource.pk_column) {
            return Err(AppError::Validation(format!("{} is required", resource.pk_column)));
        }
        for field in &resource.fields {
            if field.required_on_create() && body.get(&field.name).map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", field.name)));
            }
        }
        Ok(())
    }

    /// Validate an update body. Only fields present are checked; at least one is needed and the key may not change.
    pub fn validate_update(resource: &ResolvedResource, body: &Record) -> Result<(), AppError> {
        if body.is_empty() {
            return Err(AppError::Validation("body must contain at least one field".into()));
        }
        for (key, v) in body {
            if *key == resource.pk_column {
                return Err(AppError::Validation(format!("{} cannot be changed", key)));
            }
            let field = known_field(resource, key)?;
            validate_field(field, v)?;
        }
        Ok(())
    }
}

fn known_field<'a>(resource: &'a ResolvedResource, key: &str) -> Result<&'a FieldInfo, AppError> {
    resource
        .field(key)
        .ok_or_else(|| AppError::Validation(format!("unknown field '{}' for {}", key, resource.name)))
}

fn validate_field(field: &FieldInfo, v: &Value) -> Result<(), AppError> {
    let col = field.name.as_str();
    if v.is_null() {
        if field.nullable {
            return Ok(());
        }
        return Err(AppError::Validation(format!("{} cannot be null", col)));
    }
    validate_type(col, v, field.field_type)?;
    if let Some(rule) = &field.validation {
        validate_rule(col, v, rule)?;
    }
    Ok(())
}

fn validate_type(col: &str, v: &Value, field_type: FieldType) -> Result<(), AppError> {
    let ok = match field_type {
        FieldType::Text => v.is_string(),
        FieldType::Integer => v.as_i64().map_or(false, |n| i32::try_from(n).is_ok()),
        FieldType::BigInt => v.is_i64(),
        FieldType::Numeric => v.is_number(),
        FieldType::Boolean => v.is_boolean(),
        FieldType::Timestamptz => v
            .as_str()
            .map_or(false, |s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
        FieldType::Uuid => v.as_str().map_or(false, |s| uuid::Uuid::parse_str(s).is_ok()),
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be of type {}",
            col,
            field_type.sql_type()
        )))
    }
}

fn validate_rule(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
        if let Some(ref pattern) = rule.pattern {
            let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(AppError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(AppError::Validation(format!("{} must be a valid UUID", col)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}
