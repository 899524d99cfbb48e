//! Resolved resource model: config validated and flattened for runtime use.

use crate::config::{FieldType, PkType, ValidationRule};
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub has_default: bool,
    pub default: Option<serde_json::Value>,
    pub validation: Option<ValidationRule>,
}

impl FieldInfo {
    /// Create must supply a non-null value for this field.
    pub fn required_on_create(&self) -> bool {
        !self.nullable && !self.has_default
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    /// Plural name, e.g. "employees".
    pub name: String,
    /// Singular label for messages, e.g. "employee".
    pub singular: String,
    pub table_name: String,
    pub path_segment: String,
    pub pk_column: String,
    pub pk_type: PkType,
    /// Writable fields in declaration order. Never contains the primary key.
    pub fields: Vec<FieldInfo>,
}

impl ResolvedResource {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub resources: Vec<ResolvedResource>,
    pub resource_by_path: HashMap<String, ResolvedResource>,
}

impl ResolvedModel {
    pub fn resource_by_path(&self, path: &str) -> Option<&ResolvedResource> {
        self.resource_by_path.get(path)
    }
}
