//! Raw resource config types matching the JSON resource file.

use serde::{Deserialize, Serialize};

/// Primary key type for parsing path ids and generating DDL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PkType {
    Int,
    BigInt,
    Text,
    Uuid,
}

impl PkType {
    /// PostgreSQL type used for casts on the bound id.
    pub fn sql_type(&self) -> &'static str {
        match self {
            PkType::Int => "integer",
            PkType::BigInt => "bigint",
            PkType::Text => "text",
            PkType::Uuid => "uuid",
        }
    }

    /// Whether the database assigns the key on insert.
    pub fn is_generated(&self) -> bool {
        !matches!(self, PkType::Text)
    }
}

impl Default for PkType {
    fn default() -> Self {
        PkType::Int
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrimaryKeyConfig {
    #[serde(default = "default_pk_name")]
    pub name: String,
    #[serde(default, rename = "type")]
    pub pk_type: PkType,
}

fn default_pk_name() -> String {
    "id".to_string()
}

impl Default for PrimaryKeyConfig {
    fn default() -> Self {
        Self {
            name: default_pk_name(),
            pk_type: PkType::default(),
        }
    }
}

/// Scalar column types a field may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    BigInt,
    Numeric,
    Boolean,
    Timestamptz,
    Uuid,
}

impl FieldType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::BigInt => "bigint",
            FieldType::Numeric => "numeric",
            FieldType::Boolean => "boolean",
            FieldType::Timestamptz => "timestamptz",
            FieldType::Uuid => "uuid",
        }
    }
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::Text
    }
}

/// Optional per-field request checks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    /// "email" or "uuid".
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub nullable: bool,
    /// Column carries a DB default, so create may omit it.
    #[serde(default)]
    pub has_default: bool,
    /// Literal default emitted in generated DDL. Implies `has_default`.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    /// Defaults to `name`.
    #[serde(default)]
    pub table: Option<String>,
    /// Defaults to `name`.
    #[serde(default)]
    pub path_segment: Option<String>,
    /// Singular label used in messages; defaults to `name` without a trailing "s".
    #[serde(default)]
    pub singular: Option<String>,
    #[serde(default)]
    pub primary_key: PrimaryKeyConfig,
    pub fields: Vec<FieldConfig>,
}

impl FieldConfig {
    pub fn new(name: &str, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            nullable,
            has_default: false,
            default: None,
            validation: None,
        }
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validation = Some(rule);
        self
    }
}
