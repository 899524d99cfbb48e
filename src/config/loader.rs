//! Load resource config from built-in defaults or a JSON file, and resolve it for runtime use.

use crate::config::resolved::{FieldInfo, ResolvedModel, ResolvedResource};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

/// Build resolved model from resource configs (validates first).
pub fn resolve(resources: &[ResourceConfig]) -> Result<ResolvedModel, ConfigError> {
    validate(resources)?;

    let mut out = Vec::with_capacity(resources.len());
    let mut resource_by_path = HashMap::new();

    for r in resources {
        let fields = r
            .fields
            .iter()
            .map(|f| FieldInfo {
                name: f.name.clone(),
                field_type: f.field_type,
                nullable: f.nullable,
                has_default: f.has_default || f.default.is_some(),
                default: f.default.clone(),
                validation: f.validation.clone(),
            })
            .collect();
        let resolved = ResolvedResource {
            name: r.name.clone(),
            singular: r.singular.clone().unwrap_or_else(|| singular_of(&r.name)),
            table_name: r.table.clone().unwrap_or_else(|| r.name.clone()),
            path_segment: r.path_segment.clone().unwrap_or_else(|| r.name.clone()),
            pk_column: r.primary_key.name.clone(),
            pk_type: r.primary_key.pk_type,
            fields,
        };
        resource_by_path.insert(resolved.path_segment.clone(), resolved.clone());
        out.push(resolved);
    }

    Ok(ResolvedModel {
        resources: out,
        resource_by_path,
    })
}

fn singular_of(name: &str) -> String {
    name.strip_suffix('s').filter(|s| !s.is_empty()).unwrap_or(name).to_string()
}

/// Built-in resources: the employee directory plus the users/products scaffold.
pub fn default_resources() -> Vec<ResourceConfig> {
    let email_rule = ValidationRule {
        format: Some("email".into()),
        max_length: Some(255),
        ..Default::default()
    };
    let name_rule = ValidationRule {
        min_length: Some(1),
        max_length: Some(255),
        ..Default::default()
    };

    vec![
        ResourceConfig {
            name: "employees".into(),
            table: None,
            path_segment: None,
            singular: None,
            primary_key: PrimaryKeyConfig::default(),
            fields: vec![
                FieldConfig::new("name", FieldType::Text, false).with_rule(name_rule.clone()),
                FieldConfig::new("email", FieldType::Text, false).with_rule(email_rule.clone()),
                FieldConfig::new("department", FieldType::Text, true),
            ],
        },
        ResourceConfig {
            name: "users".into(),
            table: None,
            path_segment: None,
            singular: None,
            primary_key: PrimaryKeyConfig::default(),
            fields: vec![
                FieldConfig::new("name", FieldType::Text, false).with_rule(name_rule.clone()),
                FieldConfig::new("email", FieldType::Text, false).with_rule(email_rule),
                FieldConfig::new("role", FieldType::Text, false).with_default(json!("member")),
            ],
        },
        ResourceConfig {
            name: "products".into(),
            table: None,
            path_segment: None,
            singular: None,
            primary_key: PrimaryKeyConfig::default(),
            fields: vec![
                FieldConfig::new("name", FieldType::Text, false).with_rule(name_rule),
                FieldConfig::new("description", FieldType::Text, true),
                FieldConfig::new("price", FieldType::Numeric, false).with_rule(ValidationRule {
                    minimum: Some(0.0),
                    ..Default::default()
                }),
                FieldConfig::new("stock", FieldType::Integer, false)
                    .with_default(json!(0))
                    .with_rule(ValidationRule {
                        minimum: Some(0.0),
                        ..Default::default()
                    }),
            ],
        },
    ]
}

/// Read resource definitions from a JSON file (array of resources), or use the defaults when no path is given.
pub async fn load_resources(path: Option<&Path>) -> Result<Vec<ResourceConfig>, ConfigError> {
    let Some(path) = path else {
        return Ok(default_resources());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_resources(&text)
}

pub fn parse_resources(text: &str) -> Result<Vec<ResourceConfig>, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_defaults_by_path() {
        let model = resolve(&default_resources()).unwrap();
        let employees = model.resource_by_path("employees").unwrap();
        assert_eq!(employees.singular, "employee");
        assert_eq!(employees.table_name, "employees");
        assert_eq!(employees.pk_column, "id");
        assert_eq!(employees.pk_type, PkType::Int);
        let names: Vec<_> = employees.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "email", "department"]);
        assert!(model.resource_by_path("users").is_some());
        assert!(model.resource_by_path("products").is_some());
        assert!(model.resource_by_path("orders").is_none());
    }

    #[test]
    fn default_value_implies_has_default() {
        let model = resolve(&default_resources()).unwrap();
        let stock = model.resource_by_path("products").unwrap().field("stock").unwrap();
        assert!(stock.has_default);
        assert!(!stock.required_on_create());
    }

    #[test]
    fn parses_resource_file() {
        let text = r#"[
            {
                "name": "staff",
                "table": "employees",
                "singular": "employee",
                "primary_key": { "name": "employee_id", "type": "big_int" },
                "fields": [
                    { "name": "name", "type": "text" },
                    { "name": "email", "nullable": true, "validation": { "format": "email" } }
                ]
            }
        ]"#;
        let resources = parse_resources(text).unwrap();
        let model = resolve(&resources).unwrap();
        let staff = model.resource_by_path("staff").unwrap();
        assert_eq!(staff.table_name, "employees");
        assert_eq!(staff.pk_column, "employee_id");
        assert_eq!(staff.pk_type, PkType::BigInt);
        assert!(staff.field("email").unwrap().nullable);
        assert_eq!(staff.field("name").unwrap().field_type, FieldType::Text);
    }

    #[test]
    fn malformed_file_is_a_load_error() {
        assert!(matches!(parse_resources("{ not json"), Err(ConfigError::Load(_))));
    }
}
