//! Config validation: identifiers, primary keys and path uniqueness.

use crate::config::ResourceConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier pattern"))
}

fn check_identifier(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    if identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

pub fn validate(resources: &[ResourceConfig]) -> Result<(), ConfigError> {
    if resources.is_empty() {
        return Err(ConfigError::Validation("at least one resource required".into()));
    }

    let mut path_segments = HashSet::new();
    for r in resources {
        check_identifier("resource", &r.name)?;
        if let Some(table) = &r.table {
            check_identifier("table", table)?;
        }
        check_identifier("primary key", &r.primary_key.name)?;

        let segment = r.path_segment.as_deref().unwrap_or(&r.name);
        if segment.is_empty() || segment.contains('/') {
            return Err(ConfigError::Validation(format!("invalid path segment '{}'", segment)));
        }
        if !path_segments.insert(segment) {
            return Err(ConfigError::DuplicatePathSegment(segment.to_string()));
        }

        if r.fields.is_empty() {
            return Err(ConfigError::Validation(format!("resource '{}' has no fields", r.name)));
        }
        let mut names = HashSet::new();
        for f in &r.fields {
            check_identifier("field", &f.name)?;
            if f.name == r.primary_key.name {
                return Err(ConfigError::InvalidPrimaryKey {
                    resource: r.name.clone(),
                    column: f.name.clone(),
                });
            }
            if !names.insert(f.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "resource '{}' declares field '{}' twice",
                    r.name, f.name
                )));
            }
            if let Some(pattern) = f.validation.as_ref().and_then(|v| v.pattern.as_deref()) {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!("invalid pattern for {}.{}: {}", r.name, f.name, e))
                })?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_resources, FieldConfig, FieldType};

    #[test]
    fn default_resources_are_valid() {
        validate(&default_resources()).unwrap();
    }

    #[test]
    fn rejects_primary_key_listed_as_field() {
        let mut resources = default_resources();
        resources[0].fields.push(FieldConfig::new("id", FieldType::Integer, false));
        assert!(matches!(
            validate(&resources),
            Err(ConfigError::InvalidPrimaryKey { .. })
        ));
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        let mut resources = default_resources();
        resources[0].fields[0].name = "name; DROP TABLE x".into();
        assert!(matches!(
            validate(&resources),
            Err(ConfigError::InvalidIdentifier { kind: "field", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_path_segments() {
        let mut resources = default_resources();
        let copy = resources[0].clone();
        resources.push(copy);
        assert!(matches!(
            validate(&resources),
            Err(ConfigError::DuplicatePathSegment(_))
        ));
    }

    #[test]
    fn rejects_empty_field_list() {
        let mut resources = default_resources();
        resources[1].fields.clear();
        assert!(validate(&resources).is_err());
    }
}
