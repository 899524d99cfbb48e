//! Server settings from the process environment (`.env` honoured via dotenvy in the binary).

use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    pub api_version: String,
    pub cors_origin: String,
    pub cors_credentials: bool,
    pub body_limit_bytes: usize,
    pub db_max_connections: u32,
    pub resources_path: Option<PathBuf>,
    pub auto_migrate: bool,
    pub environment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/employee_management".into(),
            host: "0.0.0.0".into(),
            port: 3000,
            api_prefix: "/api".into(),
            api_version: "v1".into(),
            cors_origin: "http://localhost:3000".into(),
            cors_credentials: true,
            body_limit_bytes: 10 * 1024 * 1024,
            db_max_connections: 5,
            resources_path: None,
            auto_migrate: false,
            environment: "development".into(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();
        if let Some(v) = lookup("DATABASE_URL") {
            s.database_url = v;
        }
        if let Some(v) = lookup("HOST") {
            s.host = v;
        }
        if let Some(v) = lookup("PORT") {
            s.port = parse("PORT", &v)?;
        }
        if let Some(v) = lookup("API_PREFIX") {
            s.api_prefix = v;
        }
        if let Some(v) = lookup("API_VERSION") {
            s.api_version = v;
        }
        if let Some(v) = lookup("CORS_ORIGIN") {
            s.cors_origin = v;
        }
        if let Some(v) = lookup("CORS_CREDENTIALS") {
            s.cors_credentials = parse("CORS_CREDENTIALS", &v)?;
        }
        if let Some(v) = lookup("BODY_LIMIT_BYTES") {
            s.body_limit_bytes = parse("BODY_LIMIT_BYTES", &v)?;
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
            s.db_max_connections = parse("DB_MAX_CONNECTIONS", &v)?;
        }
        s.resources_path = lookup("RESOURCES_PATH").filter(|v| !v.is_empty()).map(PathBuf::from);
        if let Some(v) = lookup("AUTO_MIGRATE") {
            s.auto_migrate = parse("AUTO_MIGRATE", &v)?;
        }
        if let Some(v) = lookup("APP_ENV") {
            s.environment = v;
        }
        Ok(s)
    }

    /// Mount point for resource routes, e.g. "/api/v1". Empty when both prefix and version are empty.
    pub fn api_base(&self) -> String {
        let mut base = String::new();
        for part in [&self.api_prefix, &self.api_version] {
            let part = part.trim_matches('/');
            if !part.is_empty() {
                base.push('/');
                base.push_str(part);
            }
        }
        base
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Setting {
        key,
        message: format!("'{}': {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let s = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(s.port, 3000);
        assert_eq!(s.api_base(), "/api/v1");
        assert_eq!(s.body_limit_bytes, 10 * 1024 * 1024);
        assert!(s.cors_credentials);
        assert!(!s.auto_migrate);
        assert!(s.resources_path.is_none());
    }

    #[test]
    fn reads_overrides() {
        let s = Settings::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("API_PREFIX", "/svc/"),
            ("API_VERSION", "v2"),
            ("AUTO_MIGRATE", "true"),
            ("RESOURCES_PATH", "resources.json"),
        ]))
        .unwrap();
        assert_eq!(s.socket_addr(), "127.0.0.1:8080");
        assert_eq!(s.api_base(), "/svc/v2");
        assert!(s.auto_migrate);
        assert_eq!(s.resources_path, Some(PathBuf::from("resources.json")));
    }

    #[test]
    fn empty_prefix_mounts_at_root() {
        let s = Settings::from_lookup(lookup_from(&[("API_PREFIX", ""), ("API_VERSION", "")])).unwrap();
        assert_eq!(s.api_base(), "");
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = Settings::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Setting { key: "PORT", .. }));
        assert!(Settings::from_lookup(lookup_from(&[("CORS_CREDENTIALS", "yes")])).is_err());
    }
}
