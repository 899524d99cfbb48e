//! Router assembly with middleware, and graceful shutdown.

use crate::config::Settings;
use crate::error::ConfigError;
use crate::routes::{common_routes, resource_routes, route_not_found};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// `*` allows any origin. With credentials the request origin is echoed instead of `*`.
fn allow_origin(settings: &Settings) -> Result<AllowOrigin, ConfigError> {
    let entries: Vec<&str> = settings
        .cors_origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();
    if entries.contains(&"*") {
        return Ok(if settings.cors_credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        });
    }
    let origins = entries
        .into_iter()
        .map(|o| {
            HeaderValue::from_str(o).map_err(|e| ConfigError::Setting {
                key: "CORS_ORIGIN",
                message: format!("'{}': {}", o, e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AllowOrigin::list(origins))
}

fn cors_layer(settings: &Settings) -> Result<CorsLayer, ConfigError> {
    Ok(CorsLayer::new()
        .allow_origin(allow_origin(settings)?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(settings.cors_credentials))
}

/// Full application router: common routes at the root, resources under `settings.api_base()`.
pub fn build_router(state: AppState, settings: &Settings) -> Result<Router, ConfigError> {
    let resources = resource_routes(state.clone());
    let base = settings.api_base();
    let api = if base.is_empty() {
        resources
    } else {
        Router::new().nest(&base, resources)
    };

    Ok(Router::new()
        .merge(common_routes(state))
        .merge(api)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(settings.body_limit_bytes))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors_layer(settings)?)
        .layer(TraceLayer::new_for_http()))
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_resources, resolve};
    use crate::storage::fake::{record, Reply, ScriptedStorage};
    use crate::storage::Storage;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with(storage: Arc<ScriptedStorage>, settings: &Settings) -> Router {
        let model = resolve(&default_resources()).unwrap();
        let storage: Arc<dyn Storage> = storage;
        build_router(AppState::new(storage, model), settings).unwrap()
    }

    fn app(replies: Vec<Reply>) -> (Router, Arc<ScriptedStorage>) {
        let storage = Arc::new(ScriptedStorage::with(replies));
        (app_with(storage.clone(), &Settings::default()), storage)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn list_returns_json_array() {
        let rows = vec![
            record(json!({"id": 1, "name": "Ada", "email": "ada@x.co", "department": "Eng"})),
            record(json!({"id": 2, "name": "Grace", "email": "grace@x.co", "department": null})),
        ];
        let (app, _) = app(vec![Reply::Rows(rows)]);
        let (status, body) = send(app, "GET", "/api/v1/employees", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[1]["name"], "Grace");
    }

    #[tokio::test]
    async fn empty_list_is_empty_array() {
        let (app, _) = app(vec![Reply::Rows(vec![])]);
        let (status, body) = send(app, "GET", "/api/v1/products", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn create_then_read() {
        let ada = json!({"id": 7, "name": "Ada", "email": "ada@x.co", "department": "Eng"});
        let (app, storage) = app(vec![
            Reply::Rows(vec![record(json!({"id": 7}))]),
            Reply::Rows(vec![record(ada.clone())]),
        ]);
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/v1/employees",
            Some(json!({"name": "Ada", "email": "ada@x.co", "department": "Eng"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 7);
        assert_eq!(body["message"], "Employee added successfully");

        let (status, body) = send(app, "GET", "/api/v1/employees/7", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, ada);
        assert_eq!(storage.seen()[1].params, vec![json!(7)]);
    }

    #[tokio::test]
    async fn read_missing_is_404() {
        let (app, _) = app(vec![Reply::Rows(vec![])]);
        let (status, body) = send(app, "GET", "/api/v1/employees/9999999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn update_existing_returns_ack() {
        let (app, storage) = app(vec![Reply::Affected(1)]);
        let (status, body) = send(app, "PUT", "/api/v1/employees/7", Some(json!({"name": "Ada L."}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows_affected"], 1);
        assert_eq!(body["message"], "Employee updated successfully");
        assert_eq!(storage.seen()[0].params, vec![json!("Ada L."), json!(7)]);
    }

    #[tokio::test]
    async fn delete_missing_id_still_succeeds() {
        let (app, _) = app(vec![Reply::Affected(0)]);
        let (status, body) = send(app, "DELETE", "/api/v1/employees/9999999", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows_affected"], 0);
        assert_eq!(body["message"], "Employee deleted successfully");
    }

    #[tokio::test]
    async fn storage_failure_is_500_with_message() {
        let (app, _) = app(vec![Reply::Fail]);
        let (status, body) = send(app, "GET", "/api/v1/users", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "error retrieving users from database");
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_storage() {
        let (app, storage) = app(vec![]);
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/v1/employees",
            Some(json!({"name": "Ada", "email": "ada@x.co", "is_admin": true})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");

        let (status, _) = send(app.clone(), "POST", "/api/v1/employees", Some(json!(["Ada"]))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(app, "GET", "/api/v1/employees/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(storage.seen().is_empty());
    }

    #[tokio::test]
    async fn unknown_resource_and_route_are_json_404() {
        let (app, _) = app(vec![]);
        let (status, body) = send(app.clone(), "GET", "/api/v1/orders", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "route_not_found");
        assert_eq!(body["error"]["details"]["path"], "/api/v1/orders");

        let (status, body) = send(app, "GET", "/nowhere/at/all/really", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Route not found");
    }

    #[tokio::test]
    async fn resources_mount_at_root_without_prefix() {
        let storage = Arc::new(ScriptedStorage::with(vec![Reply::Rows(vec![])]));
        let settings = Settings {
            api_prefix: String::new(),
            api_version: String::new(),
            ..Settings::default()
        };
        let (status, body) = send(app_with(storage, &settings), "GET", "/employees", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn health_ready_and_security_headers() {
        let (app, _) = app(vec![]);
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let (status, body) = send(app, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");

        let down = Arc::new(ScriptedStorage::down());
        let (status, body) = send(app_with(down, &Settings::default()), "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }

    #[test]
    fn bad_cors_origin_is_a_config_error() {
        let settings = Settings {
            cors_origin: "http://ok.example, bad\norigin".into(),
            ..Settings::default()
        };
        assert!(matches!(cors_layer(&settings), Err(ConfigError::Setting { key: "CORS_ORIGIN", .. })));
    }

    async fn allowed_origin(settings: &Settings) -> Option<String> {
        let storage = Arc::new(ScriptedStorage::with(vec![]));
        let response = app_with(storage, settings)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://app.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn wildcard_cors_origin_is_accepted() {
        let open = Settings {
            cors_origin: "*".into(),
            cors_credentials: false,
            ..Settings::default()
        };
        assert_eq!(allowed_origin(&open).await.as_deref(), Some("*"));

        let credentialed = Settings {
            cors_origin: "*".into(),
            cors_credentials: true,
            ..Settings::default()
        };
        assert_eq!(allowed_origin(&credentialed).await.as_deref(), Some("https://app.example"));
    }

    async fn send_raw(app: Router, method: &str, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let response = app.oneshot(builder.body(Body::from(body.to_string())).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn body_rejections_use_error_envelope() {
        let (app, storage) = app(vec![]);
        let (status, body) = send_raw(app.clone(), "POST", "/api/v1/employees", Some("application/json"), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");

        let (status, body) = send_raw(app.clone(), "PUT", "/api/v1/employees/7", None, r#"{"name":"Ada"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");

        let (status, body) = send_raw(app, "POST", "/api/v1/employees", Some("application/json"), r#"{"name":"Ada""#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].is_string());
        assert!(storage.seen().is_empty());
    }
}
