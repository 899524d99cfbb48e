//! Resource CRUD: configuration-driven REST endpoints over PostgreSQL tables.

pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod server;
pub mod service;
pub mod sql;
pub mod state;
pub mod storage;

pub use config::{default_resources, load_resources, resolve, ResolvedModel, ResolvedResource, ResourceConfig, Settings};
pub use error::{AppError, ConfigError};
pub use migration::{apply_migrations, ensure_database_exists};
pub use server::{build_router, shutdown_signal};
pub use service::{CrudService, MutationAck};
pub use state::AppState;
pub use storage::{PgStorage, Record, Storage};
