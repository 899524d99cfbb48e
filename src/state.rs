//! Shared application state for all routes.

use crate::config::ResolvedModel;
use crate::storage::Storage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Fixed at startup; resources are not discovered at runtime.
    pub model: Arc<ResolvedModel>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, model: ResolvedModel) -> Self {
        Self {
            storage,
            model: Arc::new(model),
        }
    }
}
